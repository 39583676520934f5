//! `oncall-sync-core`: keeps chat user groups and channel topics pointed at
//! whoever is currently on call.
//!
//! ```text
//! Config ──validate──▶ build_jobs ──▶ Vec<SyncJob> ──▶ Syncer::run
//!                       │  ScheduleProvider::get_schedule     │ per job:
//!                       │  Directory (users, groups, channels) │  join channel
//!                       ▼                                      │  reconcile + update groups
//!                 ScheduleCatalog (dedup + group union)        ▼  render + update topic
//! ```

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod pagerduty;
pub mod provider;
pub mod resolver;
pub mod slack;
pub mod template;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregate::{build_jobs, SyncJob};
pub use config::{Config, RunOverrides};
pub use error::{ErrorKind, Result, SyncError};
pub use orchestrator::{RunOptions, RunReport, Syncer};
pub use provider::{ChatPlatform, ScheduleProvider};
pub use resolver::Directory;
