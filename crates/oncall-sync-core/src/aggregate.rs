//! Turns validated configuration into runnable sync jobs.
//!
//! Schedules are deduplicated by the identity the provider assigns them.
//! Within one sync, entries resolving to the same provider schedule are
//! merged and their user groups unioned. The run-wide [`ScheduleCatalog`]
//! records the union across all syncs, but each job only carries the groups
//! its own sync configures, so no job rewrites a group another job owns.

use crate::config::{Config, SyncConfig};
use crate::error::{Result, SyncError};
use crate::provider::ScheduleProvider;
use crate::resolver::Directory;
use crate::template::TopicTemplate;
use crate::types::{Channel, Group, ProviderSchedule};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A provider schedule with the user groups that track its on-call person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    /// Deduplicated, in order of first appearance.
    pub groups: Vec<Group>,
}

impl Schedule {
    fn add_group(&mut self, group: Group) {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ID:{} Name:{:?}}}", self.id, self.name)
    }
}

// ---------------------------------------------------------------------------
// ScheduleCatalog
// ---------------------------------------------------------------------------

/// Ordered set of schedules keyed by provider id.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCatalog {
    schedules: Vec<Schedule>,
}

impl ScheduleCatalog {
    /// Insert `schedule` or, if already present, union `groups` into it.
    pub fn ensure(&mut self, schedule: &ProviderSchedule, groups: &[Group]) -> &Schedule {
        ensure_in(&mut self.schedules, schedule, groups)
    }

    pub fn get(&self, id: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

fn ensure_in<'a>(
    schedules: &'a mut Vec<Schedule>,
    schedule: &ProviderSchedule,
    groups: &[Group],
) -> &'a Schedule {
    let idx = match schedules.iter().position(|s| s.id == schedule.id) {
        Some(idx) => idx,
        None => {
            schedules.push(Schedule {
                id: schedule.id.clone(),
                name: schedule.name.clone(),
                groups: Vec::new(),
            });
            schedules.len() - 1
        }
    };
    let entry = &mut schedules[idx];
    for group in groups {
        entry.add_group(group.clone());
    }
    entry
}

/// Look up every schedule of `sync`, resolve its groups and merge them into
/// `catalog`. Returns the sync's own schedules, deduplicated in configuration
/// order, each carrying only the groups this sync assigns to it.
pub fn aggregate(
    sync: &SyncConfig,
    provider: &impl ScheduleProvider,
    directory: &Directory,
    catalog: &mut ScheduleCatalog,
) -> Result<Vec<Schedule>> {
    tracing::info!(sync = %sync.name, "getting schedules");
    let mut schedules: Vec<Schedule> = Vec::new();

    for cfg_schedule in &sync.schedules {
        let schedule_ref = cfg_schedule.to_ref().ok_or_else(|| SyncError::InvalidSync {
            sync: sync.name.clone(),
            reason: "must specify either schedule ID or schedule name".to_string(),
        })?;

        let found = provider
            .get_schedule(&schedule_ref)
            .map_err(|e| SyncError::ScheduleLookup {
                schedule: schedule_ref.to_string(),
                source: Box::new(e),
            })?
            .ok_or_else(|| SyncError::ScheduleNotFound {
                sync: sync.name.clone(),
                schedule: schedule_ref.to_string(),
            })?;

        let mut groups = Vec::with_capacity(cfg_schedule.user_groups.len());
        for cfg_group in &cfg_schedule.user_groups {
            let group = cfg_group
                .to_ref()
                .and_then(|r| directory.find_group(&r))
                .ok_or_else(|| SyncError::GroupNotFound {
                    sync: sync.name.clone(),
                    group: cfg_group.to_string(),
                })?;
            tracing::info!(
                sync = %sync.name,
                group = %group,
                schedule = %found,
                "assigning user group to schedule"
            );
            groups.push(group.clone());
        }

        catalog.ensure(&found, &groups);
        ensure_in(&mut schedules, &found, &groups);
    }

    tracing::info!(sync = %sync.name, count = schedules.len(), "found schedule(s)");
    Ok(schedules)
}

// ---------------------------------------------------------------------------
// SyncJob
// ---------------------------------------------------------------------------

/// A fully resolved sync, ready to run.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub name: String,
    pub schedules: Vec<Schedule>,
    pub channel: Option<Channel>,
    pub template: Option<TopicTemplate>,
    pub dry_run: bool,
    pub pretend_users: bool,
}

/// Resolve every configured sync into a [`SyncJob`]. Any failure here is a
/// configuration error and no job runs.
pub fn build_jobs(
    config: &Config,
    provider: &impl ScheduleProvider,
    directory: &Directory,
) -> Result<Vec<SyncJob>> {
    config.validate()?;

    let mut catalog = ScheduleCatalog::default();
    let mut jobs = Vec::with_capacity(config.syncs.len());

    for sync in &config.syncs {
        let channel = match &sync.channel {
            Some(channel_ref) => {
                let channel = directory.find_channel(channel_ref)?.clone();
                tracing::info!(
                    sync = %sync.name,
                    channel = %channel.name,
                    channel_id = %channel.id,
                    "found channel"
                );
                Some(channel)
            }
            None => None,
        };

        let template = match sync.template_source() {
            Some(source) => Some(TopicTemplate::parse(source)?),
            None => {
                tracing::info!(
                    sync = %sync.name,
                    "skipping topic handling because template is undefined"
                );
                None
            }
        };

        let schedules = aggregate(sync, provider, directory, &mut catalog)?;
        jobs.push(SyncJob {
            name: sync.name.clone(),
            schedules,
            channel,
            template,
            dry_run: sync.dry_run,
            pretend_users: sync.pretend_users,
        });
    }

    tracing::debug!(unique_schedules = catalog.len(), "aggregated schedules");
    for schedule in &catalog.schedules {
        tracing::debug!(
            schedule = %schedule,
            groups = schedule.groups.len(),
            "user groups tracking schedule across all syncs"
        );
    }

    Ok(jobs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
