//! Runs sync jobs one after another and applies their side effects.
//!
//! Each job moves through
//! `Pending → JoiningChannel → UpdatingMembership → UpdatingTopic → Done`,
//! or to `Failed` from any step. A failing job either aborts the run
//! (fail-fast, or the run was cancelled) or is logged and skipped.

use crate::aggregate::SyncJob;
use crate::engine::{self, Reconciliation};
use crate::error::{ErrorKind, Result, SyncError};
use crate::provider::{ChatPlatform, ScheduleProvider};
use crate::resolver::Directory;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// JobState / RunReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    JoiningChannel,
    UpdatingMembership,
    UpdatingTopic,
    Done,
    /// Failed while in the contained state.
    Failed(FailedAt),
}

/// The step a failed job was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAt {
    Pending,
    JoiningChannel,
    UpdatingMembership,
    UpdatingTopic,
}

impl JobState {
    fn failed(self) -> JobState {
        let at = match self {
            JobState::Pending | JobState::Done | JobState::Failed(_) => FailedAt::Pending,
            JobState::JoiningChannel => FailedAt::JoiningChannel,
            JobState::UpdatingMembership => FailedAt::UpdatingMembership,
            JobState::UpdatingTopic => FailedAt::UpdatingTopic,
        };
        JobState::Failed(at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub name: String,
    pub state: JobState,
    /// Display message of the job's error, if it failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub jobs: Vec<JobOutcome>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.state, JobState::Failed(_)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Abort the run at the first failing job.
    pub fail_fast: bool,
}

/// Uppercase the first character of a log message.
pub fn capitalize_first(msg: &str) -> String {
    let mut chars = msg.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

pub struct Syncer<'a, P, C> {
    provider: &'a P,
    platform: &'a C,
    directory: &'a Directory,
}

impl<'a, P: ScheduleProvider, C: ChatPlatform> Syncer<'a, P, C> {
    pub fn new(provider: &'a P, platform: &'a C, directory: &'a Directory) -> Self {
        Self {
            provider,
            platform,
            directory,
        }
    }

    /// Run `jobs` sequentially in order. Returns `Err` only when the run was
    /// aborted; otherwise failed jobs are listed in the report.
    pub fn run(
        &self,
        jobs: &[SyncJob],
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        for job in jobs {
            if cancel.is_cancelled() {
                tracing::warn!(sync = %job.name, "run cancelled, not starting remaining syncs");
                return Err(SyncError::Cancelled);
            }

            let mut state = JobState::Pending;
            match self.run_job(job, &mut state) {
                Ok(()) => {
                    tracing::info!(sync = %job.name, "sync finished");
                    report.jobs.push(JobOutcome {
                        name: job.name.clone(),
                        state,
                        error: None,
                    });
                }
                Err(e) => {
                    let err = e.in_job(&job.name);
                    if options.fail_fast || cancel.is_cancelled() {
                        return Err(err);
                    }
                    let msg = capitalize_first(&err.to_string());
                    tracing::error!("{msg}");
                    report.jobs.push(JobOutcome {
                        name: job.name.clone(),
                        state: state.failed(),
                        error: Some(msg),
                    });
                }
            }
        }

        Ok(report)
    }

    fn run_job(&self, job: &SyncJob, state: &mut JobState) -> Result<()> {
        *state = JobState::JoiningChannel;
        self.join_channel(job)?;

        *state = JobState::UpdatingMembership;
        let reconciliation = engine::reconcile(job, self.provider, self.directory)?;
        self.update_membership(job, &reconciliation)?;

        *state = JobState::UpdatingTopic;
        self.update_topic(job, &reconciliation)?;

        *state = JobState::Done;
        Ok(())
    }

    fn join_channel(&self, job: &SyncJob) -> Result<()> {
        if job.dry_run {
            return Ok(());
        }
        let Some(channel) = &job.channel else {
            tracing::debug!(sync = %job.name, "no channel, skipping join");
            return Ok(());
        };

        match self.platform.join_channel(&channel.id) {
            Ok(true) => tracing::info!(sync = %job.name, channel_id = %channel.id, "joined channel"),
            Ok(false) => {}
            Err(e) if e.kind() == ErrorKind::Permission => {
                tracing::warn!(
                    sync = %job.name,
                    channel_id = %channel.id,
                    error = %e,
                    "cannot automatically join channel; add the scope or invite the bot manually"
                );
            }
            Err(e) => {
                return Err(SyncError::Mutation {
                    action: format!("join channel with ID {}", channel.id),
                    reason: e.to_string(),
                })
            }
        }
        Ok(())
    }

    fn update_membership(&self, job: &SyncJob, reconciliation: &Reconciliation) -> Result<()> {
        for (group, members) in reconciliation.membership.iter() {
            tracing::info!(
                sync = %job.name,
                group = %group,
                members = ?members,
                "desired user group members"
            );
        }

        if reconciliation.membership.is_empty() {
            tracing::debug!(sync = %job.name, "no user groups to update");
            return Ok(());
        }
        if job.dry_run {
            tracing::info!(sync = %job.name, "dry run, not updating user groups");
            return Ok(());
        }
        self.platform
            .update_group_membership(&reconciliation.membership)
    }

    fn update_topic(&self, job: &SyncJob, reconciliation: &Reconciliation) -> Result<()> {
        let Some(topic) = engine::render_topic(job, reconciliation)? else {
            tracing::debug!(sync = %job.name, "skipping topic update");
            return Ok(());
        };
        let Some(channel) = &job.channel else {
            return Ok(());
        };

        if job.dry_run {
            tracing::info!(
                sync = %job.name,
                channel_id = %channel.id,
                topic = %topic,
                "dry run, not updating topic"
            );
            return Ok(());
        }
        self.platform.update_channel_topic(&channel.id, &topic)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
