//! Reconciliation: who is on call now, and what every tracked user group and
//! channel topic should therefore look like.

use crate::aggregate::SyncJob;
use crate::error::{Result, SyncError};
use crate::provider::ScheduleProvider;
use crate::resolver::Directory;
use crate::types::{Group, ProviderSchedule};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// DesiredMembership
// ---------------------------------------------------------------------------

/// Target member set per user group, rebuilt for every job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredMembership {
    groups: BTreeMap<Group, BTreeSet<String>>,
}

impl DesiredMembership {
    pub fn ensure_member(&mut self, group: &Group, user_id: &str) {
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn members(&self, group: &Group) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Group, &BTreeSet<String>)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups whose current members (keyed by group id) differ from the
    /// desired set. Groups missing from `current` count as empty.
    pub fn diff(&self, current: &BTreeMap<String, BTreeSet<String>>) -> Vec<MembershipChange> {
        let empty = BTreeSet::new();
        self.groups
            .iter()
            .filter_map(|(group, desired)| {
                let existing = current.get(&group.id).unwrap_or(&empty);
                if existing == desired {
                    return None;
                }
                Some(MembershipChange {
                    group: group.clone(),
                    added: desired.difference(existing).cloned().collect(),
                    removed: existing.difference(desired).cloned().collect(),
                    members: desired.iter().cloned().collect(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub group: Group,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Full desired member list, sorted.
    pub members: Vec<String>,
}

// ---------------------------------------------------------------------------
// Topic keys
// ---------------------------------------------------------------------------

static NOT_ALPHANUMERIC_RE: OnceLock<Regex> = OnceLock::new();

fn not_alphanumeric_re() -> &'static Regex {
    NOT_ALPHANUMERIC_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap())
}

/// Template key for a schedule: its name with every non-alphanumeric
/// character removed.
pub fn topic_key(schedule_name: &str) -> String {
    not_alphanumeric_re()
        .replace_all(schedule_name, "")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub membership: DesiredMembership,
    /// Topic key to the user reference written into the topic.
    pub topic_values: BTreeMap<String, String>,
}

/// Resolve the on-call user of every schedule in `job` and compute the
/// desired group membership and topic values.
pub fn reconcile(
    job: &SyncJob,
    provider: &impl ScheduleProvider,
    directory: &Directory,
) -> Result<Reconciliation> {
    let mut out = Reconciliation::default();
    let mut key_owner: BTreeMap<String, &str> = BTreeMap::new();

    for schedule in &job.schedules {
        tracing::info!(sync = %job.name, schedule = %schedule, "processing schedule");

        let provider_schedule = ProviderSchedule {
            id: schedule.id.clone(),
            name: schedule.name.clone(),
        };
        let on_call = provider
            .get_on_call_user(&provider_schedule)
            .map_err(|e| SyncError::OnCallLookup {
                schedule: schedule.name.clone(),
                reason: e.to_string(),
            })?;

        let user = directory.find_user(&on_call)?;

        for group in &schedule.groups {
            tracing::info!(
                sync = %job.name,
                member = %user.id,
                group = %group,
                "ensuring member for user group"
            );
            out.membership.ensure_member(group, &user.id);
        }

        let key = topic_key(&schedule.name);
        if let Some(first) = key_owner.get(&key) {
            if job.template.is_some() {
                return Err(SyncError::TopicKeyCollision {
                    key,
                    first: first.to_string(),
                    second: schedule.name.clone(),
                });
            }
            tracing::warn!(
                sync = %job.name,
                key = %key,
                first = %first,
                second = %schedule.name,
                "schedule names map to the same topic key"
            );
            continue;
        }
        key_owner.insert(key.clone(), &schedule.name);

        let value = if job.pretend_users {
            format!("\\{}", user.id)
        } else {
            user.id.clone()
        };
        out.topic_values.insert(key, value);
    }

    Ok(out)
}

/// Render the job's topic, or `None` when no template is configured.
pub fn render_topic(job: &SyncJob, reconciliation: &Reconciliation) -> Result<Option<String>> {
    let Some(template) = &job.template else {
        return Ok(None);
    };
    tracing::debug!(
        sync = %job.name,
        values = ?reconciliation.topic_values,
        "executing template with user IDs by schedule name"
    );
    template.render(&reconciliation.topic_values).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
