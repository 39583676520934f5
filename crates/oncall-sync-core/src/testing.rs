//! In-memory schedule provider and chat platform used by unit tests.

use crate::engine::DesiredMembership;
use crate::error::{Result, SyncError};
use crate::provider::{ChatPlatform, ScheduleProvider};
use crate::resolver::Directory;
use crate::types::{Channel, ChatUser, Group, ProviderSchedule, ProviderUser, ScheduleRef};
use std::cell::RefCell;
use tokio_util::sync::CancellationToken;

pub fn group(id: &str, handle: &str) -> Group {
    Group {
        id: id.to_string(),
        name: handle.to_uppercase(),
        handle: handle.to_string(),
    }
}

pub fn chat_user(login: &str) -> ChatUser {
    ChatUser {
        id: format!("U-{login}"),
        name: login.to_string(),
        email: format!("{login}@example.com"),
    }
}

pub fn directory(logins: &[&str]) -> Directory {
    Directory {
        users: logins.iter().map(|l| chat_user(l)).collect(),
        ..Default::default()
    }
}

fn api_error(method: &str, reason: &str) -> SyncError {
    SyncError::Api {
        api: "fake",
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// FakeProvider
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeProvider {
    schedules: Vec<(ProviderSchedule, String)>,
    fail_schedule_lookup: bool,
    fail_on_call: Vec<String>,
    pub on_call_lookups: RefCell<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schedule whose on-call user has the email `<login>@example.com`.
    pub fn with_schedule(mut self, id: &str, name: &str, login: &str) -> Self {
        self.schedules.push((
            ProviderSchedule {
                id: id.to_string(),
                name: name.to_string(),
            },
            login.to_string(),
        ));
        self
    }

    pub fn failing_schedule_lookup(mut self) -> Self {
        self.fail_schedule_lookup = true;
        self
    }

    pub fn failing_on_call(mut self, schedule_id: &str) -> Self {
        self.fail_on_call.push(schedule_id.to_string());
        self
    }
}

impl ScheduleProvider for FakeProvider {
    fn get_schedule(&self, schedule: &ScheduleRef) -> Result<Option<ProviderSchedule>> {
        if self.fail_schedule_lookup {
            return Err(api_error("get_schedule", "boom"));
        }
        Ok(self
            .schedules
            .iter()
            .map(|(s, _)| s)
            .find(|s| match schedule {
                ScheduleRef::Id(id) => s.id == *id,
                ScheduleRef::Name(name) => s.name == *name,
            })
            .cloned())
    }

    fn get_on_call_user(&self, schedule: &ProviderSchedule) -> Result<ProviderUser> {
        self.on_call_lookups.borrow_mut().push(schedule.id.clone());
        if self.fail_on_call.contains(&schedule.id) {
            return Err(api_error("get_on_call_user", "no on-call user"));
        }
        let (_, login) = self
            .schedules
            .iter()
            .find(|(s, _)| s.id == schedule.id)
            .ok_or_else(|| api_error("get_on_call_user", "unknown schedule"))?;
        Ok(ProviderUser {
            id: format!("PD-{login}"),
            name: login.clone(),
            email: format!("{login}@example.com"),
        })
    }
}

// ---------------------------------------------------------------------------
// FakePlatform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Join(String),
    UpdateMembership(DesiredMembership),
    UpdateTopic { channel: String, topic: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinOutcome {
    #[default]
    Joined,
    MissingScope,
    Fail,
}

#[derive(Default)]
pub struct FakePlatform {
    pub users: Vec<ChatUser>,
    pub groups: Vec<Group>,
    pub channels: Vec<Channel>,
    pub join: JoinOutcome,
    /// Membership updates touching this group id fail.
    pub fail_membership_for: Option<String>,
    pub fail_topic: bool,
    /// Cancelled on the first membership update, as if interrupted mid-job.
    pub cancel_on_membership: Option<CancellationToken>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl ChatPlatform for FakePlatform {
    fn list_users(&self) -> Result<Vec<ChatUser>> {
        Ok(self.users.clone())
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.clone())
    }

    fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.clone())
    }

    fn join_channel(&self, channel_id: &str) -> Result<bool> {
        self.calls
            .borrow_mut()
            .push(Call::Join(channel_id.to_string()));
        match self.join {
            JoinOutcome::Joined => Ok(true),
            JoinOutcome::MissingScope => Err(SyncError::MissingPermission {
                action: format!("join channel {channel_id}"),
                scope: "channels:join".to_string(),
            }),
            JoinOutcome::Fail => Err(api_error("conversations.join", "channel_not_found")),
        }
    }

    fn update_group_membership(&self, membership: &DesiredMembership) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::UpdateMembership(membership.clone()));
        if let Some(token) = &self.cancel_on_membership {
            token.cancel();
        }
        if let Some(id) = &self.fail_membership_for {
            if membership.iter().any(|(g, _)| g.id == *id) {
                return Err(SyncError::Mutation {
                    action: format!("update user group {id}"),
                    reason: "invalid_users".to_string(),
                });
            }
        }
        Ok(())
    }

    fn update_channel_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::UpdateTopic {
            channel: channel_id.to_string(),
            topic: topic.to_string(),
        });
        if self.fail_topic {
            return Err(SyncError::Mutation {
                action: format!("update topic of channel {channel_id}"),
                reason: "not_in_channel".to_string(),
            });
        }
        Ok(())
    }
}
