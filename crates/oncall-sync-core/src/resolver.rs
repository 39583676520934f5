//! Identity resolution against a snapshot of the chat platform's users,
//! user groups and channels.

use crate::error::{Result, SyncError};
use crate::provider::ChatPlatform;
use crate::types::{Channel, ChannelRef, ChatUser, Group, GroupRef, ProviderUser};

/// Users, groups and channels known to the chat platform, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub users: Vec<ChatUser>,
    pub groups: Vec<Group>,
    pub channels: Vec<Channel>,
}

impl Directory {
    /// Load the directory. Channels are only listed when `with_channels` is set.
    pub fn load(platform: &impl ChatPlatform, with_channels: bool) -> Result<Self> {
        let users = platform.list_users()?;
        tracing::info!(count = users.len(), "loaded chat users");
        let groups = platform.list_groups()?;
        tracing::info!(count = groups.len(), "loaded user groups");
        let channels = if with_channels {
            let channels = platform.list_channels()?;
            tracing::info!(count = channels.len(), "loaded channels");
            channels
        } else {
            Vec::new()
        };
        Ok(Self {
            users,
            groups,
            channels,
        })
    }

    pub fn find_group(&self, group_ref: &GroupRef) -> Option<&Group> {
        self.groups.iter().find(|g| group_ref.matches(g))
    }

    /// Match a provider user to a chat user by email, ignoring case.
    pub fn find_user(&self, provider_user: &ProviderUser) -> Result<&ChatUser> {
        if !provider_user.email.is_empty() {
            let found = self
                .users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(&provider_user.email));
            if let Some(user) = found {
                return Ok(user);
            }
        }
        Err(SyncError::UserNotFound(provider_user.to_string()))
    }

    pub fn find_channel(&self, channel_ref: &ChannelRef) -> Result<&Channel> {
        let id = channel_ref.id.as_deref().filter(|id| !id.is_empty());
        let found = match id {
            Some(id) => self.channels.iter().find(|c| c.id == id),
            None => channel_ref
                .name
                .as_deref()
                .and_then(|name| self.channels.iter().find(|c| c.name == name)),
        };
        found.ok_or_else(|| SyncError::ChannelNotFound(channel_ref.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
