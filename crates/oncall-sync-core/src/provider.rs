//! Contracts the sync requires from the schedule provider and the chat
//! platform. `pagerduty` and `slack` hold the HTTP implementations.

use crate::engine::DesiredMembership;
use crate::error::Result;
use crate::types::{Channel, ChatUser, Group, ProviderSchedule, ProviderUser, ScheduleRef};

pub trait ScheduleProvider {
    /// Look up a schedule by id or exact name. `Ok(None)` means not found.
    fn get_schedule(&self, schedule: &ScheduleRef) -> Result<Option<ProviderSchedule>>;

    /// The user currently on call for `schedule`.
    fn get_on_call_user(&self, schedule: &ProviderSchedule) -> Result<ProviderUser>;
}

pub trait ChatPlatform {
    fn list_users(&self) -> Result<Vec<ChatUser>>;

    fn list_groups(&self) -> Result<Vec<Group>>;

    fn list_channels(&self) -> Result<Vec<Channel>>;

    /// Join a channel. Returns whether the bot was newly joined. A missing
    /// scope must surface as `SyncError::MissingPermission`.
    fn join_channel(&self, channel_id: &str) -> Result<bool>;

    /// Bring every group in `membership` to exactly the given member set.
    fn update_group_membership(&self, membership: &DesiredMembership) -> Result<()>;

    fn update_channel_topic(&self, channel_id: &str, topic: &str) -> Result<()>;
}
