use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// References (configured, unresolved)
// ---------------------------------------------------------------------------

/// A configured schedule, identified by exactly one of id or name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleRef {
    Id(String),
    Name(String),
}

impl fmt::Display for ScheduleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleRef::Id(id) => write!(f, "{{ID:{id}}}"),
            ScheduleRef::Name(name) => write!(f, "{{Name:{name:?}}}"),
        }
    }
}

/// A configured user group, identified by exactly one of id, name or handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupRef {
    Id(String),
    Name(String),
    Handle(String),
}

impl GroupRef {
    pub fn matches(&self, group: &Group) -> bool {
        match self {
            GroupRef::Id(id) => group.id == *id,
            GroupRef::Name(name) => group.name == *name,
            GroupRef::Handle(handle) => group.handle == *handle,
        }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Id(id) => write!(f, "{{ID:{id}}}"),
            GroupRef::Name(name) => write!(f, "{{Name:{name:?}}}"),
            GroupRef::Handle(handle) => write!(f, "{{Handle:{handle}}}"),
        }
    }
}

/// A configured channel. Resolution prefers the id when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ID:{} Name:{:?}}}",
            self.id.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default()
        )
    }
}

// ---------------------------------------------------------------------------
// Schedule provider entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSchedule {
    pub id: String,
    pub name: String,
}

impl fmt::Display for ProviderSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ID:{} Name:{:?}}}", self.id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl fmt::Display for ProviderUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ID:{} Name:{:?} Email:{}}}", self.id, self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// Chat platform entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub handle: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ID:{} Name:{:?} Handle:{}}}",
            self.id, self.name, self.handle
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}
