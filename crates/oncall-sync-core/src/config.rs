use crate::error::{Result, SyncError};
use crate::template::TopicTemplate;
use crate::types::{ChannelRef, GroupRef, ScheduleRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Name given to the sync generated from command-line flags.
pub const DEFAULT_SYNC_NAME: &str = "default";

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// GroupConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl GroupConfig {
    /// The group reference, if exactly one discriminant is set.
    pub fn to_ref(&self) -> Option<GroupRef> {
        match (
            non_empty(&self.id),
            non_empty(&self.name),
            non_empty(&self.handle),
        ) {
            (Some(id), None, None) => Some(GroupRef::Id(id.to_string())),
            (None, Some(name), None) => Some(GroupRef::Name(name.to_string())),
            (None, None, Some(handle)) => Some(GroupRef::Handle(handle.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ID:{} Name:{:?} Handle:{}}}",
            self.id.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default(),
            self.handle.as_deref().unwrap_or_default()
        )
    }
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub user_groups: Vec<GroupConfig>,
}

impl ScheduleConfig {
    /// The schedule reference, if exactly one of id or name is set.
    pub fn to_ref(&self) -> Option<ScheduleRef> {
        match (non_empty(&self.id), non_empty(&self.name)) {
            (Some(id), None) => Some(ScheduleRef::Id(id.to_string())),
            (None, Some(name)) => Some(ScheduleRef::Name(name.to_string())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// One independently executed sync job as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub name: String,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub pretend_users: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn template_source(&self) -> Option<&str> {
        non_empty(&self.template)
    }

    fn invalid(&self, reason: impl Into<String>) -> SyncError {
        SyncError::InvalidSync {
            sync: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.schedules.is_empty() {
            return Err(self.invalid("must specify at least one schedule"));
        }

        for schedule in &self.schedules {
            if non_empty(&schedule.id).is_some() && non_empty(&schedule.name).is_some() {
                return Err(self.invalid("schedule ID and schedule name cannot both be given"));
            }
            if schedule.to_ref().is_none() {
                return Err(self.invalid("must specify either schedule ID or schedule name"));
            }
            for group in &schedule.user_groups {
                if group.to_ref().is_none() {
                    return Err(self.invalid(format!(
                        "user group {group} must specify exactly one of user group ID, name or handle"
                    )));
                }
            }
        }

        let channel_given = match &self.channel {
            Some(channel) => {
                if non_empty(&channel.id).is_none() && non_empty(&channel.name).is_none() {
                    return Err(self.invalid("channel must specify either channel ID or channel name"));
                }
                true
            }
            None => false,
        };

        match self.template_source() {
            Some(source) => {
                if !channel_given {
                    return Err(self.invalid(
                        "must specify either channel ID or channel name when template is given",
                    ));
                }
                TopicTemplate::parse(source)?;
            }
            None if channel_given => {
                return Err(self.invalid(
                    "must specify template when either channel ID or channel name is given",
                ));
            }
            None => {}
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RunOverrides
// ---------------------------------------------------------------------------

/// Run-level settings that, when present, replace every sync's own value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub dry_run: Option<bool>,
    pub pretend_users: Option<bool>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, alias = "slackSyncs")]
    pub syncs: Vec<SyncConfig>,
}

impl Config {
    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    /// Build a config holding a single sync from command-line style inputs.
    pub fn single(
        schedule_specifiers: &[String],
        channel: Option<ChannelRef>,
        template: Option<String>,
    ) -> Result<Self> {
        let schedules = schedule_specifiers
            .iter()
            .map(|s| parse_schedule(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            syncs: vec![SyncConfig {
                name: DEFAULT_SYNC_NAME.to_string(),
                schedules,
                channel,
                template,
                pretend_users: false,
                dry_run: false,
            }],
        })
    }

    pub fn apply_overrides(&mut self, overrides: RunOverrides) {
        for sync in &mut self.syncs {
            if let Some(pretend_users) = overrides.pretend_users {
                sync.pretend_users = pretend_users;
            }
            if let Some(dry_run) = overrides.dry_run {
                sync.dry_run = dry_run;
            }
        }
    }

    /// Check the configuration for mistakes that need no network access.
    pub fn validate(&self) -> Result<()> {
        if self.syncs.is_empty() {
            return Err(SyncError::NoSyncs);
        }

        let mut names = HashSet::new();
        for sync in &self.syncs {
            if !names.insert(sync.name.as_str()) {
                return Err(SyncError::DuplicateSyncName(sync.name.clone()));
            }
            sync.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Schedule specifiers
// ---------------------------------------------------------------------------

/// Parse a command-line schedule specifier such as
/// `id=P123;userGroup=handle=oncall;userGroup=name=SRE`.
pub fn parse_schedule(specifier: &str) -> Result<ScheduleConfig> {
    let mut kvs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for elem in specifier.split(';') {
        let (key, value) = elem
            .split_once('=')
            .ok_or_else(|| SyncError::MissingSeparator(elem.to_string()))?;
        kvs.entry(key).or_default().push(value);
    }

    let mut single = |key: &str| -> Result<Option<String>> {
        match kvs.remove(key) {
            Some(values) if values.len() > 1 => Err(SyncError::MultipleValues(key.to_string())),
            Some(values) => Ok(values.first().map(|v| v.to_string())),
            None => Ok(None),
        }
    };
    let id = single("id")?;
    let name = single("name")?;

    if non_empty(&id).is_some() && non_empty(&name).is_some() {
        return Err(SyncError::ConflictingIdentity);
    }

    let mut user_groups = Vec::new();
    for group in kvs.remove("userGroup").unwrap_or_default() {
        let parts: Vec<&str> = group.split('=').collect();
        let (key, value) = match parts.as_slice() {
            [key, value] => (*key, *value),
            _ => return Err(SyncError::MalformedGroupSpecifier(group.to_string())),
        };
        let mut cfg = GroupConfig::default();
        match key {
            "id" => cfg.id = Some(value.to_string()),
            "name" => cfg.name = Some(value.to_string()),
            "handle" => cfg.handle = Some(value.to_string()),
            other => {
                return Err(SyncError::UnexpectedGroupKey {
                    specifier: group.to_string(),
                    key: other.to_string(),
                })
            }
        }
        user_groups.push(cfg);
    }

    if !kvs.is_empty() {
        let left: Vec<String> = kvs
            .iter()
            .map(|(k, vs)| format!("{k}=[{}]", vs.join(" ")))
            .collect();
        return Err(SyncError::UnsupportedKeys(left.join(", ")));
    }

    Ok(ScheduleConfig {
        id,
        name,
        user_groups,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
