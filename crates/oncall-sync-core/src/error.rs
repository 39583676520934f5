use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Failure class, used by the orchestrator to decide whether a failure
/// aborts the run, fails one job, or is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration or unresolvable reference. Aborts the whole run.
    Configuration,
    /// Schedule, on-call or user lookup failed while a job ran.
    Lookup,
    /// Channel join lacks a scope. Logged, never fatal.
    Permission,
    /// Group membership or topic update failed.
    Mutation,
    /// Topic template failed to render.
    Template,
    /// HTTP or payload failure talking to an external API.
    Transport,
    Cancelled,
}

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing separator on element {0:?}")]
    MissingSeparator(String),

    #[error("multiple values for key {0:?} not allowed")]
    MultipleValues(String),

    #[error("\"id\" and \"name\" cannot be specified simultaneously")]
    ConflictingIdentity,

    #[error("user group {0} does not follow key=value pattern")]
    MalformedGroupSpecifier(String),

    #[error("user group {specifier} has unexpected key {key:?}")]
    UnexpectedGroupKey { specifier: String, key: String },

    #[error("unsupported key/value pairs left: {0}")]
    UnsupportedKeys(String),

    #[error("no syncs configured")]
    NoSyncs,

    #[error("sync name {0:?} already used")]
    DuplicateSyncName(String),

    #[error("sync {sync:?} invalid: {reason}")]
    InvalidSync { sync: String, reason: String },

    #[error("failed to parse template {template:?}: {reason}")]
    TemplateParse { template: String, reason: String },

    #[error("failed to find configured channel {0}")]
    ChannelNotFound(String),

    #[error("failed to create sync {sync:?}: schedule {schedule} not found")]
    ScheduleNotFound { sync: String, schedule: String },

    #[error("failed to create sync {sync:?}: user group {group} not found")]
    GroupNotFound { sync: String, group: String },

    #[error("failed to get schedule {schedule}: {source}")]
    ScheduleLookup {
        schedule: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("failed to get on-call user for schedule {schedule:?}: {reason}")]
    OnCallLookup { schedule: String, reason: String },

    #[error("failed to find chat user for on-call user {0}")]
    UserNotFound(String),

    #[error(
        "schedules {first:?} and {second:?} both map to topic key {key:?}; rename one of them"
    )]
    TopicKeyCollision {
        key: String,
        first: String,
        second: String,
    },

    #[error("missing permission {scope:?} for {action}")]
    MissingPermission { action: String, scope: String },

    #[error("failed to {action}: {reason}")]
    Mutation { action: String, reason: String },

    #[error("failed to render template: missing value for key {0:?}")]
    TemplateRender(String),

    #[error("{api} API call {method} failed: {reason}")]
    Api {
        api: &'static str,
        method: String,
        reason: String,
    },

    #[error("failed to run sync job {name}: {source}")]
    Job {
        name: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MissingSeparator(_)
            | SyncError::MultipleValues(_)
            | SyncError::ConflictingIdentity
            | SyncError::MalformedGroupSpecifier(_)
            | SyncError::UnexpectedGroupKey { .. }
            | SyncError::UnsupportedKeys(_)
            | SyncError::NoSyncs
            | SyncError::DuplicateSyncName(_)
            | SyncError::InvalidSync { .. }
            | SyncError::TemplateParse { .. }
            | SyncError::ChannelNotFound(_)
            | SyncError::ScheduleNotFound { .. }
            | SyncError::GroupNotFound { .. }
            | SyncError::ScheduleLookup { .. }
            | SyncError::Io(_)
            | SyncError::Yaml(_) => ErrorKind::Configuration,
            SyncError::OnCallLookup { .. } | SyncError::UserNotFound(_) => ErrorKind::Lookup,
            SyncError::MissingPermission { .. } => ErrorKind::Permission,
            SyncError::Mutation { .. } => ErrorKind::Mutation,
            SyncError::TemplateRender(_) | SyncError::TopicKeyCollision { .. } => {
                ErrorKind::Template
            }
            SyncError::Api { .. } | SyncError::Http(_) | SyncError::Json(_) => {
                ErrorKind::Transport
            }
            SyncError::Job { source, .. } => source.kind(),
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn in_job(self, name: &str) -> SyncError {
        SyncError::Job {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
