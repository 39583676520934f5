pub mod sync;
pub mod validate;

use anyhow::Context;
use clap::Args;
use oncall_sync_core::types::ChannelRef;
use oncall_sync_core::{Config, RunOverrides};
use std::path::PathBuf;

/// Where the sync configuration comes from, shared by every subcommand.
#[derive(Args)]
pub struct ConfigArgs {
    /// YAML file describing one or more syncs
    #[arg(long, short = 'c', conflicts_with_all = ["schedules", "channel_id", "channel_name", "template", "template_file"])]
    pub config: Option<PathBuf>,

    /// Schedule specifier, e.g. `id=P123;userGroup=handle=oncall` (repeatable)
    #[arg(long = "schedule", value_name = "SPEC")]
    pub schedules: Vec<String>,

    /// ID of the channel whose topic is updated
    #[arg(long)]
    pub channel_id: Option<String>,

    /// Name of the channel whose topic is updated
    #[arg(long)]
    pub channel_name: Option<String>,

    /// Topic template, e.g. `primary: <@{{.Primary}}>`
    #[arg(long, conflicts_with = "template_file")]
    pub template: Option<String>,

    /// File containing the topic template
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// Compute changes without applying them (overrides every sync)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub dry_run: Option<bool>,

    /// Write user IDs into topics without mentioning anyone (overrides every sync)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub pretend_users: Option<bool>,
}

impl ConfigArgs {
    /// Load or generate the configuration, apply run-level overrides and
    /// validate it.
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => Config::single(&self.schedules, self.channel(), self.template_source()?)?,
        };

        config.apply_overrides(RunOverrides {
            dry_run: self.dry_run,
            pretend_users: self.pretend_users,
        });
        config.validate()?;
        Ok(config)
    }

    fn channel(&self) -> Option<ChannelRef> {
        if self.channel_id.is_none() && self.channel_name.is_none() {
            return None;
        }
        Some(ChannelRef {
            id: self.channel_id.clone(),
            name: self.channel_name.clone(),
        })
    }

    fn template_source(&self) -> anyhow::Result<Option<String>> {
        if let Some(path) = &self.template_file {
            let template = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read template file {}", path.display()))?;
            return Ok(Some(template.trim_end_matches('\n').to_string()));
        }
        Ok(self.template.clone())
    }
}
