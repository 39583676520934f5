use super::ConfigArgs;
use crate::output::{print_json, print_table};
use clap::Args;
use oncall_sync_core::Config;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the effective configuration as JSON
    #[arg(long, short = 'j')]
    pub json: bool,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;

    if args.json {
        return print_json(&config);
    }

    print_table(&["SYNC", "SCHEDULES", "USER GROUPS", "CHANNEL", "MODE"], rows(&config));
    println!();
    println!("configuration is valid");
    Ok(())
}

fn rows(config: &Config) -> Vec<Vec<String>> {
    config
        .syncs
        .iter()
        .map(|sync| {
            let groups: usize = sync.schedules.iter().map(|s| s.user_groups.len()).sum();
            let channel = sync
                .channel
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let mut mode = Vec::new();
            if sync.dry_run {
                mode.push("dry-run");
            }
            if sync.pretend_users {
                mode.push("pretend-users");
            }
            vec![
                sync.name.clone(),
                sync.schedules.len().to_string(),
                groups.to_string(),
                channel,
                if mode.is_empty() { "-".to_string() } else { mode.join(",") },
            ]
        })
        .collect()
}
