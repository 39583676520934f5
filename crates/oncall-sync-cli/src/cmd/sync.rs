use super::ConfigArgs;
use crate::output::print_table;
use anyhow::Context;
use clap::Args;
use oncall_sync_core::orchestrator::JobState;
use oncall_sync_core::pagerduty::{self, PagerDutyClient};
use oncall_sync_core::slack::{self, SlackClient};
use oncall_sync_core::{build_jobs, Config, Directory, RunOptions, RunReport, Syncer};
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Stop at the first failing sync instead of continuing with the next one
    #[arg(long)]
    pub fail_fast: bool,

    /// PagerDuty REST API token
    #[arg(long, env = "PAGERDUTY_TOKEN", hide_env_values = true)]
    pub pagerduty_token: String,

    /// Slack bot token
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: String,

    #[arg(long, env = "PAGERDUTY_API_URL", default_value = pagerduty::DEFAULT_BASE_URL, hide = true)]
    pub pagerduty_url: String,

    #[arg(long, env = "SLACK_API_URL", default_value = slack::DEFAULT_BASE_URL, hide = true)]
    pub slack_url: String,
}

pub fn run(args: SyncArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let options = RunOptions {
        fail_fast: args.fail_fast,
    };

    let cancel = CancellationToken::new();
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let report = runtime.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current sync");
                interrupt.cancel();
            }
        });

        let token = cancel.clone();
        tokio::task::spawn_blocking(move || execute(&args, &config, options, &token)).await?
    })?;

    print_report(&report);
    let failed = report.failed().count();
    if failed > 0 {
        tracing::warn!(failed, total = report.jobs.len(), "some syncs failed");
    }
    Ok(())
}

fn execute(
    args: &SyncArgs,
    config: &Config,
    options: RunOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<RunReport> {
    let pagerduty = PagerDutyClient::with_base_url(&args.pagerduty_token, &args.pagerduty_url)?;
    let slack = SlackClient::with_base_url(&args.slack_token, &args.slack_url)?;

    let with_channels = config.syncs.iter().any(|s| s.channel.is_some());
    let directory =
        Directory::load(&slack, with_channels).context("failed to load chat directory")?;
    let jobs = build_jobs(config, &pagerduty, &directory)?;
    tracing::info!(syncs = jobs.len(), "starting syncs");

    let report = Syncer::new(&pagerduty, &slack, &directory).run(&jobs, options, cancel)?;
    Ok(report)
}

fn print_report(report: &RunReport) {
    let rows = report
        .jobs
        .iter()
        .map(|job| {
            let state = match job.state {
                JobState::Done => "done".to_string(),
                JobState::Failed(at) => format!("failed ({at:?})"),
                other => format!("{other:?}"),
            };
            vec![job.name.clone(), state]
        })
        .collect();
    print_table(&["SYNC", "RESULT"], rows);
}
