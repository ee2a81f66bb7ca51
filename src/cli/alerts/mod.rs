//! Alerts command - one-shot rule evaluation for cron or manual use

use clap::Args;
use tracing::info;

use super::bootstrap;
use crate::domain::alert::{AlertRule, RuleOutcome};
use crate::infrastructure::observability::shutdown_tracing;

#[derive(Args, Debug)]
pub struct AlertsArgs {
    /// Rules to evaluate (pregnancy, health, capacity, feed); all when omitted
    #[arg(long, value_delimiter = ',')]
    pub rules: Vec<AlertRule>,

    /// Do not retry pending notifications after generating alerts
    #[arg(long)]
    pub skip_retries: bool,
}

pub async fn run(args: AlertsArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let state = crate::create_app_state(&config).await?;

    let outcomes = state.alerts.generate(&args.rules).await?;
    for line in summarize(&outcomes) {
        println!("{}", line);
    }

    if !args.skip_retries {
        let retried = state.notifications.process_due().await?;
        println!("notifications retried: {}", retried);
    }

    info!(rules = outcomes.len(), "Alert run finished");
    shutdown_tracing();

    Ok(())
}

fn summarize(outcomes: &[RuleOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|o| {
            format!(
                "{}: {} created, {} resolved",
                o.rule.map(|r| r.as_str()).unwrap_or("all"),
                o.created.len(),
                o.resolved
            )
        })
        .collect()
}
