use clap::Parser;
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slash_reimburse::cli::{Cli, Commands};
use slash_reimburse::client;
use slash_reimburse::config::ReimburseConfig;
use slash_reimburse::orchestrator::Orchestrator;
use slash_reimburse::reimburse::{parse_wei, Allocator, ReportWriter};
use slash_reimburse::staking::SlashingEvent;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = ReimburseConfig::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);

    // Logs go to stderr; stdout carries only reimbursement lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    info!(config = %cli.config, "Slash reimbursement starting");

    let (blocks, registry) = client::connect(&config.sources)?;
    let allocator = Allocator::new(parse_wei(&config.allocation.tolerance_wei)?);
    let orchestrator = Orchestrator::new(blocks, registry, &config.paging, allocator);

    let stdout = std::io::stdout();
    let mut report = ReportWriter::new(stdout.lock());

    match cli.command {
        Commands::Run { start, end, .. } => {
            let min_amount = parse_wei(&config.allocation.min_amount_wei)?;
            let summary = orchestrator.run(start, end, &min_amount, &mut report).await?;
            info!(
                events = summary.events,
                lines = summary.reimbursements,
                total = %summary.total_reimbursed,
                "Run complete"
            );
        }
        Commands::Event { operator, date, amount } => {
            let event = SlashingEvent {
                id: format!("{}-{}", operator, date),
                amount: parse_wei(&amount)?,
                date,
                operator_id: operator,
            };
            let reimbursements = orchestrator.process_event(&event).await?;
            report.write_event(&reimbursements)?;
        }
    }
    Ok(())
}
