//! `streamgate run` command implementation

use crate::CliError;
use crate::cli::RunArgs;
use crate::output::{OutputFormat, Table, format_json};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use streamgate_foundation::{Orchestrator, SimulationReport};
use streamgate_kernel::config::SimulationConfig;
use streamgate_kernel::outcome::{SessionStatus, SimulationOutcome};
use streamgate_kernel::session::{NullSink, OutcomeSink};

/// Execute the `streamgate run` command
pub async fn run(
    config_path: Option<&Path>,
    args: &RunArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let config = apply_overrides(super::load_effective(config_path)?, args);
    let sink: Arc<dyn OutcomeSink> = match format {
        OutputFormat::Text => Arc::new(TextSink),
        OutputFormat::Json | OutputFormat::Table => Arc::new(NullSink),
    };

    let orchestrator = Orchestrator::new(config)?.with_sink(sink);
    if format == OutputFormat::Text {
        println!(
            "{} Simulating {} clients (max {}, {} workers)",
            "->".green(),
            orchestrator.config().num_clients,
            orchestrator.config().max_clients(),
            orchestrator.config().worker_limit()
        );
    }

    let report = orchestrator.run().await;

    match format {
        OutputFormat::Json => println!("{}", format_json(&report)),
        OutputFormat::Table => println!("{}", summary_table(&report)),
        OutputFormat::Text => print_summary(&report),
    }

    if !report.is_balanced() {
        return Err(CliError::Other(format!(
            "pool did not return to idle: {:?}",
            report.final_pool
        )));
    }
    Ok(())
}

/// Layer command-line flags over the loaded configuration.
pub fn apply_overrides(mut config: SimulationConfig, args: &RunArgs) -> SimulationConfig {
    if let Some(clients) = args.clients {
        config.num_clients = clients;
    }
    if let Some(workers) = args.workers {
        config.worker_concurrency_limit = Some(workers);
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(time_scale) = args.time_scale {
        config.time_scale = time_scale;
    }
    config
}

/// Prints one line per outcome as sessions finish.
struct TextSink;

impl OutcomeSink for TextSink {
    fn on_outcome(&self, outcome: &SimulationOutcome) {
        println!("{}", outcome_line(outcome));
    }
}

fn outcome_line(outcome: &SimulationOutcome) -> String {
    let id = format!("client {:>4}", outcome.client_id);
    match &outcome.status {
        SessionStatus::Completed => match outcome.timing {
            Some(t) => format!(
                "{id} {} total {:.3}s (latency {:.3}s, processing {:.3}s)",
                "admitted".green(),
                t.total_time_secs,
                t.network_latency_secs,
                t.processing_delay_secs
            ),
            None => format!("{id} {}", "admitted".green()),
        },
        SessionStatus::Rejected { reason } => format!("{id} {} {reason}", "rejected".yellow()),
        SessionStatus::Failed { message } => format!("{id} {} {message}", "failed".red()),
        other => format!("{id} {other:?}"),
    }
}

fn print_summary(report: &SimulationReport) {
    let summary = &report.summary;
    println!();
    println!("{} Simulation finished", "✓".green());
    println!("  clients                 = {}", summary.total);
    println!("  admitted                = {}", summary.admitted);
    println!("  rejected (client limit) = {}", summary.rejected_client_limit);
    println!("  rejected (resources)    = {}", summary.rejected_resource_exhausted);
    println!("  internal errors         = {}", summary.internal_errors);
    if let Some(mean) = summary.mean_total_time_secs {
        println!("  mean total time         = {mean:.3}s");
    }
    if let Some(max) = summary.max_total_time_secs {
        println!("  max total time          = {max:.3}s");
    }
    println!(
        "  peak active clients     = {}",
        report.final_pool.peak_active_clients
    );
}

fn summary_table(report: &SimulationReport) -> Table {
    let summary = &report.summary;
    let fmt_secs = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
    Table::new(&["metric", "value"])
        .row("clients", summary.total)
        .row("admitted", summary.admitted)
        .row("rejected (client limit)", summary.rejected_client_limit)
        .row("rejected (resources)", summary.rejected_resource_exhausted)
        .flagged_row("internal errors", summary.internal_errors, summary.internal_errors > 0)
        .row("mean total time (s)", fmt_secs(summary.mean_total_time_secs))
        .row("max total time (s)", fmt_secs(summary.max_total_time_secs))
        .row("max clients", report.max_clients)
        .row("worker limit", report.worker_limit)
        .row("peak active clients", report.final_pool.peak_active_clients)
        .flagged_row("pool idle", report.final_pool.is_idle(), !report.final_pool.is_idle())
}
