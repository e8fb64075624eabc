//! `streamgate config` command implementation

use crate::CliError;
use crate::output::{JsonOutput, OutputFormat, Table, format_json};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use streamgate_kernel::admission::{ResourceKind, from_micros};
use streamgate_kernel::config::SimulationConfig;

/// Limits derived from a configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedLimits {
    /// `floor(bandwidth / bitrate)`.
    pub max_clients: usize,
    pub worker_limit: usize,
    pub cpu_capacity_ghz: f64,
    pub cpu_per_client_ghz: f64,
    pub memory_per_client_gb: f64,
    pub storage_per_client_mbps: f64,
    /// Clients each resource could hold on its own.
    pub clients_by_resource: Vec<(ResourceKind, u64)>,
    /// Most clients that can hold a reservation at once.
    pub concurrent_client_limit: u64,
}

impl DerivedLimits {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let capacity = config.capacity();
        let demand = config.demand_for(config.per_client_bitrate_mbps);

        let clients_by_resource: Vec<(ResourceKind, u64)> = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let fit = capacity
                    .get(kind)
                    .checked_div(demand.get(kind))
                    .unwrap_or(u64::MAX);
                (kind, fit)
            })
            .collect();

        let concurrent_client_limit = clients_by_resource
            .iter()
            .map(|(_, fit)| *fit)
            .fold(config.max_clients() as u64, u64::min);

        Self {
            max_clients: config.max_clients(),
            worker_limit: config.worker_limit(),
            cpu_capacity_ghz: config.cpu_capacity_ghz(),
            cpu_per_client_ghz: from_micros(demand.cpu),
            memory_per_client_gb: from_micros(demand.memory),
            storage_per_client_mbps: from_micros(demand.storage),
            clients_by_resource,
            concurrent_client_limit,
        }
    }
}

/// Execute the `streamgate config show` command
pub fn run_show(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let config = super::load_effective(config_path)?;

    match format {
        OutputFormat::Json => println!("{}", format_json(&config)),
        OutputFormat::Table => {
            let mut table = Table::new(&["key", "value"]);
            for (key, value) in config_entries(&config) {
                table = table.row(&key, value);
            }
            println!("{table}");
        }
        OutputFormat::Text => {
            println!("{} Effective configuration", "->".green());
            println!();
            let entries = config_entries(&config);
            let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in entries {
                println!("  {:<width$} = {}", key, value, width = width);
            }
        }
    }
    Ok(())
}

/// Execute the `streamgate config validate` command
pub fn run_validate(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let config = super::load_validated(config_path)?;
    let limits = DerivedLimits::from_config(&config);

    match format {
        OutputFormat::Json => println!("{}", format_json(&limits)),
        OutputFormat::Table => {
            let mut table = Table::new(&["limit", "value"])
                .row("max clients (bandwidth)", limits.max_clients)
                .row("worker limit", limits.worker_limit)
                .row("cpu capacity (GHz)", limits.cpu_capacity_ghz);
            for (kind, fit) in &limits.clients_by_resource {
                table = table.row(&format!("clients by {kind}"), fit);
            }
            table = table.row("concurrent client limit", limits.concurrent_client_limit);
            println!("{table}");
        }
        OutputFormat::Text => {
            println!("{} Configuration is valid", "✓".green());
            println!();
            println!("  max clients (bandwidth) = {}", limits.max_clients);
            println!("  worker limit            = {}", limits.worker_limit);
            println!("  cpu capacity            = {} GHz", limits.cpu_capacity_ghz);
            println!(
                "  per-client demand       = {} GHz, {} GB, {} MB/s",
                limits.cpu_per_client_ghz,
                limits.memory_per_client_gb,
                limits.storage_per_client_mbps
            );
            for (kind, fit) in &limits.clients_by_resource {
                println!("  clients by {:<13}= {}", kind.to_string(), fit);
            }
            println!(
                "  concurrent client limit = {}",
                limits.concurrent_client_limit.to_string().cyan()
            );
        }
    }
    Ok(())
}

/// Flattened `key = value` pairs, nested keys joined with `.`.
fn config_entries(config: &SimulationConfig) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    flatten("", &config.to_json(), &mut entries);
    entries
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&key, value, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
