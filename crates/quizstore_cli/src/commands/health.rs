//! Health command implementation.

use quizstore_core::{format_bytes, CapacitySnapshot, HealthReport, QuizStore};
use serde::Serialize;

/// Health command output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOutput {
    /// Capacity estimate, if it could be taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacitySnapshot>,
    /// Classified health.
    pub health: HealthReport,
}

/// Runs the health command.
pub async fn run(store: &QuizStore, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let output = HealthOutput {
        capacity: store.capacity_snapshot().await.ok(),
        health: store.health_status().await,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        "text" => print_text(&output),
        other => return Err(format!("Unknown format '{other}'. Use text or json.").into()),
    }
    Ok(())
}

fn print_text(output: &HealthOutput) {
    println!("Status: {}", output.health.status);

    if let Some(capacity) = &output.capacity {
        println!("Backend: {}", capacity.backend);
        match (capacity.total_bytes, capacity.percent_used) {
            (Some(total), Some(percent)) => println!(
                "Usage: {} of {} ({:.2}%)",
                format_bytes(capacity.used_bytes),
                format_bytes(total),
                percent
            ),
            _ => println!("Usage: {} (total unknown)", format_bytes(capacity.used_bytes)),
        }
        println!();
        println!("Collections:");
        for (name, usage) in &capacity.per_collection {
            println!(
                "  {:<14} {:>6} item(s)  {:>10}",
                name,
                usage.item_count,
                format_bytes(usage.estimated_bytes)
            );
        }
    }

    if !output.health.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &output.health.warnings {
            println!("  ⚠ {warning}");
        }
    }
    if !output.health.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for recommendation in &output.health.recommendations {
            println!("  - {recommendation}");
        }
    }
}
