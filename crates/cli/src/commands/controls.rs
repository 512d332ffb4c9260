//! Operator control commands

use anyhow::Result;

use crate::client::{ApiClient, FleetSnapshot, IntervalRequest, IntervalResponse, RunRequest, RunResponse};
use crate::output::{print_success, print_warning, OutputFormat};

/// Clear every sequence buffer and the event log
pub async fn reset(client: &ApiClient) -> Result<()> {
    client.post_no_content("/controls/reset").await?;
    print_success("Sequence buffers and event log cleared");
    Ok(())
}

/// Request a new refresh interval; the daemon clamps it to its bounds
pub async fn set_interval(client: &ApiClient, secs: u64) -> Result<()> {
    let response: IntervalResponse = client
        .post("/controls/interval", &IntervalRequest { secs })
        .await?;

    if response.effective_secs == secs {
        print_success(&format!("Refresh interval set to {}s", secs));
    } else {
        print_warning(&format!(
            "Requested {}s was clamped to {}s",
            secs, response.effective_secs
        ));
    }
    Ok(())
}

/// Toggle the daemon's timer loop
pub async fn set_running(client: &ApiClient, run: bool) -> Result<()> {
    let response: RunResponse = client.post("/controls/run", &RunRequest { run }).await?;

    if response.running {
        print_success("Monitoring started");
    } else {
        print_success("Monitoring stopped");
    }
    Ok(())
}

/// Trigger one fleet evaluation immediately
pub async fn tick(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: FleetSnapshot = client.post_empty("/controls/tick").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let flagged = snapshot
                .evaluations
                .iter()
                .filter(|e| e.maintenance_required)
                .count();
            print_success(&format!(
                "Evaluated {} machines, {} flagged for maintenance",
                snapshot.evaluations.len(),
                flagged
            ));
        }
    }

    Ok(())
}
