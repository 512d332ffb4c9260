//! Maintenance event log command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, MaintenanceEvent};
use crate::output::{
    format_failure_type, format_risk, format_rul, format_timestamp, print_info, OutputFormat,
};

/// Row for the event log table
#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Machine")]
    machine: u32,
    #[tabled(rename = "Failure Type")]
    failure_type: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "RUL")]
    rul: String,
}

/// Show the rolling maintenance event log, oldest first
pub async fn show_events(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let events: Vec<MaintenanceEvent> = client.get("/events").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&events)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if events.is_empty() {
                print_info("No maintenance events recorded");
                return Ok(());
            }

            let rows: Vec<EventRow> = events
                .iter()
                .map(|e| EventRow {
                    time: format_timestamp(&e.timestamp),
                    machine: e.machine_id,
                    failure_type: format_failure_type(e.failure_type.as_deref()),
                    risk: format_risk(e.downtime_risk),
                    rul: format_rul(e.predicted_rul),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
