//! Fleet overview and single-machine evaluation commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, FleetSnapshot, MachineEvaluation};
use crate::output::{
    color_maintenance, color_risk, color_rul, format_failure_type, format_timestamp, print_info,
    print_warning, OutputFormat,
};

/// Row for the fleet status table
#[derive(Tabled)]
struct FleetRow {
    #[tabled(rename = "Machine")]
    machine: u32,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Vibration")]
    vibration: String,
    #[tabled(rename = "RUL")]
    rul: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Failure Type")]
    failure_type: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn fleet_row(e: &MachineEvaluation) -> FleetRow {
    let (temperature, vibration) = match &e.latest_reading {
        Some(r) => (format!("{:.1}", r.temperature), format!("{:.1}", r.vibration)),
        None => ("-".to_string(), "-".to_string()),
    };
    FleetRow {
        machine: e.machine_id,
        temperature,
        vibration,
        rul: color_rul(e.predicted_rul),
        risk: color_risk(e.downtime_risk),
        failure_type: format_failure_type(e.failure_type.as_deref()),
        window: if e.window_full { "full" } else { "filling" }.to_string(),
        status: color_maintenance(e.maintenance_required),
    }
}

/// Show the latest full-fleet snapshot
pub async fn show_fleet(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: FleetSnapshot = client.get("/fleet").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if snapshot.evaluations.is_empty() {
                print_warning("No machines in the fleet snapshot");
                return Ok(());
            }

            let rows: Vec<FleetRow> = snapshot.evaluations.iter().map(fleet_row).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            let flagged = snapshot
                .evaluations
                .iter()
                .filter(|e| e.maintenance_required)
                .count();
            println!(
                "\nEvaluated at: {}",
                format_timestamp(&snapshot.evaluated_at)
            );
            println!(
                "Machines: {}  Flagged: {}  All windows full: {}",
                snapshot.evaluations.len(),
                flagged,
                if snapshot.all_ready { "yes" } else { "no" }
            );
        }
    }

    Ok(())
}

/// Evaluate a single machine on demand and show the result
pub async fn evaluate_machine(client: &ApiClient, id: u32, format: OutputFormat) -> Result<()> {
    let path = format!("/machines/{}/evaluate", id);
    let evaluation: MachineEvaluation = client.post_empty(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&evaluation)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("Machine {}", evaluation.machine_id);
            println!("  Status:        {}", color_maintenance(evaluation.maintenance_required));
            println!("  RUL:           {}", color_rul(evaluation.predicted_rul));
            println!("  Downtime risk: {}", color_risk(evaluation.downtime_risk));
            println!(
                "  Failure type:  {}",
                format_failure_type(evaluation.failure_type.as_deref())
            );
            println!(
                "  Window:        {}",
                if evaluation.window_full { "full" } else { "filling" }
            );
            match &evaluation.latest_reading {
                Some(r) => println!(
                    "  Last reading:  temp {:.1}  vib {:.1}  pressure {:.1}  humidity {:.1}  energy {:.2}",
                    r.temperature, r.vibration, r.pressure, r.humidity, r.energy_consumption,
                ),
                None => println!("  Last reading:  none"),
            }

            if !evaluation.window_full {
                print_info("Sequence window still filling; failure classification unavailable");
            }
        }
    }

    Ok(())
}
