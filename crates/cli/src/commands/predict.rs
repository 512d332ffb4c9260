//! What-if prediction from operator-supplied sensor values

use anyhow::Result;

use crate::client::{ApiClient, ManualPrediction, PredictRequest};
use crate::output::{color_maintenance, color_risk, color_rul, print_info, OutputFormat};

/// Run the risk and RUL models against a hand-entered reading.
///
/// No buffer is touched and no event is logged, so this is safe to use
/// for exploring sensor ranges against a live daemon.
pub async fn predict(
    client: &ApiClient,
    id: u32,
    request: PredictRequest,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("/machines/{}/predict", id);
    let prediction: ManualPrediction = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&prediction)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("Machine {}", prediction.machine_id);
            println!(
                "  Status:        {}",
                color_maintenance(prediction.maintenance_required)
            );
            println!("  RUL:           {}", color_rul(prediction.predicted_rul));
            println!(
                "  Downtime risk: {}",
                color_risk(prediction.downtime_risk)
            );
            print_info("One-off prediction; fleet buffers and the event log are unchanged");
        }
    }

    Ok(())
}
