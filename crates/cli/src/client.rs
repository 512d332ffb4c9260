//! API client for communicating with the fleet monitor daemon

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the fleet monitor HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with an empty body, expecting a JSON response
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request where the daemon returns no body (204)
    pub async fn post_no_content(&self, path: &str) -> Result<()> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        Ok(())
    }
}

// API response types, mirroring the daemon's wire format

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f32,
    pub vibration: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub energy_consumption: f32,
    pub delta_minutes: f32,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineEvaluation {
    pub machine_id: u32,
    pub predicted_rul: Option<f32>,
    pub downtime_risk: Option<u8>,
    pub failure_type: Option<String>,
    pub maintenance_required: bool,
    pub window_full: bool,
    pub latest_reading: Option<SensorReading>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub timestamp: String,
    pub machine_id: u32,
    pub failure_type: Option<String>,
    pub downtime_risk: Option<u8>,
    pub predicted_rul: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub evaluated_at: String,
    pub evaluations: Vec<MachineEvaluation>,
    pub all_ready: bool,
    pub events: Vec<MaintenanceEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub temperature: f32,
    pub vibration: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub energy_consumption: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPrediction {
    pub machine_id: u32,
    pub predicted_rul: Option<f32>,
    pub downtime_risk: Option<u8>,
    pub maintenance_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalResponse {
    pub effective_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/events")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"timestamp":"2026-08-30T10:00:00Z","machine_id":7,
                    "failure_type":"Overheat","downtime_risk":1,"predicted_rul":12.5}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let events: Vec<MaintenanceEvent> = client.get("/events").await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].machine_id, 7);
        assert_eq!(events[0].failure_type.as_deref(), Some("Overheat"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet")
            .with_status(503)
            .with_body(r#"{"error":"no snapshot yet"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<FleetSnapshot> = client.get("/fleet").await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("503"), "error should carry the status: {}", err);
    }

    #[tokio::test]
    async fn test_post_interval() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/controls/interval")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"effective_secs":10}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response: IntervalResponse = client
            .post("/controls/interval", &IntervalRequest { secs: 120 })
            .await
            .unwrap();

        assert_eq!(response.effective_secs, 10);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_manual_prediction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/machines/3/predict")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"machine_id":3,"predicted_rul":12.5,
                    "downtime_risk":1,"maintenance_required":true}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            temperature: 95.0,
            vibration: 80.0,
            pressure: 3.0,
            humidity: 60.0,
            energy_consumption: 2.5,
        };
        let prediction: ManualPrediction =
            client.post("/machines/3/predict", &request).await.unwrap();

        assert_eq!(prediction.machine_id, 3);
        assert!(prediction.maintenance_required);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fleet_row_without_reading_deserializes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"evaluated_at":"2026-08-30T10:00:00Z","all_ready":false,"events":[],
                    "evaluations":[{"machine_id":1,"predicted_rul":null,"downtime_risk":null,
                    "failure_type":null,"maintenance_required":false,"window_full":false,
                    "latest_reading":null}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let snapshot: FleetSnapshot = client.get("/fleet").await.unwrap();

        assert_eq!(snapshot.evaluations.len(), 1);
        assert!(snapshot.evaluations[0].latest_reading.is_none());
    }

    #[tokio::test]
    async fn test_post_no_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/controls/reset")
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        client.post_no_content("/controls/reset").await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
