//! Thin client for the external water-potability prediction service.

use crate::models::report::Severity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),
    #[error("prediction service responded with status {0}")]
    UpstreamStatus(u16),
    #[error("prediction service unreachable: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// The nine water-quality parameters the model was trained on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaterSample {
    pub ph: f64,
    #[serde(rename = "Hardness")]
    pub hardness: f64,
    #[serde(rename = "Solids")]
    pub solids: f64,
    #[serde(rename = "Chloramines")]
    pub chloramines: f64,
    #[serde(rename = "Sulfate")]
    pub sulfate: f64,
    #[serde(rename = "Conductivity")]
    pub conductivity: f64,
    #[serde(rename = "Organic_carbon")]
    pub organic_carbon: f64,
    #[serde(rename = "Trihalomethanes")]
    pub trihalomethanes: f64,
    #[serde(rename = "Turbidity")]
    pub turbidity: f64,
}

impl WaterSample {
    fn validate(&self) -> Result<(), PredictionError> {
        let fields = [
            ("ph", self.ph),
            ("Hardness", self.hardness),
            ("Solids", self.solids),
            ("Chloramines", self.chloramines),
            ("Sulfate", self.sulfate),
            ("Conductivity", self.conductivity),
            ("Organic_carbon", self.organic_carbon),
            ("Trihalomethanes", self.trihalomethanes),
            ("Turbidity", self.turbidity),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(PredictionError::InvalidSample(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self.ph > 14.0 {
            return Err(PredictionError::InvalidSample("ph must be between 0 and 14".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamPrediction {
    potability_prediction: u8,
    probability: f64,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    threshold_used: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prediction {
    pub potability_prediction: u8,
    pub probability: f64,
    pub severity: Option<Severity>,
    pub threshold_used: Option<f64>,
    /// Human-readable outcome shown on the analytics page.
    pub verdict: String,
}

impl From<UpstreamPrediction> for Prediction {
    fn from(upstream: UpstreamPrediction) -> Self {
        let verdict = if upstream.potability_prediction == 1 {
            "Safe to Drink"
        } else {
            "Unsafe"
        };
        Self {
            potability_prediction: upstream.potability_prediction,
            probability: upstream.probability,
            severity: upstream.severity,
            threshold_used: upstream.threshold_used,
            verdict: verdict.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct PredictionService {
    base_url: String,
    client: reqwest::Client,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl PredictionService {
    pub fn new(base_url: &str) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn predict(&self, sample: &WaterSample) -> Result<Prediction, PredictionError> {
        sample.validate()?;

        let url = format!("{}/predict", self.base_url);
        debug!("forwarding sample to {}", url);
        let response = self.client.post(&url).json(sample).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::UpstreamStatus(status.as_u16()));
        }

        let upstream: UpstreamPrediction = response.json().await?;
        Ok(upstream.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    fn sample() -> WaterSample {
        WaterSample {
            ph: 7.1,
            hardness: 204.0,
            solids: 20791.0,
            chloramines: 7.3,
            sulfate: 368.5,
            conductivity: 564.3,
            organic_carbon: 10.4,
            trihalomethanes: 86.9,
            turbidity: 2.9,
        }
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn sample_uses_upstream_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["Organic_carbon"], json!(10.4));
        assert_eq!(value["ph"], json!(7.1));
    }

    #[test]
    fn out_of_range_samples_are_rejected() {
        let mut bad = sample();
        bad.ph = 15.0;
        assert!(matches!(bad.validate(), Err(PredictionError::InvalidSample(_))));

        let mut bad = sample();
        bad.turbidity = f64::NAN;
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn forwards_sample_and_labels_the_result() {
        let router = Router::new().route(
            "/predict",
            post(|Json(body): Json<Value>| async move {
                let potable = if body["ph"].as_f64() == Some(7.1) { 1 } else { 0 };
                Json(json!({
                    "potability_prediction": potable,
                    "probability": 0.81,
                    "threshold_used": 0.5
                }))
            }),
        );
        let service = PredictionService::new(&spawn(router).await).unwrap();

        let prediction = service.predict(&sample()).await.unwrap();
        assert_eq!(prediction.potability_prediction, 1);
        assert_eq!(prediction.verdict, "Safe to Drink");
        assert_eq!(prediction.threshold_used, Some(0.5));
        assert_eq!(prediction.severity, None);
    }

    #[tokio::test]
    async fn upstream_errors_surface_as_status() {
        let router = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model missing") }),
        );
        let service = PredictionService::new(&spawn(router).await).unwrap();

        assert!(matches!(
            service.predict(&sample()).await,
            Err(PredictionError::UpstreamStatus(500))
        ));
    }
}
