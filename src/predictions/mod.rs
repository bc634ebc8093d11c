pub mod models;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Local;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Config;

use self::models::{
    LoadFeatures, LoadPrediction, SpeedFeatures, SpeedPrediction, StartStopAnalysis,
    StartStopFeatures, StartStopResponse, UsageFeatures, UsagePrediction, VibrationFeatures,
};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One forwarding route of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Vibration,
    Usage,
    Load,
    Speed,
    StartStop,
}

impl Operation {
    fn path(self) -> &'static str {
        match self {
            Operation::Vibration => "/predict",
            Operation::Usage => "/predict_usage",
            Operation::Load => "/predict_load",
            Operation::Speed => "/predict_speed",
            Operation::StartStop => "/analyze_start_stop",
        }
    }

    /// Caller-facing message for any failure other than an unreachable service.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Vibration => "Error communicating with ML service",
            Operation::Usage => "Error predicting usage pattern",
            Operation::Load => "Error predicting load",
            Operation::Speed => "Error predicting optimal speed",
            Operation::StartStop => "Error analyzing start/stop pattern",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("ML service is not available")]
    Unavailable(#[source] reqwest::Error),
    #[error("{}", .operation.failure_message())]
    Failed {
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PredictionClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    /// Usage/load/speed/start-stop service.
    ml_base_url: String,
    /// Vibration prediction service.
    prediction_base_url: String,
}

impl PredictionClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_base_urls(
            &config.ml_service_url,
            &config.prediction_service_url,
            config.ml_timeout,
        )
    }

    pub fn with_base_urls(
        ml_base_url: &str,
        prediction_base_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build ML service HTTP client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                ml_base_url: ml_base_url.trim_end_matches('/').to_owned(),
                prediction_base_url: prediction_base_url.trim_end_matches('/').to_owned(),
            }),
        })
    }

    /// Forward a vibration reading to the prediction service and relay its answer as is.
    pub async fn predict_vibration(
        &self,
        vibration: f64,
    ) -> Result<serde_json::Value, GatewayError> {
        self.post(Operation::Vibration, &VibrationFeatures { vibration })
            .await
    }

    pub async fn predict_usage(&self, hours: f64) -> Result<UsagePrediction, GatewayError> {
        let features = UsageFeatures::at(hours, &Local::now());
        self.post(Operation::Usage, &features).await
    }

    pub async fn predict_load(&self, load: f64) -> Result<LoadPrediction, GatewayError> {
        self.post(Operation::Load, &LoadFeatures::from_load(load)).await
    }

    pub async fn predict_speed(&self, speed: f64) -> Result<SpeedPrediction, GatewayError> {
        self.post(Operation::Speed, &SpeedFeatures::from_speed(speed))
            .await
    }

    /// Start/stop cycling analysis. The vibration change sent downstream is simulated.
    pub async fn analyze_start_stop(&self) -> Result<StartStopAnalysis, GatewayError> {
        let features = StartStopFeatures::simulated(&mut rand::thread_rng());
        let resp: StartStopResponse = self.post(Operation::StartStop, &features).await?;
        Ok(resp.into())
    }

    fn url(&self, operation: Operation) -> String {
        let base = match operation {
            Operation::Vibration => &self.inner.prediction_base_url,
            _ => &self.inner.ml_base_url,
        };
        format!("{}{}", base, operation.path())
    }

    async fn post<B, R>(&self, operation: Operation, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        let url = self.url(operation);
        debug!(url = %url, body = ?body, "Forwarding request to ML service");

        let result = async {
            let resp = self
                .inner
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| classify(operation, e))?;

            let bytes = resp
                .error_for_status()
                .map_err(|e| failed(operation, e, "ML service returned error status"))?
                .bytes()
                .await
                .map_err(|e| failed(operation, e, "Failed to read ML service response body"))?;

            serde_json::from_slice::<R>(&bytes)
                .map_err(|e| failed(operation, e, "Failed to deserialize ML service response"))
        }
        .await;

        if let Err(e) = &result {
            error!(url = %url, error = ?e, "ML service request failed");
        }
        result
    }
}

fn classify(operation: Operation, e: reqwest::Error) -> GatewayError {
    if e.is_connect() {
        GatewayError::Unavailable(e)
    } else {
        failed(operation, e, "ML service request failed")
    }
}

fn failed<E>(operation: Operation, e: E, context: &'static str) -> GatewayError
where
    E: std::error::Error + Send + Sync + 'static,
{
    GatewayError::Failed {
        operation,
        source: anyhow::Error::new(e).context(context),
    }
}
