//! Raw reqwest Open-Meteo client.
//!
//! One GET per run against `/v1/forecast` with `current_weather=true`.
//! No retries, no timeout override, no pagination; the scheduler owns
//! retry policy.

use serde_json::Value;

use crate::config::{Coordinate, HttpConnection};

// ── Constants ───────────────────────────────────────────────────────

/// Forecast endpoint path, appended to the connection's base URL.
const FORECAST_PATH: &str = "/v1/forecast";

// ── Errors ──────────────────────────────────────────────────────────

/// Errors from the extract step.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch weather data: status {status}")]
    Status { status: u16 },

    #[error("response body is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

// ── Client ──────────────────────────────────────────────────────────

/// A minimal Open-Meteo forecast client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Create a client against `base_url` (e.g. `https://api.open-meteo.com`).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from a named HTTP connection.
    pub fn from_connection(conn: &HttpConnection) -> Self {
        log::debug!("[Extract] using connection '{}' ({})", conn.conn_id, conn.base_url);
        Self::new(&conn.base_url)
    }

    /// Full request URL for the current conditions at `location`.
    pub fn forecast_url(&self, location: &Coordinate) -> String {
        format!(
            "{}{}?latitude={}&longitude={}&current_weather=true",
            self.base_url, FORECAST_PATH, location.latitude, location.longitude
        )
    }

    /// Fetch the current conditions for `location`.
    ///
    /// Only status 200 counts as success; every other status, including
    /// other 2xx codes, is a `FetchError::Status`.
    pub async fn current_weather(&self, location: &Coordinate) -> Result<Value> {
        let url = self.forecast_url(location);
        log::info!("[Extract] GET {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            log::error!("[Extract] weather API returned status {}", status);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let payload: Value = serde_json::from_slice(&body)?;
        Ok(payload)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
