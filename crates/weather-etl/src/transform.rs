//! Reshape an Open-Meteo payload into a flat [`WeatherRecord`].
//!
//! Identity mapping: values are copied as-is. No unit conversion, no
//! defaults for absent fields, no range checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Coordinate;

/// Object in the API response holding the current conditions.
const CURRENT_WEATHER: &str = "current_weather";

/// Errors from the transform step.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransformError {
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("field {field} is not {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// One observation, ready to be written to `weather_data`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub windspeed: f64,
    pub winddirection: f64,
    pub weathercode: i64,
}

/// Build a [`WeatherRecord`] from the raw API body.
pub fn reshape(raw: &Value, location: &Coordinate) -> Result<WeatherRecord> {
    let current = raw
        .get(CURRENT_WEATHER)
        .ok_or_else(|| TransformError::MissingField(CURRENT_WEATHER.to_string()))?;

    Ok(WeatherRecord {
        latitude: location.latitude,
        longitude: location.longitude,
        temperature: number_field(current, "temperature")?,
        windspeed: number_field(current, "windspeed")?,
        winddirection: number_field(current, "winddirection")?,
        weathercode: integer_field(current, "weathercode")?,
    })
}

fn field<'a>(current: &'a Value, name: &str) -> Result<&'a Value> {
    current
        .get(name)
        .ok_or_else(|| TransformError::MissingField(format!("{}.{}", CURRENT_WEATHER, name)))
}

fn number_field(current: &Value, name: &str) -> Result<f64> {
    field(current, name)?
        .as_f64()
        .ok_or_else(|| TransformError::InvalidField {
            field: format!("{}.{}", CURRENT_WEATHER, name),
            expected: "a number",
        })
}

fn integer_field(current: &Value, name: &str) -> Result<i64> {
    field(current, name)?
        .as_i64()
        .ok_or_else(|| TransformError::InvalidField {
            field: format!("{}.{}", CURRENT_WEATHER, name),
            expected: "an integer",
        })
}
