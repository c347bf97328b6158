//! Weather ETL
//!
//! Fetches the current weather for a fixed coordinate from the Open-Meteo
//! API, flattens it into a [`WeatherRecord`], and appends it to the
//! `weather_data` table. One run per scheduled interval; scheduling,
//! retries and catch-up execution belong to whatever scheduler invokes it.
//!
//! # Architecture
//!
//! ```text
//! Open-Meteo ──► extract ──► transform ──► load ──► SQLite (weather_data)
//!                  │            │            │
//!                  │ raw JSON   │ record     │ CREATE IF NOT EXISTS + INSERT
//!                  └────────────┴────────────┘
//!                         dag::run (one chain)
//! ```
//!
//! # Modules
//!
//! - [`config`] — YAML configuration: coordinate, connections, schedule.
//! - [`extract`] — Open-Meteo client; a single GET per run.
//! - [`transform`] — Payload reshape into [`WeatherRecord`].
//! - [`load`] — `weather_data` table writer and reader.
//! - [`dag`] — The three-task chain and its schedule description.
//! - [`error`] — Pipeline-level error wrapping the step errors.

pub mod config;
pub mod dag;
pub mod error;
pub mod extract;
pub mod load;
pub mod transform;

pub use config::{Config, ConfigError, Coordinate};
pub use dag::{DagSpec, Task};
pub use error::PipelineError;
pub use extract::{FetchError, OpenMeteoClient};
pub use load::{StoredObservation, WriteError};
pub use transform::{TransformError, WeatherRecord};
