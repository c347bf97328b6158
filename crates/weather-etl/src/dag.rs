//! The extract → transform → load chain.
//!
//! [`run`] executes the three tasks once, in order, each consuming the
//! previous task's output. [`run_task`] executes a single task with its
//! input supplied as JSON, for schedulers that invoke steps separately.
//! [`DagSpec`] describes the chain and its cadence for registration with
//! an external scheduler; nothing here executes on a timer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::extract::OpenMeteoClient;
use crate::load;
use crate::transform::{self, WeatherRecord};

/// Errors from schedule parsing.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression: {0}")]
    CronParse(String),
}

// ── Tasks ───────────────────────────────────────────────────────────

/// One step of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Extract,
    Transform,
    Load,
}

impl Task {
    /// Tasks in execution order.
    pub const CHAIN: [Task; 3] = [Task::Extract, Task::Transform, Task::Load];

    /// Task id as registered with the scheduler.
    pub fn id(&self) -> &'static str {
        match self {
            Task::Extract => "extract_weather_data",
            Task::Transform => "transform_weather_data",
            Task::Load => "load_weather_data",
        }
    }

    /// Short name used on the command line.
    pub fn short_name(&self) -> &'static str {
        match self {
            Task::Extract => "extract",
            Task::Transform => "transform",
            Task::Load => "load",
        }
    }

    /// The task whose output this task consumes.
    pub fn upstream(&self) -> Option<Task> {
        match self {
            Task::Extract => None,
            Task::Transform => Some(Task::Extract),
            Task::Load => Some(Task::Transform),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Task {
    type Err = String;

    /// Accepts the short name (`extract`) or the task id (`extract_weather_data`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Task::CHAIN
            .into_iter()
            .find(|t| t.short_name() == s || t.id() == s)
            .ok_or_else(|| format!("unknown task '{}' (expected extract, transform or load)", s))
    }
}

// ── Steps ───────────────────────────────────────────────────────────

/// Fetch the raw observation for the configured location.
pub async fn extract(config: &Config) -> Result<Value> {
    let client = OpenMeteoClient::from_connection(&config.api);
    Ok(client.current_weather(&config.location).await?)
}

/// Flatten the raw observation into a record.
pub fn transform(config: &Config, raw: &Value) -> Result<WeatherRecord> {
    Ok(transform::reshape(raw, &config.location)?)
}

/// Append the record to the configured database.
pub fn load(config: &Config, record: &WeatherRecord) -> Result<()> {
    log::debug!(
        "[Load] using connection '{}' ({})",
        config.database.conn_id,
        config.database.path.display()
    );
    Ok(load::write(&config.database.path, record)?)
}

/// Run the whole chain once. Stops at the first failing task.
pub async fn run(config: &Config) -> Result<WeatherRecord> {
    log::info!("[{}] run started", config.dag_id);

    log_start(config, Task::Extract);
    let raw = extract(config).await.inspect_err(|e| log_failed(config, e))?;
    log_done(config, Task::Extract);

    log_start(config, Task::Transform);
    let record = transform(config, &raw).inspect_err(|e| log_failed(config, e))?;
    log_done(config, Task::Transform);

    log_start(config, Task::Load);
    load(config, &record).inspect_err(|e| log_failed(config, e))?;
    log_done(config, Task::Load);

    log::info!(
        "[{}] run finished: temperature={} windspeed={} winddirection={} weathercode={}",
        config.dag_id,
        record.temperature,
        record.windspeed,
        record.winddirection,
        record.weathercode
    );
    Ok(record)
}

/// Run a single task.
///
/// `input` is the upstream task's JSON output (ignored for `extract`).
/// Returns this task's JSON output, or `None` for `load`.
pub async fn run_task(config: &Config, task: Task, input: Option<&str>) -> Result<Option<String>> {
    log_start(config, task);
    let output = execute_task(config, task, input)
        .await
        .inspect_err(|e| log_failed(config, e))?;
    log_done(config, task);
    Ok(output)
}

async fn execute_task(config: &Config, task: Task, input: Option<&str>) -> Result<Option<String>> {
    let output = match task {
        Task::Extract => {
            let raw = extract(config).await?;
            Some(raw.to_string())
        }
        Task::Transform => {
            let raw: Value = decode_input(task, input)?;
            let record = transform(config, &raw)?;
            Some(serde_json::to_string(&record).map_err(|e| PipelineError::Input {
                task,
                message: e.to_string(),
            })?)
        }
        Task::Load => {
            let record: WeatherRecord = decode_input(task, input)?;
            load(config, &record)?;
            None
        }
    };
    Ok(output)
}

fn decode_input<T: serde::de::DeserializeOwned>(task: Task, input: Option<&str>) -> Result<T> {
    let input = input.ok_or_else(|| PipelineError::Input {
        task,
        message: format!(
            "expected output of {} on stdin",
            task.upstream().map(|t| t.id()).unwrap_or("upstream task")
        ),
    })?;
    serde_json::from_str(input).map_err(|e| PipelineError::Input {
        task,
        message: e.to_string(),
    })
}

fn log_start(config: &Config, task: Task) {
    log::info!("[{}] {} started", config.dag_id, task);
}

fn log_done(config: &Config, task: Task) {
    log::info!("[{}] {} succeeded", config.dag_id, task);
}

fn log_failed(config: &Config, err: &PipelineError) {
    log::error!("[{}] {}", config.dag_id, err);
}

// ── Schedule description ────────────────────────────────────────────

/// Parse a schedule expression.
///
/// Accepts cron shorthands (`@daily`, `@hourly`, ...) and 6-field
/// expressions as-is. Standard 5-field expressions get "0 " prepended
/// to pin the seconds field to zero.
pub fn parse_schedule(expr: &str) -> std::result::Result<cron::Schedule, ScheduleError> {
    let normalized = normalize_cron_expr(expr);
    cron::Schedule::from_str(&normalized)
        .map_err(|e| ScheduleError::CronParse(format!("{}: {}", expr, e)))
}

/// Next `count` scheduled run times strictly after `after`.
pub fn next_runs(
    expr: &str,
    after: DateTime<Utc>,
    count: usize,
) -> std::result::Result<Vec<DateTime<Utc>>, ScheduleError> {
    let schedule = parse_schedule(expr)?;
    Ok(schedule.after(&after).take(count).collect())
}

fn normalize_cron_expr(expr: &str) -> String {
    let trimmed = expr.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Task entry in a [`DagSpec`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    pub task_id: &'static str,
    pub upstream: Option<&'static str>,
    /// Command line that runs this task alone
    pub command: String,
}

/// Description of the chain for an external scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagSpec {
    pub dag_id: String,
    pub schedule: String,
    pub catchup: bool,
    pub tasks: Vec<TaskSpec>,
    /// Upcoming run times, RFC 3339
    pub next_runs: Vec<String>,
}

impl DagSpec {
    /// Describe the chain configured by `config`, with the next `count`
    /// run times after `now`.
    pub fn describe(
        config: &Config,
        now: DateTime<Utc>,
        count: usize,
    ) -> std::result::Result<Self, ScheduleError> {
        let next_runs = next_runs(&config.schedule, now, count)?
            .into_iter()
            .map(|t| t.to_rfc3339())
            .collect();

        let tasks = Task::CHAIN
            .iter()
            .map(|task| TaskSpec {
                task_id: task.id(),
                upstream: task.upstream().map(|t| t.id()),
                command: format!("weather-etl task {}", task.short_name()),
            })
            .collect();

        Ok(Self {
            dag_id: config.dag_id.clone(),
            schedule: config.schedule.clone(),
            catchup: config.catchup,
            tasks,
            next_runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chain_order_and_dependencies() {
        assert_eq!(Task::CHAIN, [Task::Extract, Task::Transform, Task::Load]);
        assert_eq!(Task::Extract.upstream(), None);
        assert_eq!(Task::Transform.upstream(), Some(Task::Extract));
        assert_eq!(Task::Load.upstream(), Some(Task::Transform));
    }

    #[test]
    fn task_from_str_accepts_both_names() {
        assert_eq!("extract".parse::<Task>().unwrap(), Task::Extract);
        assert_eq!(
            "transform_weather_data".parse::<Task>().unwrap(),
            Task::Transform
        );
        assert_eq!("load".parse::<Task>().unwrap(), Task::Load);
        assert!("publish".parse::<Task>().is_err());
    }

    #[test]
    fn task_display_is_id() {
        assert_eq!(Task::Load.to_string(), "load_weather_data");
    }

    #[test]
    fn daily_shorthand_runs_at_midnight() {
        let after = Utc.with_ymd_and_hms(2026, 10, 19, 13, 45, 0).unwrap();
        let runs = next_runs("@daily", after, 2).unwrap();
        assert_eq!(
            runs,
            vec![
                Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 10, 21, 0, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn five_field_cron_pins_seconds() {
        let after = Utc.with_ymd_and_hms(2026, 10, 19, 5, 0, 0).unwrap();
        let runs = next_runs("30 6 * * *", after, 1).unwrap();
        assert_eq!(runs, vec![Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap()]);
    }

    #[test]
    fn invalid_schedule_is_rejected() {
        match parse_schedule("not a cron expression") {
            Err(ScheduleError::CronParse(msg)) => assert!(msg.contains("not a cron expression")),
            other => panic!("expected CronParse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn normalize_prepends_seconds_for_5_fields() {
        assert_eq!(normalize_cron_expr("*/15 * * * *"), "0 */15 * * * *");
    }

    #[test]
    fn normalize_keeps_shorthand_unchanged() {
        assert_eq!(normalize_cron_expr(" @daily "), "@daily");
    }

    #[test]
    fn describe_default_dag() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let dag_spec = DagSpec::describe(&Config::default(), now, 3).unwrap();

        assert_eq!(dag_spec.dag_id, "weather_etl_pipeline");
        assert_eq!(dag_spec.schedule, "@daily");
        assert!(!dag_spec.catchup);
        assert_eq!(dag_spec.next_runs.len(), 3);
        assert_eq!(dag_spec.next_runs[0], "2026-10-20T00:00:00+00:00");

        let ids: Vec<_> = dag_spec.tasks.iter().map(|t| t.task_id).collect();
        assert_eq!(
            ids,
            vec![
                "extract_weather_data",
                "transform_weather_data",
                "load_weather_data"
            ]
        );
        assert_eq!(dag_spec.tasks[0].upstream, None);
        assert_eq!(dag_spec.tasks[2].upstream, Some("transform_weather_data"));
        assert_eq!(dag_spec.tasks[1].command, "weather-etl task transform");
    }

    #[test]
    fn pipeline_error_names_failed_task() {
        let err = PipelineError::from(crate::transform::TransformError::MissingField(
            "current_weather".to_string(),
        ));
        assert_eq!(err.task(), Task::Transform);
        assert_eq!(
            err.to_string(),
            "transform_weather_data failed: missing field: current_weather"
        );
    }
}
