//! Weather ETL CLI
//!
//! Usage:
//!   weather-etl run [-c config]                  # Run extract → transform → load once
//!   weather-etl task extract                     # Print the raw API body on stdout
//!   weather-etl task transform < raw.json        # Print the flat record on stdout
//!   weather-etl task load < record.json          # Append the record to weather_data
//!   weather-etl dag [-n 3] [-f json|yaml]        # Describe the chain for a scheduler
//!   weather-etl history [-l 10]                  # Show the most recent rows

use argh::FromArgs;
use std::io::{Read, Write};
use std::path::PathBuf;

use weather_etl::config::Config;
use weather_etl::dag::{self, DagSpec, Task};
use weather_etl::load;

/// Weather ETL - Open-Meteo current weather into SQLite
#[derive(FromArgs)]
struct Args {
    /// show version information
    #[argh(switch, short = 'V')]
    version: bool,

    /// path to the configuration file (default: $WEATHER_ETL_CONFIG or ~/.weather-etl/config.yaml)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunArgs),
    Task(TaskArgs),
    Dag(DagArgs),
    History(HistoryArgs),
}

/// Run the whole chain once
#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
struct RunArgs {}

/// Run a single task (extract, transform or load), exchanging JSON on stdin/stdout
#[derive(FromArgs)]
#[argh(subcommand, name = "task")]
struct TaskArgs {
    /// task to run: extract, transform, load
    #[argh(positional)]
    task: Task,
}

/// Describe the task chain and its upcoming runs
#[derive(FromArgs)]
#[argh(subcommand, name = "dag")]
struct DagArgs {
    /// number of upcoming runs to list (default: 3)
    #[argh(option, short = 'n', default = "3")]
    count: usize,

    /// output format: json, yaml (default: json)
    #[argh(option, short = 'f', default = "String::from(\"json\")")]
    format: String,
}

/// Show the most recent rows in weather_data
#[derive(FromArgs)]
#[argh(subcommand, name = "history")]
struct HistoryArgs {
    /// maximum number of rows (default: 10)
    #[argh(option, short = 'l', default = "10")]
    limit: usize,
}

fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries task output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Args = argh::from_env();

    if args.version {
        println!("weather-etl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(command) = args.command else {
        eprintln!("Weather ETL - Open-Meteo current weather into SQLite\n");
        eprintln!("Usage: weather-etl [-c config] <command>\n");
        eprintln!("Commands:");
        eprintln!("  run       Run extract → transform → load once");
        eprintln!("  task      Run one task: extract, transform, load");
        eprintln!("              transform/load read the upstream output on stdin");
        eprintln!("  dag       Describe the task chain for a scheduler:");
        eprintln!("              -n, --count <n>: upcoming runs (default: 3)");
        eprintln!("              -f, --format <fmt>: json|yaml (default: json)");
        eprintln!("  history   Show recent rows:");
        eprintln!("              -l, --limit <n>: rows (default: 10)");
        eprintln!("\nRun 'weather-etl <command> --help' for more information.");
        return Ok(());
    };

    let config = Config::load(args.config.as_deref())?;

    match command {
        Command::Run(_) => {
            dag::run(&config).await?;
        }
        Command::Task(task_args) => {
            let input = match task_args.task {
                Task::Extract => None,
                Task::Transform | Task::Load => Some(read_stdin()?),
            };
            if let Some(output) = dag::run_task(&config, task_args.task, input.as_deref()).await? {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", output)?;
            }
        }
        Command::Dag(dag_args) => {
            let dag_spec = DagSpec::describe(&config, chrono::Utc::now(), dag_args.count)?;
            match dag_args.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&dag_spec)?),
                "yaml" => print!("{}", serde_yaml::to_string(&dag_spec)?),
                other => anyhow::bail!("unknown format '{}' (expected json or yaml)", other),
            }
        }
        Command::History(history_args) => {
            let rows = load::recent(&config.database.path, history_args.limit)?;
            if rows.is_empty() {
                println!("No rows in {}", config.database.path.display());
                return Ok(());
            }
            println!(
                "{:<19}  {:>9}  {:>9}  {:>7}  {:>7}  {:>7}  {:>4}",
                "TIMESTAMP", "LAT", "LON", "TEMP", "WIND", "DIR", "CODE"
            );
            for row in rows {
                let r = row.record;
                println!(
                    "{:<19}  {:>9.4}  {:>9.4}  {:>7.1}  {:>7.1}  {:>7.0}  {:>4}",
                    row.timestamp,
                    r.latitude,
                    r.longitude,
                    r.temperature,
                    r.windspeed,
                    r.winddirection,
                    r.weathercode
                );
            }
        }
    }

    Ok(())
}
