//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `sqlnative_core` linkage and a full dispatch round trip.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `sqlnative_cli [properties.toml]`. The optional TOML file may
//! define `db.url` (or `url` under `[db]`); an in-memory database is used
//! otherwise. Setting
//! `SQLNATIVE_LOG_DIR` to an absolute path enables file logging.

use sqlnative_core::{
    core_version, default_log_level, init_logging, Argument, ColumnBinding, ConnectionConfig,
    MethodSpec, Properties, Record, Repository, RepositorySpec,
};
use std::process::ExitCode;

#[derive(Default)]
struct Probe {
    sqlite_version: Option<String>,
    echo: Option<String>,
}

impl Record for Probe {
    fn columns() -> Vec<ColumnBinding<Self>> {
        vec![
            ColumnBinding::<Self>::new("sqlite_version", |probe, value| {
                probe.sqlite_version = value
            }),
            ColumnBinding::<Self>::new("echo", |probe, value| probe.echo = value),
        ]
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sqlnative error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_dir) = std::env::var("SQLNATIVE_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let mut properties = match std::env::args().nth(1) {
        Some(path) => Properties::load(path)?,
        None => Properties::new(),
    };
    if properties.get("db.url").is_none() {
        properties.set("db.url", "sqlite::memory:");
    }

    let spec = RepositorySpec::new(
        ConnectionConfig::new("{db.url}"),
        [MethodSpec::new("probe")
            .native_query("SELECT sqlite_version() AS sqlite_version, '{text}' AS echo")
            .param("text")],
    )?;
    let repo = Repository::with_properties(spec, properties);

    println!("sqlnative_core version={}", core_version());
    let probes: Vec<Probe> = repo.select("probe", &[Argument::from("pong")])?;
    for probe in &probes {
        println!(
            "sqlite version={} echo={}",
            probe.sqlite_version.as_deref().unwrap_or("unknown"),
            probe.echo.as_deref().unwrap_or("")
        );
    }
    repo.close()?;
    Ok(())
}
