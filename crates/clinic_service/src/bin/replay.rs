//! Clinic Billing - Replay Binary
//!
//! Seeds an in-memory clinic and runs a command script against it, printing
//! one JSON line per step to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin clinic-replay -- seed.json commands.json
//!
//! # With a different tax rate and JSON logs on stderr
//! CLINIC_TAX_RATE_PERCENT=10 CLINIC_LOG_FORMAT=json cargo run --bin clinic-replay -- seed.json commands.json
//! ```
//!
//! See `clinic_service::config` for the `CLINIC_*` variables.

use std::path::Path;

use anyhow::{bail, Context};
use serde_json::Value;

use clinic_service::{init_tracing, Replay, Seed, ServiceConfig};

/// Loads configuration, seeds the clinic and replays the script.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or an input file cannot
/// be read or parsed. Failing steps are reported on stdout and do not abort
/// the run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("invalid CLINIC_* configuration")?;
    init_tracing(&config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [seed_path, script_path] = args.as_slice() else {
        bail!("usage: clinic-replay <seed.json> <commands.json>");
    };

    let seed: Seed = read_json(seed_path)?;
    let steps: Vec<Value> = read_json(script_path)?;

    tracing::info!(steps = steps.len(), "Starting replay");

    let mut replay = Replay::new(seed, &config).await?;
    let outcomes = replay.run(steps).await;

    let failed = outcomes.iter().filter(|o| !o.ok).count();
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    tracing::info!(total = outcomes.len(), failed, "Replay complete");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))
}
