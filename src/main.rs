//! Trains the food classifier and reports test metrics.
//!
//! Usage: `food_gru [CONFIG]`. Without an argument `config/food_gru.toml` is
//! read when present, otherwise built-in defaults are used.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use food_gru::{logging, pipeline, FoodConfig, Result};

const DEFAULT_CONFIG: &str = "config/food_gru.toml";

fn load_config() -> Result<FoodConfig> {
    match env::args().nth(1) {
        Some(path) => FoodConfig::load_from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => FoodConfig::load_from_file(DEFAULT_CONFIG),
        None => Ok(FoodConfig::default()),
    }
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.output.log_dir);
    logging::record("run_started", &config);

    match pipeline::run(&config) {
        Ok(report) => {
            logging::record("run_finished", &report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error ({}): {err}", err.category());
            logging::record(
                "run_failed",
                &serde_json::json!({ "category": err.category(), "message": err.to_string() }),
            );
            ExitCode::FAILURE
        }
    }
}
