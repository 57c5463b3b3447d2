//! Main entry point for the gasless relay.
//!
//! `gasless serve` builds the authorization engine from configuration and,
//! when `[api]` is enabled, accepts signed authorizations over HTTP.
//! `gasless sign` uses the configured account to produce a request body a
//! relayer can submit.

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use gasless_config::Config;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;
mod sign;

/// Command-line arguments for the gasless relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "GASLESS_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Run the relay (default)
	Serve,
	/// Sign an authorization with the configured account and print it as JSON
	Sign {
		/// Comma separated receiver addresses
		#[arg(long, default_value = "")]
		receivers: String,
		/// Amount as a decimal or 0x hex integer
		#[arg(long)]
		amount: String,
		/// Seconds from now until the authorization expires
		#[arg(long, default_value_t = 3600)]
		deadline_in: u64,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => serve(config).await,
		Command::Sign {
			receivers,
			amount,
			deadline_in,
		} => {
			let receivers = sign::parse_receivers(&receivers)?;
			let amount = U256::from_str(&amount)
				.map_err(|e| format!("Invalid amount '{}': {}", amount, e))?;
			let account = factory_registry::build_account_from_config(&config)?;
			let engine = factory_registry::build_engine_from_config(config).await?;

			let request = sign::sign_request(
				&engine,
				&account,
				receivers,
				amount,
				sign::deadline_in(deadline_in),
			)
			.await?;
			println!("{}", serde_json::to_string_pretty(&request)?);
			Ok(())
		}
	}
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	tracing::info!("Started gasless relay");

	let engine = Arc::new(factory_registry::build_engine_from_config(config.clone()).await?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let engine_task = engine.run();
			let api_task = server::start_server(api_config, Arc::clone(&engine));

			tokio::select! {
				result = engine_task => {
					tracing::info!("Engine finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
			}
		}
		None => {
			tracing::info!("API disabled, running engine only");
			engine.run().await?;
		}
	}

	tracing::info!("Stopped gasless relay");
	Ok(())
}
