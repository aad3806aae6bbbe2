//! fluxbuilder CLI
//!
//! Command-line interface for fluxbuilder operations:
//! - Translate Flux text to a part model and back
//! - Build a query from flags
//! - Check server status
//! - Generate a config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fluxbuilder::flux::parts::{
    append_part, bucket_part, date_range_part, field_filter_part, measurement_filter_part,
};
use fluxbuilder::flux::{parse, to_text, Bucket, DateRange, QueryModel};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fluxbuilder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and translate Flux queries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:3001", global = true)]
    pub api_url: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse Flux text into a part model (reads stdin without a file)
    Translate {
        /// File containing Flux text
        path: Option<PathBuf>,
    },

    /// Render a part model (JSON) as Flux text (reads stdin without a file)
    Render {
        /// File containing the model JSON
        path: Option<PathBuf>,
    },

    /// Build a query from selections
    Build {
        /// Bucket name
        #[arg(short, long)]
        bucket: String,
        /// Range start (e.g., -1h, -7d, RFC 3339)
        #[arg(short, long, default_value = "-1h")]
        start: String,
        /// Range stop
        #[arg(long)]
        stop: Option<String>,
        /// Measurement name
        #[arg(short, long)]
        measurement: Option<String>,
        /// Field names (repeat for several)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Translate { path } => {
            let text = read_input(path.as_ref())?;
            let model = parse(&text);

            if model.is_raw() && cli.format != "json" {
                eprintln!("Query uses stages outside the builder subset; kept as raw text");
            }
            println!("{}", serde_json::to_string_pretty(&model)?);
        }

        Commands::Render { path } => {
            let input = read_input(path.as_ref())?;
            let model: QueryModel =
                serde_json::from_str(&input).context("input is not a valid query model")?;
            println!("{}", to_text(&model));
        }

        Commands::Build {
            bucket,
            start,
            stop,
            measurement,
            fields,
        } => {
            if measurement.is_none() && !fields.is_empty() {
                bail!("--field requires --measurement");
            }

            let model = build_model(&bucket, &start, stop, measurement, fields);

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&model)?),
                _ => println!("{}", to_text(&model)),
            }
        }

        Commands::Status => {
            let client = reqwest::Client::new();
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!("fluxbuilder v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Sessions: {}", health["sessions"].as_u64().unwrap_or(0));
                    println!(
                        "Grafana: {}",
                        if health["grafana"].as_bool().unwrap_or(false) {
                            "enabled"
                        } else {
                            "disabled"
                        }
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    bail!("API returned error: {}", resp.status());
                }
                Err(e) => {
                    eprintln!("Cannot connect to fluxbuilder API at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the API server is running:");
                    eprintln!("  cargo run --bin fluxbuilder");
                    return Err(e.into());
                }
            }
        }

        Commands::Config { output } => {
            let config = fluxbuilder::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))
        }
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn build_model(
    bucket: &str,
    start: &str,
    stop: Option<String>,
    measurement: Option<String>,
    fields: Vec<String>,
) -> QueryModel {
    let mut model = append_part(&QueryModel::new(), bucket_part(Bucket::named(bucket)));
    model = append_part(
        &model,
        date_range_part(DateRange {
            start: start.to_string(),
            stop,
        }),
    );

    if let Some(measurement) = measurement {
        model = append_part(&model, measurement_filter_part(measurement));
    }

    match fields.len() {
        0 => {}
        1 => model = append_part(&model, field_filter_part(fields[0].as_str())),
        _ => model = append_part(&model, field_filter_part(fields)),
    }

    model
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
