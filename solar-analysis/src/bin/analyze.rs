// Command-line front end for the rooftop solar pipeline
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rooftop_imagery::Coordinate;
use solar_analysis::{
    read_batch_file, render_text, run_batch, AnalysisConfig, AnalysisRequest, EstimatorMode,
    SolarPipeline,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solar-analyze")]
#[command(about = "Estimate rooftop solar potential from aerial imagery", long_about = None)]
struct Cli {
    /// Override VISION_MODE
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    /// Override SOLAR_IMAGE_DIR
    #[arg(long, global = true)]
    image_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Live,
    Mock,
}

impl From<ModeArg> for EstimatorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => EstimatorMode::Auto,
            ModeArg::Live => EstimatorMode::Live,
            ModeArg::Mock => EstimatorMode::Mock,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single location
    Run {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Electricity rate in $/kWh (defaults to SOLAR_ELECTRICITY_RATE)
        #[arg(long)]
        rate: Option<f64>,

        /// Use SOLAR_FALLBACK_COORDINATE imagery if none exists for this location
        #[arg(long)]
        allow_fallback: bool,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Analyze every row of a CSV file (latitude,longitude[,electricity_rate])
    Batch {
        csv: PathBuf,

        #[arg(long)]
        rate: Option<f64>,

        #[arg(long)]
        allow_fallback: bool,

        /// Write the JSON summary here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List coordinates with cached imagery
    Cached,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AnalysisConfig::from_env().context("Failed to load configuration")?;
    if let Some(mode) = cli.mode {
        config.vision_mode = mode.into();
    }
    if let Some(dir) = cli.image_dir {
        config.image_dir = dir;
    }

    let pipeline = SolarPipeline::from_config(&config)?;

    match cli.command {
        Commands::Run {
            lat,
            lon,
            rate,
            allow_fallback,
            json,
        } => {
            let rate = rate.unwrap_or(config.default_electricity_rate);
            let request = AnalysisRequest::new(lat, lon, rate).with_fallback(allow_fallback);
            let report = pipeline.run(request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_text(&report));
            }
        }

        Commands::Batch {
            csv,
            rate,
            allow_fallback,
            output,
        } => {
            let rows = read_batch_file(&csv)
                .with_context(|| format!("Failed to read batch file {}", csv.display()))?;
            println!("📁 Loaded {} locations from {}", rows.len(), csv.display());

            let rate = rate.unwrap_or(config.default_electricity_rate);
            let summary = run_batch(&pipeline, &rows, rate, allow_fallback).await;

            println!("\n📊 Batch Results");
            println!("================");
            for outcome in &summary.outcomes {
                match (&outcome.error, outcome.potential_kw) {
                    (None, Some(kw)) => println!(
                        "✅ ({:.4}, {:.4}): {:.2} kW, {} panels{}",
                        outcome.latitude,
                        outcome.longitude,
                        kw,
                        outcome.panel_count.unwrap_or(0),
                        if outcome.substituted { " (fallback imagery)" } else { "" }
                    ),
                    (error, _) => println!(
                        "❌ ({:.4}, {:.4}): {}",
                        outcome.latitude,
                        outcome.longitude,
                        error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            println!(
                "\n{} succeeded, {} failed ({:.1}%), {:.2} kW total",
                summary.succeeded,
                summary.failed,
                summary.success_rate(),
                summary.total_potential_kw
            );

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&summary)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("💾 Summary saved to {}", path.display());
            }
        }

        Commands::Cached => {
            let store = pipeline.provider().store();
            let coordinates: Vec<Coordinate> = store.list()?;

            println!("📁 {} cached images in {}", coordinates.len(), store.root().display());
            for coordinate in coordinates {
                println!("  {}", coordinate);
            }
        }
    }

    Ok(())
}
