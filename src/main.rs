use clap::{Parser, Subcommand};
use license_triage::{BatchRunner, Config, FilePipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "license-triage")]
#[command(about = "Classify source files by license and copyright, extract function signatures, or rewrite small copyleft files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory of source files
    Analyze {
        /// Directory containing files to process
        #[arg(short, long, default_value = "data")]
        input: PathBuf,

        /// Directory to save results to
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured worker limit
        #[arg(short = 'w', long)]
        max_workers: Option<usize>,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ~/.license-triage.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            max_workers,
        } => analyze(input, output, config, max_workers).await?,
        Commands::Config { output } => generate_config(output)?,
    }

    Ok(())
}

async fn analyze(
    input: PathBuf,
    output: PathBuf,
    config_path: Option<PathBuf>,
    max_workers: Option<usize>,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let mut config = if let Some(path) = config_path {
        let mut config = Config::from_file(&path)?;
        config.apply_env_overrides();
        config
    } else {
        Config::load()?
    };
    if let Some(workers) = max_workers {
        config.max_workers = workers;
    }

    let gateway = license_triage::build_gateway(&config.llm)?;
    let pipeline = Arc::new(FilePipeline::new(gateway, &config.analysis));
    let runner = BatchRunner::new(pipeline, &config);

    let report = runner.run(&input, &output).await?;

    let duration = start_time.elapsed();
    println!(
        "Processed {} files in {:.2}s ({} failed)",
        report.outcomes.len(),
        duration.as_secs_f64(),
        report.failed_count()
    );
    for outcome in &report.outcomes {
        println!(
            "  {} -> {} artifact(s)",
            outcome.record.file_name,
            outcome.artifacts.len()
        );
    }
    for failure in &report.failures {
        println!("  {} FAILED: {}", failure.file_name, failure.reason);
    }

    if report.failed_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = match output_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    std::fs::write(&config_path, Config::create_documented_config())?;
    println!("Configuration file created at {}", config_path.display());
    println!("Edit it to pick a provider and set credentials (or use OPENAI_API_KEY / ANTHROPIC_API_KEY).");
    Ok(())
}
