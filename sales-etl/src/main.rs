use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sales_core::Filter;
use sales_etl::config::EtlConfig;
use sales_etl::observability::logging::init_logging;
use sales_etl::pipeline::orchestrator::EtlPipeline;

#[derive(Parser)]
#[command(name = "sales-etl")]
#[command(about = "Batch ETL for the sales dataset: CSV in, partitioned parquet out")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: load, clean, join, write
    Run {
        /// Path to the pipeline configuration file
        #[arg(long, default_value = "etl.toml")]
        config: PathBuf,
        /// Fail on unparseable purchase timestamps instead of dropping rows
        #[arg(long)]
        strict_timestamps: bool,
    },
    /// Read the written dataset back, optionally filtered
    Read {
        /// Path to the pipeline configuration file
        #[arg(long, default_value = "etl.toml")]
        config: PathBuf,
        /// Predicate like `price>=40` or `product_category_name==bebes`; repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Print at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging; the guard flushes the log file on exit
    let _guard = init_logging();

    match cli.command {
        Commands::Run {
            config,
            strict_timestamps,
        } => {
            let mut config = EtlConfig::load(&config)?;
            if strict_timestamps {
                config.transform.strict_timestamps = true;
            }
            let pipeline = EtlPipeline::new(config);
            let report = pipeline.run().await?;

            println!("📊 Run {} summary:", report.run_id);
            for step in &report.steps {
                println!("   {}: {} rows in {}ms", step.step, step.rows, step.duration_ms);
            }
            println!(
                "✅ Wrote {} rows across {} partitions to {}",
                report.rows_written, report.partitions_written, report.output_path
            );
        }
        Commands::Read {
            config,
            filters,
            limit,
        } => {
            let config = EtlConfig::load(&config)?;
            let filters = filters
                .iter()
                .map(|spec| Filter::parse(spec))
                .collect::<sales_core::Result<Vec<_>>>()?;
            let pipeline = EtlPipeline::new(config);
            let table = pipeline.read(&filters)?;

            println!("{}", table.columns().join(" | "));
            for row in table.rows().iter().take(limit.unwrap_or(usize::MAX)) {
                let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
                println!("{}", cells.join(" | "));
            }
            println!("({} rows)", table.len());
        }
    }

    Ok(())
}
