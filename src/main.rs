use clap::{Parser, Subcommand};
use fraud_etl::app::ports::ObjectStorePort;
use fraud_etl::config::PipelineConfig;
use fraud_etl::infra::http_client::ReqwestHttp;
use fraud_etl::infra::object_store::{FsObjectStore, HttpObjectStore};
use fraud_etl::infra::warehouse::PgWarehouse;
use fraud_etl::pipeline::{run_pipeline, tasks, Slots, StageOutcome};
use fraud_etl::types::Sample;
use fraud_etl::{error::EtlError, logging};
use std::path::Path;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "fraud_etl")]
#[command(about = "Staged ETL pipeline for the credit card fraud dataset")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the source snapshot to the raw artifact path
    Extract,
    /// Upload the raw artifact to the staging slot
    Stage,
    /// Clean the staged artifact and write the transformed artifact
    Transform,
    /// Upload the transformed artifact to the transformed slot
    Publish,
    /// Load the transformed slot into the destination table
    Load,
    /// Run all five stages in order
    Run {
        /// Continue past a failed fetch/upload stage. Downstream stages
        /// then consume whatever the slots hold, possibly stale data.
        #[arg(long)]
        keep_going: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn object_store(config: &PipelineConfig) -> Arc<dyn ObjectStorePort> {
    match &config.store.endpoint {
        Some(endpoint) => {
            let api_key = std::env::var("FRAUD_ETL_STORE_KEY").unwrap_or_default();
            Arc::new(HttpObjectStore::new(endpoint.clone(), api_key))
        }
        None => Arc::new(FsObjectStore::new(
            Path::new(&config.data_dir).join("object_store"),
        )),
    }
}

/// A transient-I/O stage reports its outcome instead of raising; a failed
/// outcome still exits nonzero so the external orchestrator can retry.
fn report_outcome(name: &str, outcome: StageOutcome) -> anyhow::Result<()> {
    match outcome {
        StageOutcome::Completed { bytes, checksum } => {
            println!("✅ {} completed ({} bytes, sha256 {})", name, bytes, checksum);
            Ok(())
        }
        StageOutcome::Failed { error } => {
            println!("❌ {} failed: {}", name, error);
            Err(anyhow::anyhow!("{} stage failed: {}", name, error))
        }
    }
}

fn print_sample(sample: &Sample) {
    println!("   {}", sample.columns.join(", "));
    for row in &sample.rows {
        println!("   {}", row.join(", "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)?;
    let store = object_store(&config);
    let slots = Slots::from_config(&config.store);

    match cli.command {
        Commands::Extract => {
            println!("📥 Fetching source snapshot...");
            let outcome = tasks::extract(&ReqwestHttp, &config.source_url, &config.raw_path()).await;
            report_outcome("extract", outcome)?;
        }
        Commands::Stage => {
            println!("📤 Uploading raw artifact to staging slot...");
            let outcome = tasks::stage(store.as_ref(), &config.raw_path(), &slots).await;
            report_outcome("stage", outcome)?;
        }
        Commands::Transform => {
            println!("🔨 Transforming staged artifact...");
            let summary =
                tasks::transform(store.as_ref(), &slots, &config.transformed_path()).await?;
            println!("✅ transform completed");
            println!("   Rows: {}", summary.rows);
            println!("   Columns: {}", summary.columns);
            println!("   Duplicate rows: {}", summary.duplicate_rows);
            for (column, nulls) in &summary.null_counts {
                if *nulls > 0 {
                    println!("   Nulls in {}: {}", column, nulls);
                }
            }
        }
        Commands::Publish => {
            println!("📤 Uploading transformed artifact to transformed slot...");
            let outcome = tasks::publish(store.as_ref(), &config.transformed_path(), &slots).await;
            report_outcome("publish", outcome)?;
        }
        Commands::Load => {
            println!("🗄️  Loading transformed slot into the warehouse...");
            let warehouse = PgWarehouse::new(config.database.clone());
            let summary = tasks::load(store.as_ref(), &warehouse, &slots).await?;
            println!("✅ load completed ({} rows)", summary.rows_loaded);
            print_sample(&summary.sample);
        }
        Commands::Run { keep_going, json } => {
            println!("🚀 Running full pipeline...");
            let warehouse = PgWarehouse::new(config.database.clone());
            let report = run_pipeline(
                &ReqwestHttp,
                store.as_ref(),
                &warehouse,
                &config,
                keep_going,
            )
            .await
            .map_err(|e: EtlError| {
                error!("Pipeline run failed: {}", e);
                e
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n📊 Pipeline run {}", report.run_id);
                if let Some(stage) = &report.aborted_at {
                    println!("   ❌ Aborted at stage: {}", stage);
                }
                if let Some(summary) = &report.transform {
                    println!("   Rows transformed: {}", summary.rows);
                    println!("   Duplicate rows: {}", summary.duplicate_rows);
                }
                if let Some(load) = &report.load {
                    println!("   Rows loaded: {}", load.rows_loaded);
                    print_sample(&load.sample);
                }
            }
            if report.aborted_at.is_some() {
                anyhow::bail!("pipeline run aborted");
            }
        }
    }
    Ok(())
}
