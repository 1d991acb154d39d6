use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use gradeflow_rs::gradeflow::builder::Builder;
use gradeflow_rs::gradeflow::config::ConfigLoader;
use gradeflow_rs::gradeflow::server;
use gradeflow_rs::gradeflow::workflow::graph::RunResult;
use gradeflow_rs::gradeflow::workflow::state::ResumeData;

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file (defaults to $GRADEFLOW_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grade one answer; prints the final state or the suspended run id
    Grade {
        #[arg(short, long)]
        question: String,

        #[arg(short, long)]
        answer: String,
    },
    /// Resume a suspended run with reviewer data
    Resume {
        #[arg(short, long)]
        run_id: String,

        /// JSON object, e.g. '{"FacultyScore": 5}'
        #[arg(short, long, default_value = "{}")]
        data: String,
    },
    /// List runs waiting for review
    Pending,
    /// Show the checkpoint of a suspended run
    Show {
        #[arg(short, long)]
        run_id: String,
    },
    /// Discard a suspended run
    Cancel {
        #[arg(short, long)]
        run_id: String,
    },
    /// Serve the HTTP API
    Serve {
        /// Overrides server.port from the config
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn print_result(result: &RunResult) -> anyhow::Result<()> {
    match result {
        RunResult::Completed(state) => {
            println!("Completed:\n{}", serde_json::to_string_pretty(state)?);
        }
        RunResult::Suspended(run_id) => {
            println!("Suspended for review. Run id: {}", run_id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let builder = Builder::new(config.clone());

    match args.command {
        Commands::Grade { question, answer } => {
            let workflow = builder.build().await?;
            let result = workflow.start(&question, &answer).await?;
            print_result(&result)?;
        }
        Commands::Resume { run_id, data } => {
            let value: serde_json::Value =
                serde_json::from_str(&data).context("--data must be valid JSON")?;
            let data = ResumeData::from_value(value)?;
            let workflow = builder.build().await?;
            let result = workflow.resume(&run_id, data).await?;
            print_result(&result)?;
        }
        Commands::Pending => {
            let workflow = builder.build().await?;
            let pending = workflow.pending().await?;
            if pending.is_empty() {
                println!("No runs awaiting review");
            }
            for checkpoint in pending {
                println!(
                    "{}  {}  score={}  anomaly={}",
                    checkpoint.run_id,
                    checkpoint.created_at.to_rfc3339(),
                    checkpoint
                        .state
                        .score
                        .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    checkpoint.state.anomaly_reason.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Show { run_id } => {
            let workflow = builder.build().await?;
            let checkpoint = workflow.inspect(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        }
        Commands::Cancel { run_id } => {
            let workflow = builder.build().await?;
            workflow.cancel(&run_id).await?;
            println!("Cancelled run {}", run_id);
        }
        Commands::Serve { port } => {
            let workflow = Arc::new(builder.build().await?);
            let port = port.unwrap_or(config.server.port);
            server::serve(workflow, port)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
