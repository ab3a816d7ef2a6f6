use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use issuescope_analysis::{RuleBasedSynthesizer, StatTrendAnalyzer};
use issuescope_core::config::AppConfig;
use issuescope_core::report::ReportStatus;
use issuescope_gateway::GatewayServer;
use issuescope_source::source_from_config;
use issuescope_workflow::{Orchestrator, SessionRegistry, StageSet, WorkflowInputs};

#[derive(Parser)]
#[command(name = "issuescope", version, about = "GitHub issue trend analysis workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "issuescope.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a repository and print the final report
    Analyze {
        /// Repository locator: owner/name or a full GitHub URL
        repository: String,
        /// Analysis window in days
        #[arg(long)]
        days: Option<u32>,
        /// Only consider issues that are still open
        #[arg(long)]
        open_only: bool,
        /// Emit the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP/WebSocket gateway server
    Serve,
    /// Show the resolved configuration
    Config,
}

fn build_orchestrator(config: &AppConfig) -> Orchestrator {
    Orchestrator::new(StageSet::standard(
        source_from_config(&config.source),
        Arc::new(StatTrendAnalyzer::new()),
        Arc::new(RuleBasedSynthesizer::new()),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("issuescope=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Analyze {
            repository,
            days,
            open_only,
            json,
        } => {
            let orchestrator = build_orchestrator(&config);
            let inputs = WorkflowInputs {
                repository,
                window_days: days.unwrap_or(config.analysis.window_days),
                include_closed: !open_only && config.analysis.include_closed,
            };

            let mut stream = orchestrator.run(inputs);
            let mut last = None;
            while let Some(snapshot) = stream.next().await {
                info!(
                    step = %snapshot.current_step,
                    percent = snapshot.completion_percentage,
                    "Workflow progress"
                );
                last = Some(snapshot);
            }

            let state = last.expect("workflow yields at least one snapshot");
            let report = state
                .final_report
                .expect("workflow always ends with a report");

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }

            if report.metadata.status == ReportStatus::WorkflowFailed {
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            let gateway_config = config.gateway.clone().unwrap_or_default();
            info!(bind = %gateway_config.bind, "Starting gateway");

            let server = GatewayServer::new(
                gateway_config,
                config.analysis.clone(),
                Arc::new(build_orchestrator(&config)),
                Arc::new(SessionRegistry::new()),
            );

            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_summary(report: &issuescope_core::report::FinalReport) {
    let meta = &report.metadata;
    println!("Repository: {}", meta.repository);
    println!(
        "Status: {:?} (confidence {:.2})",
        meta.status, meta.confidence_score
    );
    println!(
        "Issues analyzed: {} over {} days",
        meta.total_issues_analyzed, meta.analysis_period_days
    );
    println!();
    println!("{}", report.executive_summary.overview);

    if !report.executive_summary.key_findings.is_empty() {
        println!("\nKey findings:");
        for finding in &report.executive_summary.key_findings {
            println!("  - {}", finding);
        }
    }
    if !report.executive_summary.recommendations.is_empty() {
        println!("\nRecommendations:");
        for rec in &report.executive_summary.recommendations {
            println!("  - {}", rec);
        }
    }
    if let Some(ref summary) = report.error_summary {
        println!("\nFailures:");
        for agent in &summary.failed_agents {
            let message = summary
                .error_messages
                .get(agent)
                .map(String::as_str)
                .unwrap_or("unknown error");
            println!("  - {}: {}", agent, message);
        }
    }
    if let Some(ref reflection) = report.reflection {
        println!("\nWorkflow score: {:.3}", reflection.workflow_score);
    }
}
