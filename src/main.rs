#[macro_use]
extern crate tracing;

use anyhow::{anyhow, Result};
use clap::Parser;
use registry_janitor::cli::{Cli, Command};
use registry_janitor::config::{self, ConfigFile};
use registry_janitor::inventory::Inventory;
use registry_janitor::k8s::{self, ClusterIdentity, UsageMap};
use registry_janitor::progress::IndicatifProgress;
use registry_janitor::registry::InteractWithRegistry;
use registry_janitor::{filters, orchestrator, plan, reporter};
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Configure(args) => run_configure(&args),
        Command::Plan(args) => run_plan(args).await,
        Command::Apply(args) => run_apply(args).await,
        Command::Show(args) => run_show(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn prompt(label: &str) -> String {
    print!("{label}: ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).ok();
    line.trim().to_string()
}

fn run_configure(args: &registry_janitor::cli::ConfigureArgs) -> Result<()> {
    println!("registry-janitor configuration wizard");
    let registry_kind = prompt("registry type (gcr/dockerhub)");

    let file: ConfigFile = match registry_kind.as_str() {
        "gcr" => {
            let host = prompt("GCR host");
            let token = prompt("GCR token");
            serde_json::from_value(serde_json::json!({
                "GCR": { "host": host, "token": token },
            }))?
        }
        "dockerhub" => {
            let username = prompt("Docker Hub username");
            let password = prompt("Docker Hub password");
            let namespace = prompt("Docker Hub namespace");
            serde_json::from_value(serde_json::json!({
                "Dockerhub": { "username": username, "password": password, "namespace": namespace },
            }))?
        }
        other => return Err(anyhow!("unknown registry type `{other}`, expected gcr or dockerhub")),
    };

    file.save(&args.out)?;
    println!("wrote configuration to {}", args.out.display());
    Ok(())
}

async fn build_inventory(
    common: &registry_janitor::cli::CommonArgs,
) -> Result<(Inventory, registry_janitor::config::KeepPolicy)> {
    let mut resolved = config::resolve(common)?;
    resolved.registry.login().await?;

    let registry = Arc::new(resolved.registry);
    info!("crawling registry");
    let mut inventory = orchestrator::crawl(registry).await?;

    let clusters: Vec<ClusterIdentity> = resolved
        .policy
        .clusters
        .iter()
        .map(|context| ClusterIdentity {
            context: context.clone(),
            namespace: "default".to_string(),
            running_inside: false,
        })
        .collect();

    let usage: UsageMap = if clusters.is_empty() {
        UsageMap::new()
    } else {
        info!("probing {} cluster(s) for live image usage", clusters.len());
        k8s::probe_used_images(&clusters).await?
    };

    filters::apply_pipeline(&mut inventory, &resolved.policy, &usage);

    Ok((inventory, resolved.policy))
}

async fn run_plan(args: registry_janitor::cli::PlanArgs) -> Result<()> {
    let (inventory, _policy) = build_inventory(&args.common).await?;

    if args.analytical {
        println!("{}", reporter::render_analytical(&inventory));
    } else {
        println!("{}", reporter::render_aggregate(&inventory));
    }

    if let Some(out) = &args.out {
        plan::write_to_file(out, &inventory)?;
        info!("wrote plan to {}", out.display());
    }

    Ok(())
}

async fn run_apply(args: registry_janitor::cli::ApplyArgs) -> Result<()> {
    let mut resolved = config::resolve(&args.common)?;
    resolved.registry.login().await?;
    let registry = Arc::new(resolved.registry);

    let inventory = match &args.plan_file {
        Some(path) => plan::read_from_file(path)?,
        None => {
            info!("crawling registry");
            let mut inventory = orchestrator::crawl(registry.clone()).await?;

            let clusters: Vec<ClusterIdentity> = resolved
                .policy
                .clusters
                .iter()
                .map(|context| ClusterIdentity {
                    context: context.clone(),
                    namespace: "default".to_string(),
                    running_inside: false,
                })
                .collect();
            let usage = if clusters.is_empty() {
                UsageMap::new()
            } else {
                k8s::probe_used_images(&clusters).await?
            };
            filters::apply_pipeline(&mut inventory, &resolved.policy, &usage);
            inventory
        }
    };

    let progress: Arc<dyn registry_janitor::progress::ProgressObserver> = Arc::new(IndicatifProgress::new());
    let tally = orchestrator::delete_unkept_images(registry, &inventory, progress).await;

    println!(
        "deleted {}/{} images that were due for deletion",
        tally.managed_to_delete, tally.should_delete
    );
    Ok(())
}

fn run_show(args: &registry_janitor::cli::ShowArgs) -> Result<()> {
    let inventory = plan::read_from_file(&args.plan)?;
    if args.analytical {
        println!("{}", reporter::render_analytical(&inventory));
    } else {
        println!("{}", reporter::render_aggregate(&inventory));
    }
    Ok(())
}
