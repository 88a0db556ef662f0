use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "registry-janitor", version, about = "Plans and applies garbage collection of unused container images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactively build a config file.
    Configure(ConfigureArgs),
    /// Crawl the registry, run the filter pipeline, and print/save a plan.
    Plan(PlanArgs),
    /// Crawl (or load a saved plan) and delete every image with no keep-reason.
    Apply(ApplyArgs),
    /// Render a previously saved plan file without touching the registry.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    #[arg(long, default_value = "registry-janitor.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, env = "REGISTRY_JANITOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "REGISTRY_JANITOR_REGISTRY")]
    pub registry: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_PASSWORD")]
    pub password: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_YOUNGER_THAN")]
    pub keep_younger_than: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_AT_LEAST")]
    pub keep_at_least: Option<usize>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_USED_IN_K8S")]
    pub keep_used_in_k8s: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_IMAGE_TAGS")]
    pub keep_image_tags: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_IMAGE_DIGESTS")]
    pub keep_image_digests: Option<String>,

    #[arg(long, env = "REGISTRY_JANITOR_KEEP_IMAGE_REPOS")]
    pub keep_image_repos: Option<String>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Where to write the compressed plan file; if omitted, only the report is printed.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Render the per-image analytical table instead of the aggregate summary.
    #[arg(long)]
    pub analytical: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// A previously saved plan file; if omitted, a fresh crawl is performed.
    pub plan_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(long = "plan")]
    pub plan: PathBuf,

    #[arg(long)]
    pub analytical: bool,
}
