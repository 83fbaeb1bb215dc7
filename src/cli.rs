//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Deploy containerized web apps to AWS EKS
#[derive(Parser)]
#[command(
    name = "eksdeploy",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip interactive prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision cluster infrastructure without deploying
    Provision(TargetArgs),

    /// Provision, build, push, and roll out the app end to end
    Deploy(DeployArgs),

    /// Drain the workload and destroy all infrastructure
    Destroy(TargetArgs),

    /// Show version
    Version,
}

/// Arguments identifying one app/environment deployment target.
#[derive(Args)]
pub struct TargetArgs {
    /// Application name (lowercase DNS label)
    #[arg(long, default_value = "demo", env = "EKSDEPLOY_APP")]
    pub app: String,

    /// Target environment name
    #[arg(long = "env", default_value = "dev", env = "EKSDEPLOY_ENV")]
    pub environment: String,

    /// AWS region
    #[arg(long, default_value = "us-east-2", env = "AWS_REGION")]
    pub region: String,

    /// Desired replica count
    #[arg(long, default_value_t = 2)]
    pub replicas: u32,

    /// Terraform module directory
    #[arg(long = "infra-dir", default_value = "infra")]
    pub infra_dir: String,

    /// Confirm plans that modify network topology (VPC, subnets, routing)
    #[arg(long)]
    pub allow_network_change: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Container build context directory
    #[arg(long, default_value = ".")]
    pub context: String,

    /// Image tag (defaults to a UTC timestamp)
    #[arg(long)]
    pub tag: Option<String>,
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only for setup failures (home directory missing,
    /// broken terminal prompt); run outcomes are expressed as exit codes.
    pub async fn run(self) -> Result<i32> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            json,
            quiet,
            no_color,
            yes,
        });
        match command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Destroy(args) => commands::destroy::run(&app, &args).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
