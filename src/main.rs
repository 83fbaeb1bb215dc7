//! eksdeploy — deployment orchestrator for containerized web apps on AWS EKS.

use clap::Parser;

use eksdeploy::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
