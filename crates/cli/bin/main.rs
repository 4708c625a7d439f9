//! The `objquery` command line tool.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use objquery_cli::{run, Command, Context};
use objquery_configuration::environment::ProcessEnvironment;

/// Translate object queries to SQL, Malloy and Cypher.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// The directory holding the configuration.
    #[arg(long = "context", env = "OBJQUERY_CONTEXT_PATH", default_value = ".")]
    context_path: PathBuf,
    #[command(subcommand)]
    subcommand: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let context = Context {
        context_path: args.context_path,
        environment: ProcessEnvironment,
    };
    run(args.subcommand, context, &mut std::io::stdout().lock()).await
}
