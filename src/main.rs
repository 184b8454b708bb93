//! Ideaflow CLI entry point.

use clap::Parser;

use ideaflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => ideaflow::cli::commands::init::execute(args, cli.json).await,
        Commands::Serve(args) => ideaflow::cli::commands::serve::execute(args, cli.json).await,
        Commands::Seed(args) => ideaflow::cli::commands::seed::execute(args, cli.json).await,
        Commands::Experiment(args) => {
            ideaflow::cli::commands::experiment::execute(args, cli.json).await
        }
        Commands::Catalog(args) => ideaflow::cli::commands::catalog::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        ideaflow::cli::handle_error(err, cli.json);
    }
}
