//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod list;
pub mod package;

/// Dispatch a command to its handler
pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Package(args) => package::run(ctx, args).await,
        Commands::List(args) => list::run(ctx, args).await,
    }
}
