//! Per-invocation context shared by every command

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;

pub struct AppContext {
    pub config: Config,
    /// Directory relative config paths resolve against.
    pub project_root: PathBuf,
    pub robot_mode: bool,
    pub quiet: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        Ok(Self {
            config,
            project_root,
            robot_mode: cli.robot,
            quiet: cli.quiet,
        })
    }
}
