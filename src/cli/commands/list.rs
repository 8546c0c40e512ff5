//! scriptpack list - Show descriptors and archive state

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, format_size, robot_ok};
use crate::error::Result;
use crate::packager::descriptor::{self, ArtifactLayout};
use crate::packager::flatten;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory holding compiled scripts and descriptors
    #[arg(long)]
    pub target_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ScriptEntry {
    pub name: String,
    pub main: String,
    pub is_static: bool,
    pub requires: Vec<String>,
    pub zip_file: Option<PathBuf>,
    pub archived: bool,
    pub archive_size: Option<u64>,
}

pub async fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let target_dir = args.target_dir.as_ref().map_or_else(
        || ctx.project_root.join(&ctx.config.package.target_dir),
        |dir| ctx.project_root.join(dir),
    );
    let entries = collect(&target_dir).await?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(serde_json::json!({
            "count": entries.len(),
            "scripts": entries,
        })))
    } else {
        list_human(&entries);
        Ok(())
    }
}

/// Load and flatten every descriptor under `target_dir`.
pub async fn collect(target_dir: &std::path::Path) -> Result<Vec<ScriptEntry>> {
    let layout = ArtifactLayout::new(target_dir);
    let loaded = descriptor::load_all(target_dir).await?;
    let entries = flatten(&loaded)
        .into_iter()
        .map(|script| {
            let zip_file = script
                .zip_file
                .clone()
                .or_else(|| layout.apply(script.clone()).zip_file);
            let archived = zip_file.as_ref().is_some_and(|p| p.exists());
            ScriptEntry {
                name: script.name,
                main: script.main,
                is_static: script.is_static,
                requires: script.requires,
                zip_file,
                archived,
                archive_size: script.archive_size,
            }
        })
        .collect();
    Ok(entries)
}

fn list_human(entries: &[ScriptEntry]) {
    if entries.is_empty() {
        println!("{}", "No descriptors found".dimmed());
        println!();
        println!("Build scripts first, or run: scriptpack package");
        return;
    }

    println!(
        "{:24} {:8} {:10} {}",
        "NAME".bold(),
        "ARCHIVE".bold(),
        "SIZE".bold(),
        "REQUIRES".bold()
    );
    println!("{}", "─".repeat(72).dimmed());

    for entry in entries {
        let archived = if entry.archived {
            "yes".green()
        } else {
            "no".yellow()
        };
        let size = entry
            .archive_size
            .filter(|_| entry.archived)
            .map_or_else(|| "-".to_string(), format_size);
        let requires = if entry.requires.is_empty() {
            "-".dimmed().to_string()
        } else {
            entry.requires.join(", ")
        };
        println!("{:24} {:8} {:10} {}", entry.name, archived, size, requires);
    }

    println!();
    println!("{} {} scripts", "Total:".dimmed(), entries.len());
}
