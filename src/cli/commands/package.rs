//! scriptpack package - Build, bundle and archive scripts

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, format_size, robot_ok};
use crate::cli::progress::TerminalProgress;
use crate::error::Result;
use crate::packager::{
    BuildStep, CommandBuildStep, CommandBundler, PackageEvent, PackageOptions, Packager,
    RunSummary, Severity, SkipBuild,
};

#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Source selection passed to the build step (default: config `sources`)
    pub sources: Vec<String>,

    /// Directory holding compiled scripts and descriptors
    #[arg(long)]
    pub target_dir: Option<PathBuf>,

    /// Skip scripts whose archive already exists
    #[arg(long)]
    pub only_changed: bool,

    /// Minify bundles
    #[arg(long)]
    pub minify: bool,

    /// Do not run the build step
    #[arg(long)]
    pub skip_build: bool,
}

pub async fn run(ctx: &AppContext, args: &PackageArgs) -> Result<()> {
    let options = resolve_options(ctx, args);
    let build: Arc<dyn BuildStep> = match &ctx.config.build.program {
        Some(program) if !args.skip_build => Arc::new(CommandBuildStep::new(
            program.clone(),
            ctx.config.build.args.clone(),
        )),
        _ => Arc::new(SkipBuild),
    };
    let bundler = Arc::new(CommandBundler::new(
        ctx.config.bundler.program.clone(),
        ctx.config.bundler.args.clone(),
    ));

    let mut packager = Packager::new(options, build, bundler)
        .with_progress(Arc::new(TerminalProgress::new(ctx.robot_mode, ctx.quiet)));
    if ctx.robot_mode {
        packager.on_event(emit_event);
    }

    let summary = packager.run().await?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(&summary))
    } else {
        if !ctx.quiet {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn resolve_options(ctx: &AppContext, args: &PackageArgs) -> PackageOptions {
    let mut options = ctx.config.package_options(&ctx.project_root);
    if let Some(dir) = &args.target_dir {
        options.target_dir = ctx.project_root.join(dir);
    }
    if !args.sources.is_empty() {
        options.sources.clone_from(&args.sources);
    }
    options.only_changed |= args.only_changed;
    options.minify |= args.minify;
    options
}

/// Robot mode: one JSON line per notification on stderr.
fn emit_event(event: &PackageEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        eprintln!("{json}");
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.is_noop() && summary.ignored.is_empty() {
        println!("{}", "No scripts to package".dimmed());
        return;
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Packaged {} script(s)", summary.packaged.len()));
    for script in &summary.packaged {
        let size = script.archive_size.map_or_else(|| "-".to_string(), format_size);
        let zip = script
            .zip_file
            .as_ref()
            .map_or_else(String::new, |p| p.display().to_string());
        layout.kv(&script.name, &format!("{zip} ({size})"));
    }

    if !summary.ignored.is_empty() {
        layout.blank().section("Up to date");
        for name in &summary.ignored {
            layout.bullet(name);
        }
    }

    if !summary.diagnostics.is_empty() {
        layout.blank().section("Bundler diagnostics");
        for diagnostic in &summary.diagnostics {
            let line = match diagnostic.severity {
                Severity::Error => diagnostic.message.red().to_string(),
                Severity::Warning => diagnostic.message.yellow().to_string(),
            };
            layout.bullet(&line);
        }
    }

    emit_human(layout);
}
