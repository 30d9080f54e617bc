mod cache;
mod cli;
mod reporter;
mod watch;

use anyhow::Result;
use clap::Parser;
use depwalk_analyzer::{Analyzer, UnusedDependencyOptions};
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

use crate::cli::{AnalysisArgs, Cli, Commands};

fn build_analyzer(args: &AnalysisArgs, max_depth: Option<usize>) -> Result<Analyzer> {
    let mut config = args.to_config()?;
    config.circular_max_depth = max_depth;

    let mut builder = Analyzer::builder(config);
    if let Some(cache) = args.cache_file.as_deref().and_then(cache::load_cache) {
        builder = builder.cache(cache);
    }
    let analyzer = builder.build()?;
    if let Some(path) = &args.cache_file {
        cache::save_cache(&analyzer, path);
    }
    Ok(analyzer)
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Analyze(cmd) => {
            let analyzer = build_analyzer(&cmd.analysis, None)?;
            let structure = analyzer.get_structure();

            if cmd.json {
                serde_json::to_writer_pretty(&mut stdout, &structure)?;
                writeln!(stdout)?;
                stdout.flush()?;
                return Ok(());
            }

            let root = &analyzer.config().cwd;
            reporter::print_summary(&mut stdout, &structure)?;
            let unused = analyzer.use_graph().collect_unused_files();
            reporter::print_unused_files(&mut stdout, &unused, root)?;
            reporter::print_finished(
                &mut stdout,
                start.elapsed().as_millis(),
                structure.files.len(),
            )?;
        }
        Commands::Cycles(cmd) => {
            let analyzer = build_analyzer(&cmd.analysis, cmd.max_depth)?;
            let cycles = analyzer.use_graph().find_circular_dependencies();
            debug!("Found {} cycles", cycles.len());

            let elapsed_ms = start.elapsed().as_millis();
            let files = analyzer.graph().len();
            if cycles.is_empty() {
                info!("No circular imports");
                reporter::print_no_cycles(&mut stdout, cmd.max_depth)?;
                reporter::print_finished(&mut stdout, elapsed_ms, files)?;
            } else {
                reporter::print_cycles(&mut stdout, &cycles, &analyzer.config().cwd)?;
                reporter::print_finished(&mut stdout, elapsed_ms, files)?;
                // Non-zero exit to fail CI
                std::process::exit(1);
            }
        }
        Commands::Unused(cmd) => {
            let mut analysis = cmd.analysis.clone();
            analysis.third_party = true;
            let analyzer = build_analyzer(&analysis, None)?;
            let options = UnusedDependencyOptions { include_dev_dependencies: cmd.dev };
            let unused = analyzer.find_unused_dependencies(options)?;

            reporter::print_unused_dependencies(&mut stdout, &unused)?;
            let elapsed_ms = start.elapsed().as_millis();
            reporter::print_finished(&mut stdout, elapsed_ms, analyzer.graph().len())?;
            if !unused.third_party.is_empty() {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }
        }
        Commands::Watch(cmd) => {
            let analyzer = build_analyzer(&cmd.analysis, None)?;
            reporter::print_summary(&mut stdout, &analyzer.get_structure())?;
            let elapsed_ms = start.elapsed().as_millis();
            reporter::print_finished(&mut stdout, elapsed_ms, analyzer.graph().len())?;
            let debounce = Duration::from_millis(cmd.debounce_ms);
            watch::watch(analyzer, debounce, cmd.analysis.cache_file.clone())?;
        }
    }

    Ok(())
}
