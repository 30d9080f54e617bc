use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use depwalk_core::{AnalysisConfig, DependencyTracking};
use log::{debug, trace};
use std::{env, path::PathBuf};

#[derive(Parser)]
#[command(name = "depwalk")]
#[command(
    about = "Dependency graph analysis for JavaScript/TypeScript projects",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the dependency graph and print a summary
    Analyze(AnalyzeArgs),
    /// Report circular imports
    Cycles(CyclesArgs),
    /// Report declared dependencies nothing imports
    Unused(UnusedArgs),
    /// Keep the graph current while files change
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    /// Root directory of the project (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// File to start from, relative to the root. Without it every matching file is analyzed
    #[arg(long)]
    pub entrypoint: Option<PathBuf>,

    /// File extensions to analyze, e.g. `.ts,.tsx`
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Directory names to skip, in addition to the defaults
    #[arg(long = "ignore-dir")]
    pub ignore_dirs: Vec<String>,

    /// Glob of files to leave out of the bulk scan
    #[arg(long)]
    pub ignore_pattern: Option<String>,

    /// tsconfig holding path aliases, relative to the root
    #[arg(long, default_value = "tsconfig.json")]
    pub tsconfig: PathBuf,

    /// Record third-party packages on each file
    #[arg(long)]
    pub third_party: bool,

    /// Record builtin modules on each file
    #[arg(long)]
    pub builtin: bool,

    /// Do not follow `import type` declarations
    #[arg(long)]
    pub skip_type_only: bool,

    /// Walk into the entry files of installed packages
    #[arg(long)]
    pub follow_third_party: bool,

    /// Where to keep the analysis cache between runs
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Print the graph as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Longest cycle to look for, in files
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct UnusedArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Report unused devDependencies too
    #[arg(long)]
    pub dev: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Quiet period before changes are analyzed
    #[arg(long, default_value = "200")]
    pub debounce_ms: u64,
}

impl AnalysisArgs {
    pub fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) if root.is_absolute() => Ok(root.clone()),
            Some(root) => Ok(env::current_dir()?.join(root)),
            None => find_git_root(),
        }
    }

    pub fn to_config(&self) -> Result<AnalysisConfig> {
        let mut config = AnalysisConfig::new(path_clean::clean(self.root()?));
        config.entrypoint = self.entrypoint.clone();
        if !self.extensions.is_empty() {
            config.file_extensions = self.extensions.clone();
        }
        config.ignore_dirs.extend(self.ignore_dirs.iter().cloned());
        config.ignore_pattern = self.ignore_pattern.clone();
        config.tsconfig = self.tsconfig.clone();
        config.tracking = DependencyTracking {
            third_party: self.third_party,
            builtin: self.builtin,
            type_only: !self.skip_type_only,
        };
        config.follow_third_party = self.follow_third_party;
        debug!("Analysis config: {:?}", config);
        Ok(config)
    }
}

pub fn find_git_root() -> Result<PathBuf> {
    debug!("Searching for git root");
    let start = env::current_dir()?;
    for dir in start.ancestors() {
        trace!("Checking for .git in: {:?}", dir);
        if dir.join(".git").exists() {
            debug!("Found git root at: {:?}", dir);
            return Ok(dir.to_path_buf());
        }
    }
    Err(anyhow!("Could not find .git directory in any parent folder, pass --root"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("depwalk").chain(args.iter().copied())).unwrap().command
    }

    #[test]
    fn test_analyze_flags_map_to_config() {
        let Commands::Analyze(cmd) = parse(&[
            "analyze",
            "--root",
            "/repo",
            "--entrypoint",
            "src/index.ts",
            "--ext",
            ".ts,.tsx",
            "--ignore-dir",
            "generated",
            "--third-party",
            "--skip-type-only",
            "--json",
        ]) else {
            panic!("expected analyze");
        };
        assert!(cmd.json);
        let config = cmd.analysis.to_config().unwrap();
        assert_eq!(config.cwd, PathBuf::from("/repo"));
        assert_eq!(config.entrypoint, Some(PathBuf::from("src/index.ts")));
        assert_eq!(config.file_extensions, vec![".ts", ".tsx"]);
        assert!(config.ignore_dirs.contains(&"node_modules".to_string()));
        assert!(config.ignore_dirs.contains(&"generated".to_string()));
        assert!(config.tracking.third_party);
        assert!(!config.tracking.builtin);
        assert!(!config.tracking.type_only);
    }

    #[test]
    fn test_defaults_keep_config_defaults() {
        let Commands::Cycles(cmd) = parse(&["cycles", "--root", "/repo", "--max-depth", "4"]) else {
            panic!("expected cycles");
        };
        assert_eq!(cmd.max_depth, Some(4));
        let config = cmd.analysis.to_config().unwrap();
        assert_eq!(config, AnalysisConfig::new("/repo"));
    }

    #[test]
    fn test_watch_debounce_default() {
        let Commands::Watch(cmd) = parse(&["watch", "--root", "/repo"]) else {
            panic!("expected watch");
        };
        assert_eq!(cmd.debounce_ms, 200);
        assert!(cmd.analysis.cache_file.is_none());
    }
}
