use std::{
    env,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use colored::Colorize;
use depwalk_analyzer::{ChangesDetected, UnusedDependencies};
use depwalk_graph::GraphStructure;
use log::{debug, trace};

/// Turn a node id into a path relative to the current directory so
/// terminals can link it.
fn relativize_to_cwd(root: &Path, id: &str) -> String {
    let Ok(cwd) = env::current_dir() else {
        debug!("Failed to get current directory");
        return id.to_string();
    };
    match make_relative(&root.join(id), &cwd) {
        Some(rel) => rel.to_string_lossy().to_string(),
        None => {
            trace!("Could not relativize '{}', using original", id);
            id.to_string()
        }
    }
}

/// Relative path leading from `base` to `target`, `None` when they do not
/// share a root.
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    if target.first() != base.first() {
        return None;
    }

    let common = target.iter().zip(&base).take_while(|(t, b)| t == b).count();
    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for component in &target[common..] {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

pub fn print_summary<W: Write>(writer: &mut W, structure: &GraphStructure) -> io::Result<()> {
    let edges: usize = structure.graph.values().map(Vec::len).sum();
    let third_party = structure
        .files
        .values()
        .flat_map(|body| body.third_party_dependencies.iter())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    writeln!(
        writer,
        "{} {} files, {} imports, {} third-party packages",
        "✓".green().bold(),
        structure.files.len().to_string().cyan(),
        edges.to_string().cyan(),
        third_party.to_string().cyan()
    )?;
    writer.flush()
}

pub fn print_cycles<W: Write>(
    writer: &mut W,
    cycles: &[Vec<String>],
    root: &Path,
) -> io::Result<()> {
    debug!("Printing {} cycles", cycles.len());
    writeln!(
        writer,
        "{} {} circular imports found\n",
        "⚠".yellow().bold(),
        cycles.len().to_string().yellow()
    )?;

    for (idx, cycle) in cycles.iter().enumerate() {
        writeln!(writer, "{}", format!("Cycle {}", idx + 1).bright_white().bold())?;
        for (i, id) in cycle.iter().enumerate() {
            let prefix = if i == 0 { "┌──" } else { "├──" };
            writeln!(writer, "{}  {}", prefix.dimmed(), relativize_to_cwd(root, id).blue())?;
        }
        if let Some(first) = cycle.first() {
            let first = relativize_to_cwd(root, first);
            writeln!(writer, "{}  {}", "└──".dimmed(), first.dimmed())?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

pub fn print_no_cycles<W: Write>(writer: &mut W, max_depth: Option<usize>) -> io::Result<()> {
    match max_depth {
        Some(depth) => {
            writeln!(writer, "{} No circular imports up to {} files", "✓".green().bold(), depth)?
        }
        None => writeln!(writer, "{} No circular imports", "✓".green().bold())?,
    }
    writer.flush()
}

pub fn print_unused_files<W: Write>(
    writer: &mut W,
    files: &[String],
    root: &Path,
) -> io::Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    writeln!(writer, "\n{} Files nothing imports", "●".bright_blue())?;
    for (idx, id) in files.iter().enumerate() {
        let prefix = if idx == files.len() - 1 { "└──" } else { "├──" };
        writeln!(writer, "{}  {}", prefix.dimmed(), relativize_to_cwd(root, id))?;
    }
    writer.flush()
}

pub fn print_unused_dependencies<W: Write>(
    writer: &mut W,
    unused: &UnusedDependencies,
) -> io::Result<()> {
    if unused.third_party.is_empty() {
        writeln!(writer, "{} No unused dependencies", "✓".green().bold())?;
        return writer.flush();
    }
    writeln!(
        writer,
        "{} {} unused dependencies\n",
        "⚠".yellow().bold(),
        unused.third_party.len().to_string().yellow()
    )?;
    for package in &unused.third_party {
        writeln!(writer, "  {} {}", "-".dimmed(), package.red())?;
    }
    writer.flush()
}

pub fn print_changes<W: Write>(writer: &mut W, event: &ChangesDetected) -> io::Result<()> {
    let label = if event.configuration_changed { "configuration changed" } else { "files changed" };
    writeln!(
        writer,
        "{} {} ({}): {} re-analyzed, {} reused, {} total",
        "↻".bright_blue(),
        label,
        event.changed_files.len(),
        event.files_reanalyzed.to_string().cyan(),
        event.files_reused.to_string().cyan(),
        event.total_files.to_string().cyan()
    )?;
    for id in &event.changed_files {
        writeln!(writer, "  {} {}", "-".dimmed(), id)?;
    }
    writer.flush()
}

pub fn print_finished<W: Write>(writer: &mut W, elapsed_ms: u128, files: usize) -> io::Result<()> {
    writeln!(
        writer,
        "\n{} Finished in {}ms on {} files (using {} threads).",
        "●".bright_blue(),
        elapsed_ms.to_string().cyan(),
        files.to_string().cyan(),
        rayon::current_num_threads().to_string().cyan()
    )?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_make_relative() {
        assert_eq!(
            make_relative(Path::new("/repo/src/a.ts"), Path::new("/repo")),
            Some(PathBuf::from("src/a.ts"))
        );
        assert_eq!(
            make_relative(Path::new("/repo/src/a.ts"), Path::new("/repo/lib/deep")),
            Some(PathBuf::from("../../src/a.ts"))
        );
        assert_eq!(make_relative(Path::new("/repo"), Path::new("/repo")), Some(PathBuf::from(".")));
        assert_eq!(make_relative(Path::new("src/a.ts"), Path::new("/repo")), None);
    }

    #[test]
    fn test_cycles_output_lists_every_file() {
        let cycles = vec![vec!["a.js".to_string(), "b.js".to_string()]];
        let out = render(|w| print_cycles(w, &cycles, Path::new("/nonexistent-root")));
        assert!(out.contains("circular imports found"));
        assert!(out.contains("Cycle 1"));
        assert!(out.contains("a.js"));
        assert!(out.contains("b.js"));
    }

    #[test]
    fn test_unused_dependencies_output() {
        let unused = UnusedDependencies { third_party: vec!["lodash".into()] };
        let out = render(|w| print_unused_dependencies(w, &unused));
        assert!(out.contains("unused dependencies"));
        assert!(out.contains("lodash"));

        let out = render(|w| print_unused_dependencies(w, &UnusedDependencies::default()));
        assert!(out.contains("No unused dependencies"));
    }

    #[test]
    fn test_changes_output() {
        let event = ChangesDetected {
            changed_files: vec!["src/a.ts".into()],
            files_reanalyzed: 1,
            files_reused: 3,
            total_files: 4,
            ..Default::default()
        };
        let out = render(|w| print_changes(w, &event));
        assert!(out.contains("files changed"));
        assert!(out.contains("src/a.ts"));
    }
}
