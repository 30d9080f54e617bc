use log::{debug, trace, warn};
use path_clean::clean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fs::FileReader;

/// Guards against `extends` loops.
const MAX_EXTENDS_DEPTH: usize = 8;

/// One `compilerOptions.paths` entry, e.g. `@app/*` -> `["src/app/*"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub pattern: String,
    pub targets: Vec<String>,
}

/// Path aliases of a TypeScript project, anchored at `base_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAliases {
    base_url: PathBuf,
    entries: Vec<AliasEntry>,
}

/// A specifier rewritten through an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    pub pattern: String,
    /// Rewritten specifiers, relative to the alias base url, in priority order.
    pub targets: Vec<String>,
}

impl PathAliases {
    pub fn new(base_url: impl Into<PathBuf>, entries: Vec<AliasEntry>) -> Self {
        Self { base_url: base_url.into(), entries }
    }

    pub fn base_url(&self) -> &Path {
        &self.base_url
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Match `specifier` against the alias patterns.
    ///
    /// Exact patterns win over wildcard ones; among wildcards the longest
    /// prefix wins, as in the TypeScript compiler.
    pub fn match_specifier(&self, specifier: &str) -> Option<AliasMatch> {
        let mut best: Option<(usize, &AliasEntry, &str)> = None;

        for entry in &self.entries {
            let (score, captured) = match entry.pattern.split_once('*') {
                Some((prefix, suffix)) => {
                    if specifier.len() < prefix.len() + suffix.len()
                        || !specifier.starts_with(prefix)
                        || !specifier.ends_with(suffix)
                    {
                        continue;
                    }
                    (prefix.len(), &specifier[prefix.len()..specifier.len() - suffix.len()])
                }
                None if entry.pattern == specifier => (usize::MAX, ""),
                None => continue,
            };
            if best.is_none_or(|(s, _, _)| score > s) {
                best = Some((score, entry, captured));
            }
        }

        best.map(|(_, entry, captured)| {
            trace!("Matched alias '{}' for specifier '{}'", entry.pattern, specifier);
            AliasMatch {
                pattern: entry.pattern.clone(),
                targets: entry.targets.iter().map(|t| t.replacen('*', captured, 1)).collect(),
            }
        })
    }
}

#[derive(Debug, Default)]
struct CompilerOptions {
    base_url: Option<PathBuf>,
    /// Alias entries and the directory of the tsconfig that declared them.
    paths: Option<(Vec<AliasEntry>, PathBuf)>,
}

/// Read `compilerOptions.paths`/`baseUrl` from `tsconfig`, following local
/// `extends` chains. A missing or unreadable tsconfig yields no aliases.
pub fn read_path_aliases(reader: &dyn FileReader, tsconfig: &Path) -> PathAliases {
    debug!("Reading tsconfig paths from: {:?}", tsconfig);
    let Some(options) = load_compiler_options(reader, tsconfig, 0) else {
        return PathAliases::default();
    };

    let (entries, paths_dir) = options.paths.unwrap_or_default();
    let base_url = options.base_url.unwrap_or(paths_dir);
    debug!("Loaded {} tsconfig path aliases", entries.len());
    PathAliases::new(base_url, entries)
}

fn load_compiler_options(
    reader: &dyn FileReader,
    tsconfig: &Path,
    depth: usize,
) -> Option<CompilerOptions> {
    if depth > MAX_EXTENDS_DEPTH {
        warn!("Giving up on tsconfig 'extends' chain at {}", tsconfig.display());
        return None;
    }
    let content = match reader.read(tsconfig) {
        Ok(content) => content,
        Err(e) => {
            debug!("No tsconfig at {}: {}", tsconfig.display(), e);
            return None;
        }
    };
    let json = match serde_json::from_str::<serde_json::Value>(&strip_json_comments(&content)) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to parse tsconfig {}: {}", tsconfig.display(), e);
            return None;
        }
    };
    let tsconfig_dir = tsconfig.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut options = json
        .get("extends")
        .and_then(|e| e.as_str())
        .and_then(|parent| {
            if !parent.starts_with('.') && !parent.starts_with('/') {
                debug!("Skipping package tsconfig extends '{}'", parent);
                return None;
            }
            let mut parent_path = clean(tsconfig_dir.join(parent));
            if !reader.exists(&parent_path) {
                // `../tsconfig.base` names `../tsconfig.base.json`
                let mut with_json = parent_path.clone().into_os_string();
                with_json.push(".json");
                parent_path = PathBuf::from(with_json);
            }
            trace!("Following tsconfig extends: {:?}", parent_path);
            load_compiler_options(reader, &parent_path, depth + 1)
        })
        .unwrap_or_default();

    if let Some(compiler_options) = json.get("compilerOptions") {
        if let Some(base_url) = compiler_options.get("baseUrl").and_then(|b| b.as_str()) {
            options.base_url = Some(clean(tsconfig_dir.join(base_url)));
        }
        if let Some(paths_obj) = compiler_options.get("paths").and_then(|p| p.as_object()) {
            let entries: Vec<AliasEntry> = paths_obj
                .iter()
                .filter_map(|(alias, targets)| {
                    let targets: Vec<String> = targets
                        .as_array()?
                        .iter()
                        .filter_map(|t| t.as_str())
                        .map(str::to_string)
                        .collect();
                    if targets.is_empty() {
                        return None;
                    }
                    trace!("Found tsconfig path alias: '{}' -> {:?}", alias, targets);
                    Some(AliasEntry { pattern: alias.clone(), targets })
                })
                .collect();
            options.paths = Some((entries, tsconfig_dir.clone()));
        }
    }

    Some(options)
}

/// Drop `//` and `/* */` comments and trailing commas outside of strings.
fn strip_json_comments(content: &str) -> String {
    strip_trailing_commas(&strip_comments(content))
}

fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Expects comment-free input.
fn strip_trailing_commas(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    // Byte offset in `out` of a comma not yet followed by a value.
    let mut pending_comma: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for c in content.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            ',' => {
                pending_comma = Some(out.len());
                out.push(c);
            }
            '}' | ']' => {
                if let Some(at) = pending_comma.take() {
                    out.remove(at);
                }
                out.push(c);
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                pending_comma = None;
                in_string = c == '"';
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileReader;

    #[test]
    fn test_read_path_aliases_simple() {
        let reader = InMemoryFileReader::new().with_file(
            "/repo/tsconfig.json",
            r#"
{
  "compilerOptions": {
    "baseUrl": ".",
    "paths": {
      "@components/*": ["src/components/*"],
      "@utils": ["src/utils"]
    }
  }
}
"#,
        );
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.base_url(), Path::new("/repo"));

        let matched = aliases.match_specifier("@components/Button").unwrap();
        assert_eq!(matched.targets, vec!["src/components/Button"]);
        let matched = aliases.match_specifier("@utils").unwrap();
        assert_eq!(matched.targets, vec!["src/utils"]);
        assert!(aliases.match_specifier("@utils/extra").is_none());
        assert!(aliases.match_specifier("react").is_none());
    }

    #[test]
    fn test_read_path_aliases_with_base_url() {
        let reader = InMemoryFileReader::new().with_file(
            "/repo/tsconfig.json",
            r#"{
                "compilerOptions": {
                    "baseUrl": "src",
                    "paths": { "@components/*": ["components/*"] }
                }
            }"#,
        );
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.base_url(), Path::new("/repo/src"));
    }

    #[test]
    fn test_paths_without_base_url_are_relative_to_tsconfig() {
        let reader = InMemoryFileReader::new().with_file(
            "/repo/apps/web/tsconfig.json",
            r#"{ "compilerOptions": { "paths": { "~/*": ["./src/*"] } } }"#,
        );
        let aliases = read_path_aliases(&reader, Path::new("/repo/apps/web/tsconfig.json"));
        assert_eq!(aliases.base_url(), Path::new("/repo/apps/web"));
        assert_eq!(aliases.match_specifier("~/a").unwrap().targets, vec!["./src/a"]);
    }

    #[test]
    fn test_read_path_aliases_with_comments_and_trailing_commas() {
        let reader = InMemoryFileReader::new().with_file(
            "/repo/tsconfig.json",
            r#"
{
  // This is a comment
  "compilerOptions": {
    "baseUrl": ".", /* block */
    "paths": {
      "@components/*": ["src/components/*"], // Path comment
    },
    "outDir": "https://example.com//not-a-comment",
  },
}
"#,
        );
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_extends_chain() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/tsconfig.base.json",
                r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@lib/*": ["lib/*"] } } }"#,
            )
            .with_file("/repo/apps/tsconfig.json", r#"{ "extends": "../tsconfig.base" }"#);
        let aliases = read_path_aliases(&reader, Path::new("/repo/apps/tsconfig.json"));
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.base_url(), Path::new("/repo"));
    }

    #[test]
    fn test_extends_with_explicit_json_extension() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/configs/base.json",
                r#"{ "compilerOptions": { "paths": { "@lib/*": ["lib/*"] } } }"#,
            )
            .with_file("/repo/tsconfig.json", r#"{ "extends": "./configs/base.json" }"#);
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.base_url(), Path::new("/repo/configs"));
    }

    #[test]
    fn test_strip_json_comments() {
        let stripped = strip_json_comments(
            "{ \"a\": [1, 2, /* two */], // tail\n \"b\": \"x,]\", \"c\": \"//keep\", }",
        );
        let json: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(json["a"], serde_json::json!([1, 2]));
        assert_eq!(json["b"], "x,]");
        assert_eq!(json["c"], "//keep");
    }

    #[test]
    fn test_child_paths_override_parent() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/tsconfig.base.json",
                r#"{ "compilerOptions": { "paths": { "@lib/*": ["lib/*"] } } }"#,
            )
            .with_file(
                "/repo/tsconfig.json",
                r#"{
                    "extends": "./tsconfig.base.json",
                    "compilerOptions": { "paths": { "@app/*": ["app/*"] } }
                }"#,
            );
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.len(), 1);
        assert!(aliases.match_specifier("@app/x").is_some());
        assert!(aliases.match_specifier("@lib/x").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let aliases = PathAliases::new(
            "/repo",
            vec![
                AliasEntry { pattern: "@/*".into(), targets: vec!["src/*".into()] },
                AliasEntry { pattern: "@/ui/*".into(), targets: vec!["packages/ui/*".into()] },
            ],
        );
        assert_eq!(
            aliases.match_specifier("@/ui/button").unwrap().targets,
            vec!["packages/ui/button"]
        );
        assert_eq!(aliases.match_specifier("@/lib").unwrap().targets, vec!["src/lib"]);
    }

    #[test]
    fn test_missing_tsconfig() {
        let reader = InMemoryFileReader::new();
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_no_paths() {
        let reader = InMemoryFileReader::new().with_file(
            "/repo/tsconfig.json",
            r#"{ "compilerOptions": { "target": "ES2020" } }"#,
        );
        let aliases = read_path_aliases(&reader, Path::new("/repo/tsconfig.json"));
        assert_eq!(aliases.len(), 0);
    }
}
