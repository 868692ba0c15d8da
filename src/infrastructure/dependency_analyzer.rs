use crate::core::{interfaces::DependencyAnalyzer, models::*};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// How many import hops beyond the entry file the analyzer follows
pub const MAX_ANALYSIS_DEPTH: usize = 3;

/// Packages satisfied by the framework itself or the host runtime,
/// never materialized into the output module space
const EXCLUDED_PACKAGES: &[&str] = &["kaze", "bun", "node"];

/// JSX tags that imply a package dependency even without an import line
const JSX_TAG_PACKAGES: &[(&str, &str)] = &[
    ("<motion.", "framer-motion"),
    ("<Lottie", "lottie-web"),
];

static IMPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s[^'"]*?\bfrom\s*['"]([^'"]+)['"]"#)
        .expect("Invalid import regex")
});

static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).expect("Invalid side-effect import regex")
});

static DYNAMIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("Invalid dynamic import regex")
});

static REQUIRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("Invalid require regex")
});

/// Textual import scanner. Deliberately approximate: it reads source
/// line-by-line instead of parsing, trading false negatives for speed.
/// Results are advisory and only decide which packages get materialized.
pub struct HeuristicDependencyAnalyzer {
    max_depth: usize,
}

impl HeuristicDependencyAnalyzer {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_ANALYSIS_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn walk(
        &self,
        path: &Path,
        project_root: &Path,
        depth: usize,
        visited: &mut HashSet<PathBuf>,
        set: &mut DependencySet,
    ) {
        if depth >= self.max_depth {
            return;
        }

        let normalized = normalize_path(path);
        if !visited.insert(normalized.clone()) {
            return;
        }

        // Unreadable files end the walk on this branch, nothing more
        let content = match std::fs::read_to_string(&normalized) {
            Ok(content) => content,
            Err(_) => return,
        };

        for line in content.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") {
                continue;
            }

            for specifier in extract_specifiers(line) {
                if is_relative_specifier(&specifier) {
                    match resolve_local(&normalized, &specifier) {
                        Some(target) => {
                            set.local_files.insert(target.clone());
                            self.walk(&target, project_root, depth + 1, visited, set);
                        }
                        // Asset imports (css, images) are not module edges
                        None if is_asset_specifier(&specifier) => {}
                        None => {
                            debug!(
                                "unresolved local import {} in {}",
                                specifier,
                                normalized.display()
                            );
                            set.diagnostics.push(Diagnostic::warning(
                                format!("unresolved import \"{}\"", specifier),
                                Some(normalized.clone()),
                            ));
                        }
                    }
                } else if let Some(package) = classify_package(&specifier) {
                    set.packages.insert(package);
                }
            }

            for (needle, package) in JSX_TAG_PACKAGES {
                if line.contains(needle) {
                    set.packages.insert((*package).to_string());
                }
            }
        }
    }
}

impl Default for HeuristicDependencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyAnalyzer for HeuristicDependencyAnalyzer {
    fn analyze(&self, path: &Path, project_root: &Path) -> DependencySet {
        let mut set = DependencySet::default();
        let mut visited = HashSet::new();
        self.walk(path, project_root, 0, &mut visited, &mut set);
        set
    }
}

fn extract_specifiers(line: &str) -> Vec<String> {
    let mut specifiers = Vec::new();
    for re in [
        &*IMPORT_FROM_RE,
        &*SIDE_EFFECT_IMPORT_RE,
        &*DYNAMIC_IMPORT_RE,
        &*REQUIRE_RE,
    ] {
        for capture in re.captures_iter(line) {
            if let Some(m) = capture.get(1) {
                specifiers.push(m.as_str().to_string());
            }
        }
    }
    specifiers
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// A relative specifier with an explicit non-source extension
fn is_asset_specifier(specifier: &str) -> bool {
    Path::new(specifier)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| !is_source_extension(ext))
        .unwrap_or(false)
}

/// Resolves a relative specifier against the importing file's directory,
/// probing the recognized source extensions and index files
pub(crate) fn resolve_local(from: &Path, specifier: &str) -> Option<PathBuf> {
    let base = from.parent()?;
    let joined = match specifier.strip_prefix('/') {
        Some(stripped) => base.join(stripped),
        None => base.join(specifier),
    };
    let raw = normalize_path(&joined);

    if raw.is_file() {
        return is_source_file(&raw).then_some(raw);
    }

    // An explicit non-source extension is an asset import, not a module edge
    if let Some(ext) = raw.extension().and_then(|e| e.to_str()) {
        if !is_source_extension(ext) {
            return None;
        }
    }

    for ext in SOURCE_EXTENSIONS {
        let candidate = raw.with_extension(ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for ext in SOURCE_EXTENSIONS {
        let candidate = raw.join(format!("index.{}", ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

/// Package name for a bare specifier, or None when the package is excluded
fn classify_package(specifier: &str) -> Option<String> {
    if specifier.starts_with("node:") || specifier.starts_with("bun:") {
        return None;
    }

    let name = if specifier.starts_with('@') {
        let mut parts = specifier.splitn(3, '/');
        let scope = parts.next()?;
        let package = parts.next()?;
        format!("{}/{}", scope, package)
    } else {
        specifier.split('/').next()?.to_string()
    };

    if name.is_empty() || EXCLUDED_PACKAGES.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}

/// Folds `.` and `..` components without touching the file system
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn analyze(root: &Path, rel: &str) -> DependencySet {
        HeuristicDependencyAnalyzer::new().analyze(&root.join(rel), root)
    }

    #[test]
    fn test_cycle_terminates_with_finite_set() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/A.tsx",
            "import B from \"./B\";\nexport default () => <B />;",
        );
        write(
            temp.path(),
            "components/B.tsx",
            "import A from \"./A\";\nexport default () => <A />;",
        );

        let set = analyze(temp.path(), "components/A.tsx");
        assert!(set
            .local_files
            .iter()
            .any(|f| f.ends_with("components/B.tsx")));
        assert!(set.local_files.len() <= 2);
    }

    #[test]
    fn test_transitive_package_through_shared_component() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/Card.tsx",
            "import Button from \"../shared/Button\";\nexport default () => <Button />;",
        );
        write(
            temp.path(),
            "shared/Button.tsx",
            "import leftPad from \"left-pad\";\nexport default () => <button>{leftPad(\"x\", 3)}</button>;",
        );

        let set = analyze(temp.path(), "components/Card.tsx");
        assert!(set
            .local_files
            .iter()
            .any(|f| f.ends_with("shared/Button.tsx")));
        assert!(set.packages.contains("left-pad"));
    }

    #[test]
    fn test_depth_bound_stops_the_walk() {
        let temp = tempdir().unwrap();
        write(temp.path(), "lib/a.ts", "import \"./b\";");
        write(temp.path(), "lib/b.ts", "import \"./c\";");
        write(temp.path(), "lib/c.ts", "import \"./d\";");
        write(temp.path(), "lib/d.ts", "import \"./e\";");
        write(temp.path(), "lib/e.ts", "import deep from \"deep-pkg\";");

        let set = analyze(temp.path(), "lib/a.ts");
        // a(0) b(1) c(2) are scanned; d is recorded by c but never opened
        assert!(set.local_files.iter().any(|f| f.ends_with("lib/d.ts")));
        assert!(!set.local_files.iter().any(|f| f.ends_with("lib/e.ts")));
        assert!(!set.packages.contains("deep-pkg"));
    }

    #[test]
    fn test_scoped_packages_keep_two_segments() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "lib/icons.ts",
            "import { Star } from \"@tabler/icons/star\";",
        );

        let set = analyze(temp.path(), "lib/icons.ts");
        assert!(set.packages.contains("@tabler/icons"));
    }

    #[test]
    fn test_framework_and_runtime_packages_are_excluded() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "lib/app.ts",
            "import { useState } from \"kaze\";\nimport fs from \"node:fs\";\nimport { serve } from \"bun\";\nimport chalk from \"chalk\";",
        );

        let set = analyze(temp.path(), "lib/app.ts");
        assert_eq!(set.packages.len(), 1);
        assert!(set.packages.contains("chalk"));
    }

    #[test]
    fn test_dynamic_import_and_require_are_detected() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "lib/lazy.ts",
            "const mod = await import(\"confetti\");\nconst legacy = require(\"dayjs\");",
        );

        let set = analyze(temp.path(), "lib/lazy.ts");
        assert!(set.packages.contains("confetti"));
        assert!(set.packages.contains("dayjs"));
    }

    #[test]
    fn test_jsx_tag_implies_package() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/Hero.tsx",
            "export default () => <motion.div animate={{ x: 1 }} />;",
        );

        let set = analyze(temp.path(), "components/Hero.tsx");
        assert!(set.packages.contains("framer-motion"));
    }

    #[test]
    fn test_unresolved_local_import_is_skipped() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/Broken.tsx",
            "import Ghost from \"./Ghost\";\nexport default () => <Ghost />;",
        );

        let set = analyze(temp.path(), "components/Broken.tsx");
        assert!(set.local_files.is_empty());
        assert!(set.packages.is_empty());
        assert_eq!(set.diagnostics.len(), 1);
        assert!(set.diagnostics[0].to_string().contains("./Ghost"));
    }

    #[test]
    fn test_directory_import_resolves_index_file() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/Page.tsx",
            "import { Grid } from \"./widgets\";",
        );
        write(temp.path(), "components/widgets/index.tsx", "export const Grid = 1;");

        let set = analyze(temp.path(), "components/Page.tsx");
        assert!(set
            .local_files
            .iter()
            .any(|f| f.ends_with("widgets/index.tsx")));
    }

    #[test]
    fn test_css_import_is_not_a_module_edge() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "components/Styled.tsx",
            "import \"./styled.css\";\nexport default () => <div />;",
        );
        write(temp.path(), "components/styled.css", "div { color: red }");

        let set = analyze(temp.path(), "components/Styled.tsx");
        assert!(set.local_files.is_empty());
        assert!(set.diagnostics.is_empty());
    }
}
