use crate::core::models::*;
use crate::infrastructure::dependency_analyzer::{normalize_path, resolve_local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Framework specifiers and the runtime URLs they load from
const FRAMEWORK_REWRITES: &[(&str, &str)] = &[
    ("kaze/jsx-runtime", "/kaze/jsx-runtime.js"),
    ("kaze/jsx-dev-runtime", "/kaze/jsx-runtime.js"),
    ("kaze/router", "/kaze/router.js"),
    ("kaze", "/kaze/hooks.js"),
];

static FROM_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\s*(?:import|export)\b[^'"]*?\bfrom\s*)(['"])([^'"]+)['"](.*)$"#)
        .expect("Invalid from-import regex")
});

static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\s*import\s*)(['"])([^'"]+)['"](.*)$"#)
        .expect("Invalid side-effect import regex")
});

static DYNAMIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(.*?\bimport\s*\(\s*)(['"])([^'"]+)['"](\s*\).*)$"#)
        .expect("Invalid dynamic import regex")
});

/// Everything one rewrite pass learned about a module
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    pub code: String,
    pub used_packages: BTreeSet<String>,
    pub package_bindings: BTreeMap<String, BTreeSet<String>>,
    pub css_imports: Vec<PathBuf>,
}

/// Rewrites import specifiers into browser-resolvable URLs, line by line.
///
/// The pass is idempotent: specifiers it has already produced (absolute
/// URLs ending in `.js`) and bare package names pass through untouched,
/// so overlapping pipeline phases can safely re-run it.
pub struct ImportRewriter;

impl ImportRewriter {
    pub fn new() -> Self {
        Self
    }

    pub fn rewrite(&self, code: &str, source: &SourceFile, project_root: &Path) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::default();
        let mut lines = Vec::new();

        for line in code.lines() {
            match self.rewrite_line(line, source, project_root, &mut outcome) {
                Some(rewritten) => lines.push(rewritten),
                None => {} // stripped CSS import
            }
        }

        outcome.code = lines.join("\n");
        if !outcome.code.is_empty() {
            outcome.code.push('\n');
        }
        outcome
    }

    /// Returns None when the line is a CSS import and must be dropped
    fn rewrite_line(
        &self,
        line: &str,
        source: &SourceFile,
        project_root: &Path,
        outcome: &mut RewriteOutcome,
    ) -> Option<String> {
        // Only genuine import shapes carry a specifier; an export or import
        // line that merely contains a string literal is left alone
        let captures = FROM_IMPORT_RE
            .captures(line)
            .or_else(|| SIDE_EFFECT_IMPORT_RE.captures(line))
            .or_else(|| DYNAMIC_IMPORT_RE.captures(line));
        let captures = match captures {
            Some(captures) => captures,
            None => return Some(line.to_string()),
        };

        let head = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        let specifier = captures.get(3).map(|m| m.as_str()).unwrap_or("");
        let tail = captures.get(4).map(|m| m.as_str()).unwrap_or("");

        if specifier.ends_with(".css") {
            if let Some(resolved) = resolve_css_path(specifier, source, project_root) {
                outcome.css_imports.push(resolved);
            }
            return None;
        }

        let rewritten = self.rewrite_specifier(specifier, head, source, project_root, outcome);
        Some(format!("{}\"{}\"{}", head, rewritten, tail))
    }

    fn rewrite_specifier(
        &self,
        specifier: &str,
        clause: &str,
        source: &SourceFile,
        project_root: &Path,
        outcome: &mut RewriteOutcome,
    ) -> String {
        // Already in output form from an earlier pass
        if specifier.starts_with('/') && specifier.ends_with(".js") {
            return specifier.to_string();
        }

        for (from, to) in FRAMEWORK_REWRITES {
            if specifier == *from {
                return (*to).to_string();
            }
        }

        if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
        {
            return self.rewrite_local(specifier, source, project_root);
        }

        // Bare package: the import map resolves it in the browser, the
        // resolver materializes it on disk
        if let Some(package) = bare_package_name(specifier) {
            outcome
                .package_bindings
                .entry(package.clone())
                .or_default()
                .extend(collect_named_bindings(clause));
            outcome.used_packages.insert(package);
        }
        specifier.to_string()
    }

    fn rewrite_local(&self, specifier: &str, source: &SourceFile, project_root: &Path) -> String {
        if let Some(target) = resolve_local(&source.path, specifier) {
            if let Ok(rel) = target.strip_prefix(project_root) {
                return url_from_rel(&rel.with_extension("js"));
            }
        }

        // Unresolvable target: emit the naive URL so the output stays loadable
        debug!(
            "import {} in {} does not resolve on disk",
            specifier,
            source.rel_path.display()
        );
        let base = source.rel_path.parent().unwrap_or_else(|| Path::new(""));
        let joined = match specifier.strip_prefix('/') {
            Some(stripped) => base.join(stripped),
            None => base.join(specifier),
        };
        url_from_rel(&normalize_path(&joined).with_extension("js"))
    }
}

impl Default for ImportRewriter {
    fn default() -> Self {
        Self::new()
    }
}

fn url_from_rel(rel: &Path) -> String {
    let mut url = String::from("/");
    let mut first = true;
    for component in rel.components() {
        if !first {
            url.push('/');
        }
        url.push_str(&component.as_os_str().to_string_lossy());
        first = false;
    }
    url
}

fn resolve_css_path(specifier: &str, source: &SourceFile, project_root: &Path) -> Option<PathBuf> {
    let base = if specifier.starts_with('/') {
        project_root.to_path_buf()
    } else {
        source.path.parent()?.to_path_buf()
    };
    let joined = base.join(specifier.trim_start_matches('/'));
    Some(normalize_path(&joined))
}

fn bare_package_name(specifier: &str) -> Option<String> {
    if specifier.starts_with("node:") || specifier.starts_with("bun:") {
        return None;
    }
    if specifier.starts_with('@') {
        let mut parts = specifier.splitn(3, '/');
        let scope = parts.next()?;
        let package = parts.next()?;
        return Some(format!("{}/{}", scope, package));
    }
    let name = specifier.split('/').next().unwrap_or("");
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Exported names requested by an import clause, `{ a, b as c }` yields a and b
fn collect_named_bindings(clause: &str) -> BTreeSet<String> {
    let mut bindings = BTreeSet::new();
    let (Some(open), Some(close)) = (clause.find('{'), clause.find('}')) else {
        return bindings;
    };
    if close <= open {
        return bindings;
    }

    for part in clause[open + 1..close].split(',') {
        let mut tokens = part.split_whitespace();
        let first = match tokens.next() {
            Some(token) => token,
            None => continue,
        };
        // `type Foo` only exists pre-transpile but costs nothing to skip
        let name = if first == "type" {
            match tokens.next() {
                Some(token) => token,
                None => continue,
            }
        } else {
            first
        };
        if !name.is_empty() {
            bindings.insert(name.to_string());
        }
    }
    bindings
}
