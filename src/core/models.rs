use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::utils::{KazeError, Result};

/// Extensions the transform pipeline accepts, highest route specificity first
pub const SOURCE_EXTENSIONS: [&str; 4] = ["tsx", "jsx", "ts", "js"];

pub fn is_source_extension(ext: &str) -> bool {
    SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(is_source_extension)
        .unwrap_or(false)
}

/// What a discovered source file contributes to the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Page,
    Layout,
    Component,
}

/// A discovered source file plus its precomputed output location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Absolute on-disk path
    pub path: PathBuf,
    /// Path relative to the project root
    pub rel_path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn new(path: PathBuf, project_root: &Path, kind: SourceKind) -> Result<Self> {
        let rel_path = path
            .strip_prefix(project_root)
            .map_err(|_| {
                KazeError::InvalidPath(format!(
                    "{} is outside the project root",
                    path.display()
                ))
            })?
            .to_path_buf();
        Ok(Self {
            path,
            rel_path,
            kind,
        })
    }

    /// Output location relative to the output directory, always with a .js extension
    pub fn output_rel_path(&self) -> PathBuf {
        self.rel_path.with_extension("js")
    }

    /// Browser-facing URL of the emitted module, rooted at the output directory
    pub fn module_url(&self) -> String {
        let rel = self.output_rel_path();
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
}

/// One URL path and the modules that render it
#[derive(Debug, Clone)]
pub struct Route {
    /// Normalized URL path: "/", "/about", "/blog/post"
    pub url_path: String,
    pub page: SourceFile,
    /// Layouts from outermost to innermost
    pub layout_chain: Vec<SourceFile>,
}

impl Route {
    /// Number of URL segments, zero for the root route
    pub fn segment_count(&self) -> usize {
        if self.url_path == "/" {
            0
        } else {
            self.url_path.matches('/').count()
        }
    }
}

/// Routes plus the non-fatal problems found while walking the app directory
#[derive(Debug, Default)]
pub struct DiscoveredRoutes {
    pub routes: Vec<Route>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Entry serialized into the app bundle's route table
#[derive(Debug, Clone, Serialize)]
pub struct RouteTableEntry {
    pub path: String,
    pub page: String,
    pub layouts: Vec<String>,
}

impl From<&Route> for RouteTableEntry {
    fn from(route: &Route) -> Self {
        Self {
            path: route.url_path.clone(),
            page: route.page.module_url(),
            layouts: route
                .layout_chain
                .iter()
                .map(|layout| layout.module_url())
                .collect(),
        }
    }
}

/// External packages and local files a module graph reaches
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub packages: BTreeSet<String>,
    pub local_files: BTreeSet<PathBuf>,
    /// Recovered resolution problems, folded into the build warnings
    pub diagnostics: Vec<Diagnostic>,
}

impl DependencySet {
    pub fn merge(&mut self, other: DependencySet) {
        self.packages.extend(other.packages);
        self.local_files.extend(other.local_files);
        self.diagnostics.extend(other.diagnostics);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Per-file problem that does not abort the build on its own
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn warning(message: String, file: Option<PathBuf>) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            file,
        }
    }

    pub fn error(message: String, file: Option<PathBuf>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            file,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: {}", file.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of transforming one source module
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub source: SourceFile,
    pub code: String,
    /// Bare package specifiers the module imports
    pub used_packages: BTreeSet<String>,
    /// Named exports requested from each package, used when a shim
    /// has to stand in for the real module
    pub package_bindings: BTreeMap<String, BTreeSet<String>>,
    /// CSS files the module imported, resolved to absolute paths
    pub css_imports: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    #[serde(default = "default_root")]
    pub project_root: PathBuf,
    #[serde(default = "default_outdir")]
    pub outdir: PathBuf,
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub silent: bool,
    /// Overrides the embedded runtime files when set
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
    #[serde(default = "default_build_timeout")]
    pub build_timeout_ms: u64,
    #[serde(default = "default_css_timeout")]
    pub css_timeout_ms: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_outdir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_build_timeout() -> u64 {
    60_000
}

fn default_css_timeout() -> u64 {
    10_000
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            outdir: PathBuf::from("dist"),
            minify: false,
            silent: false,
            runtime_dir: None,
            build_timeout_ms: 60_000,
            css_timeout_ms: 10_000,
        }
    }
}

/// Lifecycle of one build, advanced only by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Preparing,
    Discovering,
    Transforming,
    Assembling,
    Done,
    Failed,
}

impl BuildPhase {
    /// Legal forward edges; Failed is reachable from every active phase
    pub fn can_advance_to(self, next: BuildPhase) -> bool {
        use BuildPhase::*;
        match (self, next) {
            (Idle, Preparing)
            | (Preparing, Discovering)
            | (Discovering, Transforming)
            | (Transforming, Assembling)
            | (Assembling, Done) => true,
            (Idle | Preparing | Discovering | Transforming | Assembling, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BuildPhase::Done | BuildPhase::Failed)
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Preparing => "preparing",
            BuildPhase::Discovering => "discovering",
            BuildPhase::Transforming => "transforming",
            BuildPhase::Assembling => "assembling",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Everything the scanner found outside the route tree
#[derive(Debug, Default)]
pub struct ProjectSources {
    pub components: Vec<SourceFile>,
    pub stylesheets: Vec<PathBuf>,
    pub public_assets: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub success: bool,
    pub output_path: PathBuf,
    pub build_time_ms: u64,
    pub route_count: usize,
    pub component_count: usize,
    pub asset_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
