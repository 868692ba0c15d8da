use crate::core::models::*;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::utils::Result;

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String>;
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;
    async fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<()>;
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
    /// Removes the directory if present, then recreates it empty
    async fn clean_directory(&self, path: &Path) -> Result<()>;
    /// Immediate children, without recursing
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
    /// Every file under the directory, depth first
    async fn walk_files(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn file_exists(&self, path: &Path) -> bool;
    fn dir_exists(&self, path: &Path) -> bool;
}

/// Route discovery interface
#[async_trait]
pub trait RouteDiscovery: Send + Sync {
    /// Walks the route roots and produces routes in matching order
    async fn discover_routes(&self, project_root: &Path) -> Result<DiscoveredRoutes>;
}

/// Heuristic dependency analysis interface; purely textual, never executes code
pub trait DependencyAnalyzer: Send + Sync {
    /// Packages and local files reachable from one source file
    fn analyze(&self, path: &Path, project_root: &Path) -> DependencySet;
}

/// Per-module source transformation interface
pub trait ModuleTransformer: Send + Sync {
    /// Transpiles, normalizes and rewrites one module into browser ESM
    fn transform(&self, source: &SourceFile, project_root: &Path) -> TransformResult;
}

/// Package resolution interface for the browser module space
#[async_trait]
pub trait PackageResolver: Send + Sync {
    /// Emits a loadable module for the package under the output node_modules
    /// directory and returns its browser URL
    async fn materialize(
        &self,
        package: &str,
        named_bindings: &BTreeSet<String>,
        project_root: &Path,
        outdir: &Path,
    ) -> Result<ResolvedPackage>;
}

/// How a package request was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub url: String,
    pub shimmed: bool,
}

/// CSS pipeline interface
#[async_trait]
pub trait CssPipeline: Send + Sync {
    /// Produces the final stylesheet bundle for the given entry files
    async fn build_stylesheet(
        &self,
        entries: &[PathBuf],
        project_root: &Path,
        minify: bool,
    ) -> Result<CssOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct CssOutput {
    pub code: String,
    pub warnings: Vec<String>,
}

/// Build orchestration interface
#[async_trait]
pub trait BuildService: Send + Sync {
    async fn build(&self, options: &BuildOptions) -> Result<BuildReport>;
    fn phase(&self) -> BuildPhase;
}
