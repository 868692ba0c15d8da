use crate::core::interfaces::{FileSystemService, PackageResolver, ResolvedPackage};
use crate::utils::{KazeError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Package.json structure for parsing npm packages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub browser: Option<BrowserField>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BrowserField {
    String(String),
    Object(HashMap<String, serde_json::Value>),
}

pub async fn read_package_json(
    fs: &Arc<dyn FileSystemService>,
    path: &Path,
) -> Option<PackageJson> {
    let content = fs.read_file(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

/// Materializes third-party packages into the output's node_modules
/// directory: installed packages are copied whole, missing ones get a
/// synthetic shim module so imports never fail to load.
///
/// Results are memoized per package name, so each package is resolved
/// once per build no matter how many modules import it.
pub struct NodePackageResolver {
    fs: Arc<dyn FileSystemService>,
    cache: DashMap<String, ResolvedPackage>,
}

impl NodePackageResolver {
    pub fn new(fs: Arc<dyn FileSystemService>) -> Self {
        Self {
            fs,
            cache: DashMap::new(),
        }
    }

    /// Entry point preference: module, then browser, then main, then index
    async fn resolve_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        let package_json = read_package_json(&self.fs, &package_dir.join("package.json")).await;

        if let Some(pkg) = &package_json {
            if let Some(module) = &pkg.module {
                if let Some(entry) = self.resolve_as_file(&package_dir.join(module)) {
                    return Some(entry);
                }
            }
            if let Some(BrowserField::String(browser)) = &pkg.browser {
                if let Some(entry) = self.resolve_as_file(&package_dir.join(browser)) {
                    return Some(entry);
                }
            }
            if let Some(main) = &pkg.main {
                if let Some(entry) = self.resolve_as_file(&package_dir.join(main)) {
                    return Some(entry);
                }
            }
        }

        self.resolve_as_file(&package_dir.join("index"))
    }

    fn resolve_as_file(&self, path: &Path) -> Option<PathBuf> {
        if self.fs.file_exists(path) {
            return Some(path.to_path_buf());
        }

        for ext in &["js", "mjs", "cjs", "jsx", "json"] {
            let with_ext = path.with_extension(ext);
            if self.fs.file_exists(&with_ext) {
                return Some(with_ext);
            }
        }

        None
    }

    async fn copy_package(
        &self,
        package: &str,
        package_dir: &Path,
        outdir: &Path,
    ) -> Result<ResolvedPackage> {
        let entry = match self.resolve_entry(package_dir).await {
            Some(entry) => entry,
            None => {
                // Installed but with no loadable entry, treat like missing
                return Err(KazeError::FileNotFound(format!(
                    "package {} has no resolvable entry point",
                    package
                )));
            }
        };

        let destination_root = outdir.join("node_modules").join(package);
        for file in self.fs.walk_files(package_dir).await? {
            let rel = file.strip_prefix(package_dir).map_err(|_| {
                KazeError::InvalidPath(format!("{} escaped its package", file.display()))
            })?;
            self.fs.copy_file(&file, &destination_root.join(rel)).await?;
        }

        let entry_rel = entry.strip_prefix(package_dir).map_err(|_| {
            KazeError::InvalidPath(format!("{} escaped its package", entry.display()))
        })?;

        Ok(ResolvedPackage {
            name: package.to_string(),
            url: format!("/node_modules/{}/{}", package, forward_slashes(entry_rel)),
            shimmed: false,
        })
    }

    async fn write_shim(
        &self,
        package: &str,
        named_bindings: &BTreeSet<String>,
        outdir: &Path,
    ) -> Result<ResolvedPackage> {
        let shim_path = outdir.join("node_modules").join(package).join("index.js");
        self.fs
            .write_file(&shim_path, &shim_source(package, named_bindings))
            .await?;

        Ok(ResolvedPackage {
            name: package.to_string(),
            url: format!("/node_modules/{}/index.js", package),
            shimmed: true,
        })
    }
}

#[async_trait::async_trait]
impl PackageResolver for NodePackageResolver {
    async fn materialize(
        &self,
        package: &str,
        named_bindings: &BTreeSet<String>,
        project_root: &Path,
        outdir: &Path,
    ) -> Result<ResolvedPackage> {
        if let Some(cached) = self.cache.get(package) {
            return Ok(cached.value().clone());
        }

        let package_dir = project_root.join("node_modules").join(package);
        let resolved = if self.fs.dir_exists(&package_dir) {
            match self.copy_package(package, &package_dir, outdir).await {
                Ok(resolved) => resolved,
                Err(KazeError::FileNotFound(reason)) => {
                    debug!("{}, shimming instead", reason);
                    self.write_shim(package, named_bindings, outdir).await?
                }
                Err(err) => return Err(err),
            }
        } else {
            self.write_shim(package, named_bindings, outdir).await?
        };

        self.cache.insert(package.to_string(), resolved.clone());
        Ok(resolved)
    }
}

fn forward_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// A callable, property-safe stand-in that satisfies default, named and
/// namespace imports without ever throwing at load time
fn shim_source(package: &str, named_bindings: &BTreeSet<String>) -> String {
    let mut source = format!(
        "// kaze shim: package \"{name}\" is not installed\n\
         const shim = new Proxy(function kazeShim() {{}}, {{\n\
         \x20 get: (target, prop) => (prop === \"__kazeShim\" ? true : shim),\n\
         \x20 apply: () => shim,\n\
         \x20 construct: () => shim,\n\
         }});\n\
         console.warn('[kaze] \"{name}\" is not installed, using a shim');\n\
         export default shim;\n",
        name = package
    );

    for binding in named_bindings {
        if binding != "default" && is_valid_identifier(binding) {
            source.push_str(&format!("export const {} = shim;\n", binding));
        }
    }

    source
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::TokioFileSystemService;
    use tempfile::tempdir;

    fn resolver() -> NodePackageResolver {
        NodePackageResolver::new(Arc::new(TokioFileSystemService))
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_missing_package_gets_named_shim() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        let bindings: BTreeSet<String> = ["fire".to_string(), "cannon".to_string()]
            .into_iter()
            .collect();

        let resolved = resolver()
            .materialize("confetti", &bindings, project.path(), out.path())
            .await
            .unwrap();

        assert!(resolved.shimmed);
        assert_eq!(resolved.url, "/node_modules/confetti/index.js");

        let shim = std::fs::read_to_string(out.path().join("node_modules/confetti/index.js"))
            .unwrap();
        assert!(shim.contains("export default shim;"));
        assert!(shim.contains("export const fire = shim;"));
        assert!(shim.contains("export const cannon = shim;"));
    }

    #[tokio::test]
    async fn test_installed_package_is_copied() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(
            project.path(),
            "node_modules/left-pad/package.json",
            r#"{ "name": "left-pad", "main": "index.js" }"#,
        );
        write(
            project.path(),
            "node_modules/left-pad/index.js",
            "export default (s, n) => String(s).padStart(n);",
        );

        let resolved = resolver()
            .materialize("left-pad", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();

        assert!(!resolved.shimmed);
        assert_eq!(resolved.url, "/node_modules/left-pad/index.js");
        assert!(out.path().join("node_modules/left-pad/index.js").is_file());
        assert!(out
            .path()
            .join("node_modules/left-pad/package.json")
            .is_file());
    }

    #[tokio::test]
    async fn test_module_field_preferred_over_main() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(
            project.path(),
            "node_modules/dayjs/package.json",
            r#"{ "name": "dayjs", "main": "cjs/index.js", "module": "esm/index.mjs" }"#,
        );
        write(project.path(), "node_modules/dayjs/cjs/index.js", "");
        write(project.path(), "node_modules/dayjs/esm/index.mjs", "");

        let resolved = resolver()
            .materialize("dayjs", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();

        assert_eq!(resolved.url, "/node_modules/dayjs/esm/index.mjs");
    }

    #[tokio::test]
    async fn test_scoped_package_shim_path() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();

        let resolved = resolver()
            .materialize("@tabler/icons", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();

        assert!(resolved.shimmed);
        assert_eq!(resolved.url, "/node_modules/@tabler/icons/index.js");
        assert!(out
            .path()
            .join("node_modules/@tabler/icons/index.js")
            .is_file());
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        let resolver = resolver();

        let first = resolver
            .materialize("confetti", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();
        let second = resolver
            .materialize("confetti", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_package_without_entry_falls_back_to_shim() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(
            project.path(),
            "node_modules/weird/package.json",
            r#"{ "name": "weird", "main": "does/not/exist.js" }"#,
        );

        let resolved = resolver()
            .materialize("weird", &BTreeSet::new(), project.path(), out.path())
            .await
            .unwrap();

        assert!(resolved.shimmed);
    }
}
