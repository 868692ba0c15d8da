use crate::core::{
    interfaces::{FileSystemService, RouteDiscovery},
    models::*,
};
use crate::utils::{KazeError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds the route list from the file-system layout under `app/` and,
/// when present, `app/pages/`.
///
/// Each directory contributes a route when it holds a `page.*` file and a
/// layout chain entry when it holds a `layout.*` file. Layout chains are
/// threaded parent to child by value, so sibling branches never observe
/// each other's layouts.
pub struct RouteTreeBuilder {
    fs: Arc<dyn FileSystemService>,
}

impl RouteTreeBuilder {
    pub fn new(fs: Arc<dyn FileSystemService>) -> Self {
        Self { fs }
    }

    /// First matching extension wins, in SOURCE_EXTENSIONS priority order
    fn detect_route_file(&self, dir: &Path, stem: &str) -> Option<PathBuf> {
        for ext in SOURCE_EXTENSIONS {
            let candidate = dir.join(format!("{}.{}", stem, ext));
            if self.fs.file_exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn url_for(dir: &Path, route_root: &Path) -> String {
        let rel = dir.strip_prefix(route_root).unwrap_or_else(|_| Path::new(""));
        let mut url = String::new();
        for component in rel.components() {
            url.push('/');
            url.push_str(&component.as_os_str().to_string_lossy());
        }
        if url.is_empty() {
            url.push('/');
        }
        url
    }

    async fn walk_root(
        &self,
        route_root: &Path,
        project_root: &Path,
        skip: Option<&Path>,
        routes: &mut BTreeMap<String, Route>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        let mut pending: Vec<(PathBuf, Vec<SourceFile>)> =
            vec![(route_root.to_path_buf(), Vec::new())];

        while let Some((dir, inherited)) = pending.pop() {
            // Unreadable directories are treated as absent
            let children = match self.fs.list_directory(&dir).await {
                Ok(children) => children,
                Err(_) => continue,
            };

            let mut chain = inherited;
            if let Some(layout_path) = self.detect_route_file(&dir, "layout") {
                chain.push(SourceFile::new(
                    layout_path,
                    project_root,
                    SourceKind::Layout,
                )?);
            }

            if let Some(page_path) = self.detect_route_file(&dir, "page") {
                let url = Self::url_for(&dir, route_root);
                let page = SourceFile::new(page_path, project_root, SourceKind::Page)?;

                if let Some(existing) = routes.get(&url) {
                    diagnostics.push(Diagnostic::warning(
                        format!(
                            "duplicate route {} from {}, keeping {}",
                            url,
                            page.rel_path.display(),
                            existing.page.rel_path.display()
                        ),
                        Some(page.path.clone()),
                    ));
                } else {
                    routes.insert(
                        url.clone(),
                        Route {
                            url_path: url,
                            page,
                            layout_chain: chain.clone(),
                        },
                    );
                }
            }

            for child in children {
                if skip == Some(child.as_path()) {
                    continue;
                }
                if !self.fs.dir_exists(&child) {
                    continue;
                }
                let name = child
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if name.starts_with('.') || name == "node_modules" {
                    continue;
                }
                pending.push((child, chain.clone()));
            }
        }

        Ok(())
    }

    /// More specific paths first, root always last, lexicographic tiebreak
    fn sort_routes(routes: &mut [Route]) {
        routes.sort_by(|a, b| match (a.url_path == "/", b.url_path == "/") {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => b
                .segment_count()
                .cmp(&a.segment_count())
                .then_with(|| a.url_path.cmp(&b.url_path)),
        });
    }
}

#[async_trait::async_trait]
impl RouteDiscovery for RouteTreeBuilder {
    async fn discover_routes(&self, project_root: &Path) -> Result<DiscoveredRoutes> {
        let app_root = project_root.join("app");
        if !self.fs.dir_exists(&app_root) {
            return Err(KazeError::structural(format!(
                "app directory not found at {}",
                app_root.display()
            )));
        }

        let pages_root = app_root.join("pages");
        let pages_active = self.fs.dir_exists(&pages_root);

        let mut by_url = BTreeMap::new();
        let mut diagnostics = Vec::new();

        // app/ and app/pages/ are independent roots; when both exist the
        // app/ walk leaves the pages subtree to its own walk so the same
        // page file never yields two URL paths.
        let skip = if pages_active {
            Some(pages_root.clone())
        } else {
            None
        };
        self.walk_root(
            &app_root,
            project_root,
            skip.as_deref(),
            &mut by_url,
            &mut diagnostics,
        )
        .await?;

        if pages_active {
            self.walk_root(&pages_root, project_root, None, &mut by_url, &mut diagnostics)
                .await?;
        }

        let mut routes: Vec<Route> = by_url.into_values().collect();
        Self::sort_routes(&mut routes);

        Ok(DiscoveredRoutes {
            routes,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::TokioFileSystemService;
    use tempfile::tempdir;

    fn builder() -> RouteTreeBuilder {
        RouteTreeBuilder::new(Arc::new(TokioFileSystemService))
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_about_route_sorts_before_root() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.tsx", "export default () => <h1>home</h1>");
        write(temp.path(), "app/about/page.tsx", "export default () => <h1>about</h1>");
        write(temp.path(), "app/about/layout.tsx", "export default (p) => p.children");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        let urls: Vec<&str> = discovered
            .routes
            .iter()
            .map(|r| r.url_path.as_str())
            .collect();

        assert_eq!(urls, vec!["/about", "/"]);
        assert_eq!(discovered.routes[0].layout_chain.len(), 1);
        assert!(discovered.routes[1].layout_chain.is_empty());
    }

    #[tokio::test]
    async fn test_route_count_matches_page_files() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.tsx", "");
        write(temp.path(), "app/blog/page.tsx", "");
        write(temp.path(), "app/blog/post/page.tsx", "");
        write(temp.path(), "app/contact/page.jsx", "");
        write(temp.path(), "app/contact/notes.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        assert_eq!(discovered.routes.len(), 4);
    }

    #[tokio::test]
    async fn test_extension_priority_prefers_tsx() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.js", "");
        write(temp.path(), "app/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        assert_eq!(discovered.routes.len(), 1);
        assert!(discovered.routes[0]
            .page
            .path
            .to_string_lossy()
            .ends_with("page.tsx"));
    }

    #[tokio::test]
    async fn test_layout_chain_is_outermost_first() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/layout.tsx", "");
        write(temp.path(), "app/docs/layout.tsx", "");
        write(temp.path(), "app/docs/guide/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        let route = &discovered.routes[0];
        assert_eq!(route.url_path, "/docs/guide");

        let chain: Vec<String> = route
            .layout_chain
            .iter()
            .map(|l| l.rel_path.to_string_lossy().to_string())
            .collect();
        assert_eq!(chain.len(), 2);
        assert!(chain[0].ends_with("app/layout.tsx") || chain[0] == "app/layout.tsx");
        assert!(chain[1].contains("docs"));
    }

    #[tokio::test]
    async fn test_sibling_layouts_are_isolated() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/a/layout.tsx", "");
        write(temp.path(), "app/a/page.tsx", "");
        write(temp.path(), "app/b/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        let route_b = discovered
            .routes
            .iter()
            .find(|r| r.url_path == "/b")
            .unwrap();
        assert!(route_b.layout_chain.is_empty());
    }

    #[tokio::test]
    async fn test_deeper_routes_sort_first() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.tsx", "");
        write(temp.path(), "app/a/page.tsx", "");
        write(temp.path(), "app/a/b/c/page.tsx", "");
        write(temp.path(), "app/z/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        let urls: Vec<&str> = discovered
            .routes
            .iter()
            .map(|r| r.url_path.as_str())
            .collect();
        assert_eq!(urls, vec!["/a/b/c", "/a", "/z", "/"]);
    }

    #[tokio::test]
    async fn test_pages_root_maps_to_top_level_urls() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.tsx", "");
        write(temp.path(), "app/pages/docs/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        let urls: Vec<&str> = discovered
            .routes
            .iter()
            .map(|r| r.url_path.as_str())
            .collect();
        assert_eq!(urls, vec!["/docs", "/"]);
    }

    #[tokio::test]
    async fn test_duplicate_route_keeps_first_and_warns() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/docs/page.tsx", "");
        write(temp.path(), "app/pages/docs/page.tsx", "");

        let discovered = builder().discover_routes(temp.path()).await.unwrap();
        assert_eq!(discovered.routes.len(), 1);
        assert!(discovered.routes[0]
            .page
            .rel_path
            .starts_with("app/docs"));
        assert_eq!(discovered.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_app_directory_is_structural() {
        let temp = tempdir().unwrap();
        let result = builder().discover_routes(temp.path()).await;
        assert!(matches!(result, Err(KazeError::Structural { .. })));
    }
}
