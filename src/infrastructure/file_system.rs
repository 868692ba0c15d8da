use crate::core::interfaces::FileSystemService;
use crate::core::models::{is_source_file, ProjectSources, SourceFile, SourceKind};
use crate::utils::{KazeError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Directories holding shared components outside the route tree
const COMPONENT_ROOTS: [&str; 2] = ["components", "lib"];

/// Directories whose stylesheets feed the output bundle even without an
/// import edge pointing at them
const STYLESHEET_ROOTS: [&str; 2] = ["app", "styles"];

/// Typed scan of everything the build consumes outside the route tree:
/// shared components, project stylesheets and public assets.
pub async fn scan_project(
    fs: &Arc<dyn FileSystemService>,
    project_root: &Path,
) -> Result<ProjectSources> {
    let mut sources = ProjectSources::default();

    for root in COMPONENT_ROOTS {
        let dir = project_root.join(root);
        if !fs.dir_exists(&dir) {
            continue;
        }
        for file in fs.walk_files(&dir).await? {
            if is_source_file(&file) {
                sources
                    .components
                    .push(SourceFile::new(file, project_root, SourceKind::Component)?);
            }
        }
    }

    for root in STYLESHEET_ROOTS {
        let dir = project_root.join(root);
        if !fs.dir_exists(&dir) {
            continue;
        }
        for file in fs.walk_files(&dir).await? {
            if file.extension().and_then(|e| e.to_str()) == Some("css") {
                sources.stylesheets.push(file);
            }
        }
    }

    let public_dir = project_root.join("public");
    if fs.dir_exists(&public_dir) {
        sources.public_assets = fs.walk_files(&public_dir).await?;
    }

    Ok(sources)
}

pub struct TokioFileSystemService;

#[async_trait::async_trait]
impl FileSystemService for TokioFileSystemService {
    async fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).await.map_err(KazeError::Io)
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(KazeError::Io)
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_bytes(path, content.as_bytes()).await
    }

    async fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_directory(parent).await?;
        }

        fs::write(path, content).await.map_err(KazeError::Io)
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.create_directory(parent).await?;
        }

        fs::copy(from, to).await.map_err(KazeError::Io)?;
        Ok(())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(KazeError::Io)
    }

    async fn clean_directory(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(KazeError::Io(err)),
        }
        self.create_directory(path).await
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path).await.map_err(KazeError::Io)?;
        let mut children = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(KazeError::Io)? {
            children.push(entry.path());
        }

        // read_dir order is OS-dependent
        children.sort();
        Ok(children)
    }

    async fn walk_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(KazeError::Io)?;

            while let Some(entry) = entries.next_entry().await.map_err(KazeError::Io)? {
                let entry_path = entry.path();
                let name = entry.file_name();
                let name = name.to_string_lossy();

                // Dotfiles and nested package installs never participate in a build
                if name.starts_with('.') || name == "node_modules" {
                    continue;
                }

                let file_type = entry.file_type().await.map_err(KazeError::Io)?;
                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if file_type.is_file() {
                    files.push(entry_path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio;

    #[tokio::test]
    async fn test_file_operations() {
        let fs_service = TokioFileSystemService;
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("test.txt");

        // Test write and read
        let content = "Hello, Kaze!";
        fs_service.write_file(&test_file, content).await.unwrap();

        let read_content = fs_service.read_file(&test_file).await.unwrap();
        assert_eq!(content, read_content);

        assert!(fs_service.file_exists(&test_file));
        assert!(!fs_service.file_exists(&temp_dir.path().join("missing.txt")));
    }

    #[tokio::test]
    async fn test_walk_skips_hidden_and_node_modules() {
        let fs_service = TokioFileSystemService;
        let temp_dir = tempdir().unwrap();

        fs_service
            .write_file(&temp_dir.path().join("a/one.tsx"), "export {}")
            .await
            .unwrap();
        fs_service
            .write_file(&temp_dir.path().join("a/b/two.css"), "body {}")
            .await
            .unwrap();
        fs_service
            .write_file(&temp_dir.path().join(".hidden/secret.js"), "")
            .await
            .unwrap();
        fs_service
            .write_file(&temp_dir.path().join("node_modules/pkg/index.js"), "")
            .await
            .unwrap();

        let files = fs_service.walk_files(temp_dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| {
            let s = f.to_string_lossy();
            !s.contains(".hidden") && !s.contains("node_modules")
        }));
    }

    #[tokio::test]
    async fn test_scan_project_classifies_sources() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let fs_service: Arc<dyn FileSystemService> = Arc::new(TokioFileSystemService);

        for (rel, content) in [
            ("components/Button.tsx", "export default () => <button />;"),
            ("components/notes.md", "not code"),
            ("lib/format.ts", "export const fmt = (s: string) => s;"),
            ("app/globals.css", "body { margin: 0 }"),
            ("styles/theme.css", ":root { --accent: teal }"),
            ("public/favicon.ico", ""),
            ("public/og.png", ""),
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        let sources = scan_project(&fs_service, root).await.unwrap();

        assert_eq!(sources.components.len(), 2);
        assert!(sources
            .components
            .iter()
            .all(|c| c.kind == SourceKind::Component));
        assert_eq!(sources.stylesheets.len(), 2);
        assert_eq!(sources.public_assets.len(), 2);
    }

    #[tokio::test]
    async fn test_clean_directory_resets_content() {
        let fs_service = TokioFileSystemService;
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("dist");

        fs_service
            .write_file(&target.join("stale.js"), "old")
            .await
            .unwrap();
        fs_service.clean_directory(&target).await.unwrap();

        assert!(fs_service.dir_exists(&target));
        assert!(!fs_service.file_exists(&target.join("stale.js")));

        // Cleaning a directory that does not exist yet creates it
        let fresh = temp_dir.path().join("fresh");
        fs_service.clean_directory(&fresh).await.unwrap();
        assert!(fs_service.dir_exists(&fresh));
    }
}
