use crate::utils::{KazeError, Result};
use std::path::Path;

/// File names every kaze distribution must ship under the runtime directory
pub const RUNTIME_FILE_NAMES: [&str; 3] = ["jsx-runtime.js", "hooks.js", "router.js"];

const EMBEDDED_JSX_RUNTIME: &str = include_str!("../../runtime/jsx-runtime.js");
const EMBEDDED_HOOKS: &str = include_str!("../../runtime/hooks.js");
const EMBEDDED_ROUTER: &str = include_str!("../../runtime/router.js");

/// The framework runtime files emitted into the output's `kaze/` directory.
///
/// By default they come embedded in the binary; a configured `runtime_dir`
/// replaces them for framework development, and an override directory that
/// is missing any required file is a structural error.
#[derive(Debug, Clone)]
pub struct RuntimeAssets {
    files: Vec<(String, String)>,
}

impl RuntimeAssets {
    pub fn load(override_dir: Option<&Path>) -> Result<Self> {
        match override_dir {
            Some(dir) => Self::load_from_dir(dir),
            None => Ok(Self::embedded()),
        }
    }

    pub fn embedded() -> Self {
        Self {
            files: vec![
                ("jsx-runtime.js".to_string(), EMBEDDED_JSX_RUNTIME.to_string()),
                ("hooks.js".to_string(), EMBEDDED_HOOKS.to_string()),
                ("router.js".to_string(), EMBEDDED_ROUTER.to_string()),
            ],
        }
    }

    fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for name in RUNTIME_FILE_NAMES {
            let path = dir.join(name);
            let content = std::fs::read_to_string(&path).map_err(|_| {
                KazeError::structural(format!(
                    "runtime file {} missing from {}",
                    name,
                    dir.display()
                ))
            })?;
            files.push((name.to_string(), content));
        }
        Ok(Self { files })
    }

    /// (file name, content) pairs in emission order
    pub fn files(&self) -> &[(String, String)] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_assets_cover_all_runtime_files() {
        let assets = RuntimeAssets::embedded();
        let names: Vec<&str> = assets.files().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, RUNTIME_FILE_NAMES);
        assert!(assets.files().iter().all(|(_, content)| !content.is_empty()));
    }

    #[test]
    fn test_override_dir_missing_file_is_structural() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("jsx-runtime.js"), "export const jsx = 1;").unwrap();
        std::fs::write(temp.path().join("hooks.js"), "export const useState = 1;").unwrap();
        // router.js deliberately absent

        let result = RuntimeAssets::load(Some(temp.path()));
        assert!(matches!(result, Err(KazeError::Structural { .. })));
    }

    #[test]
    fn test_override_dir_replaces_embedded_content() {
        let temp = tempdir().unwrap();
        for name in RUNTIME_FILE_NAMES {
            std::fs::write(temp.path().join(name), format!("// custom {}", name)).unwrap();
        }

        let assets = RuntimeAssets::load(Some(temp.path())).unwrap();
        assert!(assets.files()[0].1.contains("custom jsx-runtime.js"));
    }
}
