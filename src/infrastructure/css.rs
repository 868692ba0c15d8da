use crate::core::interfaces::{CssOutput, CssPipeline, FileSystemService};
use crate::utils::{KazeError, Logger, Result};
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{ParserOptions as CssParserOptions, StyleSheet},
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Served when Tailwind is unavailable or fails, so pages always have a
/// usable baseline of utilities
const FALLBACK_CSS: &str = "\
/* kaze fallback stylesheet */
*, *::before, *::after { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, sans-serif; line-height: 1.5; }
img, video { max-width: 100%; height: auto; }
.container { max-width: 1100px; margin: 0 auto; padding: 0 1rem; }
.flex { display: flex; }
.grid { display: grid; }
.hidden { display: none; }
.items-center { align-items: center; }
.justify-center { justify-content: center; }
.text-center { text-align: center; }
.font-bold { font-weight: 700; }
.m-0 { margin: 0; }
.mx-auto { margin-left: auto; margin-right: auto; }
.p-4 { padding: 1rem; }
.rounded { border-radius: 0.375rem; }
.shadow { box-shadow: 0 1px 3px rgba(0, 0, 0, 0.2); }
";

/// Where the Tailwind entry stylesheet conventionally lives
const TAILWIND_INPUT_CANDIDATES: &[&str] = &[
    "app/globals.css",
    "app/global.css",
    "styles/globals.css",
];

const DEFAULT_TAILWIND_INPUT: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

/// Locates and shells out to the Tailwind CLI. The whole interaction is
/// bounded by a timeout so a wedged process never hangs the build.
pub struct TailwindCli {
    binary: Option<PathBuf>,
}

impl TailwindCli {
    pub fn detect(project_root: &Path) -> Self {
        let local = project_root.join("node_modules/.bin/tailwindcss");
        let binary = if local.is_file() {
            Some(local)
        } else {
            which::which("tailwindcss").ok()
        };
        Self { binary }
    }

    /// A cli that never runs, used when Tailwind should be bypassed
    pub fn disabled() -> Self {
        Self { binary: None }
    }

    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    pub fn input_path(&self, project_root: &Path) -> Option<PathBuf> {
        TAILWIND_INPUT_CANDIDATES
            .iter()
            .map(|candidate| project_root.join(candidate))
            .find(|path| path.is_file())
    }

    pub async fn process(
        &self,
        project_root: &Path,
        minify: bool,
        timeout_ms: u64,
    ) -> Result<String> {
        let binary = self.binary.as_ref().ok_or_else(|| {
            KazeError::CssProcessing("tailwindcss binary not found".to_string())
        })?;

        let temp_dir = std::env::temp_dir();
        let output_path = temp_dir.join(format!("kaze-tailwind-{}.css", std::process::id()));
        let generated_input = temp_dir.join(format!("kaze-tailwind-{}-input.css", std::process::id()));

        let input_path = match self.input_path(project_root) {
            Some(path) => path,
            None => {
                tokio::fs::write(&generated_input, DEFAULT_TAILWIND_INPUT)
                    .await
                    .map_err(KazeError::Io)?;
                generated_input.clone()
            }
        };

        let mut command = Command::new(binary);
        command
            .current_dir(project_root)
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if minify {
            command.arg("--minify");
        }

        let child = command.spawn().map_err(KazeError::Io)?;
        let output = timeout(Duration::from_millis(timeout_ms), child.wait_with_output())
            .await
            .map_err(|_| KazeError::Timeout(timeout_ms))?
            .map_err(KazeError::Io)?;

        let _ = tokio::fs::remove_file(&generated_input).await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(KazeError::CssProcessing(format!(
                "tailwindcss exited with {}: {}",
                output.status, stderr
            )));
        }

        let css = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(KazeError::Io)?;
        let _ = tokio::fs::remove_file(&output_path).await;
        Ok(css)
    }
}

/// Produces the single output stylesheet: Tailwind (or the fallback
/// baseline) first, then every collected project stylesheet run through
/// lightningcss.
pub struct KazeCssPipeline {
    fs: Arc<dyn FileSystemService>,
    tailwind: TailwindCli,
    timeout_ms: u64,
}

impl KazeCssPipeline {
    pub fn new(fs: Arc<dyn FileSystemService>, tailwind: TailwindCli, timeout_ms: u64) -> Self {
        Self {
            fs,
            tailwind,
            timeout_ms,
        }
    }

    fn process_css(&self, content: &str, path: &Path, minify: bool) -> (String, Option<String>) {
        match StyleSheet::parse(content, CssParserOptions::default()) {
            Ok(stylesheet) => match stylesheet.to_css(PrinterOptions {
                minify,
                ..Default::default()
            }) {
                Ok(result) => (result.code, None),
                Err(err) => (
                    fallback_minify(content, minify),
                    Some(format!("css printing failed for {}: {}", path.display(), err)),
                ),
            },
            Err(err) => (
                fallback_minify(content, minify),
                Some(format!("css parse error in {}: {}", path.display(), err)),
            ),
        }
    }
}

#[async_trait::async_trait]
impl CssPipeline for KazeCssPipeline {
    async fn build_stylesheet(
        &self,
        entries: &[PathBuf],
        project_root: &Path,
        minify: bool,
    ) -> Result<CssOutput> {
        let mut warnings = Vec::new();
        let mut code = String::new();
        let mut consumed_by_tailwind = None;

        if self.tailwind.is_available() {
            match self.tailwind.process(project_root, minify, self.timeout_ms).await {
                Ok(tailwind_css) => {
                    code.push_str(&tailwind_css);
                    if !code.ends_with('\n') {
                        code.push('\n');
                    }
                    consumed_by_tailwind = self.tailwind.input_path(project_root);
                }
                Err(err) => {
                    warnings.push(format!(
                        "tailwind failed ({}), using fallback stylesheet",
                        err
                    ));
                    code.push_str(FALLBACK_CSS);
                }
            }
        } else {
            Logger::tailwind_unavailable();
            code.push_str(FALLBACK_CSS);
        }

        for entry in entries {
            if consumed_by_tailwind.as_deref() == Some(entry.as_path()) {
                continue;
            }
            if !self.fs.file_exists(entry) {
                warnings.push(format!("stylesheet {} not found, skipped", entry.display()));
                continue;
            }

            let content = match self.fs.read_file(entry).await {
                Ok(content) => content,
                Err(err) => {
                    warnings.push(format!(
                        "could not read stylesheet {}: {}",
                        entry.display(),
                        err
                    ));
                    continue;
                }
            };

            let label = entry
                .strip_prefix(project_root)
                .unwrap_or(entry.as_path())
                .to_string_lossy()
                .replace('\\', "/");
            let (processed, warning) = self.process_css(&content, entry, minify);
            if let Some(warning) = warning {
                warnings.push(warning);
            }

            code.push_str(&format!("/* {} */\n", label));
            code.push_str(&processed);
            if !code.ends_with('\n') {
                code.push('\n');
            }
        }

        Ok(CssOutput { code, warnings })
    }
}

fn fallback_minify(content: &str, minify: bool) -> String {
    if minify {
        content
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("")
    } else {
        content.to_string()
    }
}
