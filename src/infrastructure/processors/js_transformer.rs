use crate::core::{interfaces::ModuleTransformer, models::*};
use crate::infrastructure::processors::import_rewriter::ImportRewriter;
use crate::utils::{ErrorContext, KazeError, Result};
use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc_mangler::MangleOptions;
use oxc_minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxRuntime, TransformOptions, Transformer};
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Import prepended to modules that call the JSX runtime without loading it
const CANONICAL_RUNTIME_IMPORT: &str =
    "import { jsx, jsxs, Fragment } from \"kaze/jsx-runtime\";";

static JSX_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b_?jsx(?:s|DEV)?(?:_[0-9A-Za-z]+)?\s*\(").expect("Invalid JSX call regex")
});

static DEV_HELPER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bjsxDEV(?:_[0-9A-Za-z]+)?\b").expect("Invalid dev helper regex")
});

static HASHED_HELPER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(jsxs|jsx|Fragment)_[0-9A-Za-z]+\b").expect("Invalid hashed helper regex")
});

/// Transforms one source module into browser ESM: transpile with oxc,
/// inject the JSX runtime import when it is missing, normalize mangled
/// runtime helper names, then rewrite import specifiers.
pub struct OxcModuleTransformer {
    rewriter: ImportRewriter,
    minify: bool,
}

impl OxcModuleTransformer {
    pub fn new(minify: bool) -> Self {
        Self {
            rewriter: ImportRewriter::new(),
            minify,
        }
    }

    fn transpile(&self, source_text: &str, path: &Path) -> Result<String> {
        let allocator = Allocator::default();
        let source_type = source_type_for(path);

        let ret = Parser::new(&allocator, source_text, source_type).parse();
        if !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            let snippet: String = source_text
                .lines()
                .take(5)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(KazeError::parse_with_context(
                message,
                ErrorContext::new()
                    .with_file(path.to_path_buf())
                    .with_snippet(snippet),
            ));
        }

        let mut program = ret.program;
        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();

        let mut options = TransformOptions::default();
        options.jsx.runtime = JsxRuntime::Automatic;
        options.jsx.import_source = Some("kaze".to_string());
        options.jsx.development = false;

        let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
        if !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(KazeError::parse_with_context(
                message,
                ErrorContext::new().with_file(path.to_path_buf()),
            ));
        }

        Ok(Codegen::new().build(&program).code)
    }

    fn minify_code(&self, source: &str) -> Result<String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
        if !ret.errors.is_empty() {
            return Err(KazeError::parse(
                "minifier could not re-parse transformed output".to_string(),
            ));
        }

        let mut program = ret.program;
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        let ret = Minifier::new(options).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code;
        Ok(code)
    }

    fn error_result(
        &self,
        source: &SourceFile,
        message: String,
        mut diagnostics: Vec<Diagnostic>,
    ) -> TransformResult {
        diagnostics.push(Diagnostic::warning(
            format!("transform failed: {}", message),
            Some(source.path.clone()),
        ));
        TransformResult {
            source: source.clone(),
            code: error_component(source, &message),
            used_packages: Default::default(),
            package_bindings: Default::default(),
            css_imports: Vec::new(),
            diagnostics,
        }
    }
}

impl ModuleTransformer for OxcModuleTransformer {
    fn transform(&self, source: &SourceFile, project_root: &Path) -> TransformResult {
        debug!("transforming {}", source.rel_path.display());

        let source_text = match std::fs::read_to_string(&source.path) {
            Ok(text) => text,
            Err(err) => {
                return self.error_result(source, format!("could not read file: {}", err), vec![])
            }
        };

        let transpiled = match self.transpile(&source_text, &source.path) {
            Ok(code) => code,
            Err(err) => return self.error_result(source, err.to_string(), vec![]),
        };

        let injected = inject_runtime_import(transpiled);
        let normalized = normalize_runtime_identifiers(&injected);
        let outcome = self.rewriter.rewrite(&normalized, source, project_root);

        let mut diagnostics = Vec::new();
        let mut code = outcome.code;
        if self.minify {
            match self.minify_code(&code) {
                Ok(minified) => code = minified,
                Err(err) => diagnostics.push(Diagnostic::warning(
                    format!("minification skipped: {}", err),
                    Some(source.path.clone()),
                )),
            }
        }

        TransformResult {
            source: source.clone(),
            code,
            used_packages: outcome.used_packages,
            package_bindings: outcome.package_bindings,
            css_imports: outcome.css_imports,
            diagnostics,
        }
    }
}

fn source_type_for(path: &Path) -> SourceType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsx") => SourceType::mjs().with_typescript(true).with_jsx(true),
        Some("ts") => SourceType::mjs().with_typescript(true),
        Some("jsx") => SourceType::mjs().with_jsx(true),
        _ => SourceType::mjs(),
    }
}

/// Step 2: modules calling jsx helpers without importing the runtime get
/// the canonical import prepended
fn inject_runtime_import(code: String) -> String {
    let calls_runtime = JSX_CALL_RE.is_match(&code);
    let imports_runtime =
        code.contains("kaze/jsx-runtime") || code.contains("/kaze/jsx-runtime.js");

    if calls_runtime && !imports_runtime {
        format!("{}\n{}", CANONICAL_RUNTIME_IMPORT, code)
    } else {
        code
    }
}

/// Step 3: hashed or dev-suffixed helper names collapse back to the
/// canonical runtime exports so every module calls the same functions
fn normalize_runtime_identifiers(code: &str) -> String {
    let devless = DEV_HELPER_RE.replace_all(code, "jsx");
    HASHED_HELPER_RE.replace_all(&devless, "$1").into_owned()
}

fn error_component(source: &SourceFile, message: &str) -> String {
    let file_json = serde_json::to_string(&source.rel_path.to_string_lossy())
        .unwrap_or_else(|_| "\"unknown\"".to_string());
    let message_json =
        serde_json::to_string(message).unwrap_or_else(|_| "\"transform failed\"".to_string());

    format!(
        "import {{ jsx }} from \"/kaze/jsx-runtime.js\";\n\
         const file = {file};\n\
         const message = {message};\n\
         export default function TransformError() {{\n\
         \x20 return jsx(\"div\", {{\n\
         \x20   style: \"padding:1rem;border:2px solid #f87171;border-radius:8px;background:#fef2f2;color:#991b1b;font-family:monospace\",\n\
         \x20   children: \"Failed to transform \" + file + \": \" + message\n\
         \x20 }});\n\
         }}\n",
        file = file_json,
        message = message_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) -> SourceFile {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        SourceFile::new(path, root, SourceKind::Component).unwrap()
    }

    #[test]
    fn test_tsx_transpiles_to_runtime_calls() {
        let temp = tempdir().unwrap();
        let source = write(
            temp.path(),
            "app/page.tsx",
            "type Props = { name: string };\nexport default function Home({ name }: Props) {\n  return <h1 className=\"title\">Hello {name}</h1>;\n}\n",
        );

        let result = OxcModuleTransformer::new(false).transform(&source, temp.path());

        assert!(result.diagnostics.is_empty());
        assert!(result.code.contains("_jsx"));
        assert!(result.code.contains("/kaze/jsx-runtime.js"));
        assert!(!result.code.contains("type Props"));
        assert!(!result.code.contains(": Props"));
    }

    #[test]
    fn test_manual_jsx_calls_get_runtime_import() {
        let temp = tempdir().unwrap();
        let source = write(
            temp.path(),
            "lib/widget.js",
            "export default function Widget() {\n  return jsx(\"div\", { children: \"hi\" });\n}\n",
        );

        let result = OxcModuleTransformer::new(false).transform(&source, temp.path());

        assert!(result.diagnostics.is_empty());
        assert!(result.code.contains("/kaze/jsx-runtime.js"));
        assert!(result.code.contains("jsx(\"div\""));
    }

    #[test]
    fn test_module_without_jsx_gets_no_runtime_import() {
        let temp = tempdir().unwrap();
        let source = write(
            temp.path(),
            "lib/math.ts",
            "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
        );

        let result = OxcModuleTransformer::new(false).transform(&source, temp.path());

        assert!(result.diagnostics.is_empty());
        assert!(!result.code.contains("jsx-runtime"));
    }

    #[test]
    fn test_hashed_dev_helpers_are_normalized() {
        let code = "jsxDEV_7x81h0kn(\"div\", {}, void 0, false);\njsxs_9ab3cd(\"p\", {});";
        let normalized = normalize_runtime_identifiers(code);

        assert!(normalized.contains("jsx(\"div\""));
        assert!(normalized.contains("jsxs(\"p\""));
        assert!(!normalized.contains("jsxDEV_"));
        assert!(!normalized.contains("jsxs_9ab3cd"));
    }

    #[test]
    fn test_syntax_error_yields_loadable_placeholder() {
        let temp = tempdir().unwrap();
        let source = write(
            temp.path(),
            "components/Broken.tsx",
            "export default function Broken( {\n  return <div>;\n",
        );

        let result = OxcModuleTransformer::new(false).transform(&source, temp.path());

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
        assert!(result.code.contains("TransformError"));
        assert!(result.code.contains("/kaze/jsx-runtime.js"));
        assert!(result.code.contains("components/Broken.tsx"));
    }

    #[test]
    fn test_css_and_package_imports_propagate() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("components")).unwrap();
        std::fs::write(temp.path().join("components/card.css"), ".card {}").unwrap();
        let source = write(
            temp.path(),
            "components/Card.tsx",
            "import \"./card.css\";\nimport dayjs from \"dayjs\";\nexport default function Card() {\n  return <div>{dayjs().format()}</div>;\n}\n",
        );

        let result = OxcModuleTransformer::new(false).transform(&source, temp.path());

        assert!(result.used_packages.contains("dayjs"));
        assert_eq!(result.css_imports.len(), 1);
        assert!(!result.code.contains("card.css"));
    }

    #[test]
    fn test_minified_output_is_smaller() {
        let temp = tempdir().unwrap();
        let content = "export default function Home() {\n  const greeting = \"hello world\";\n  const shout = greeting.toUpperCase();\n  return <h1>{shout}</h1>;\n}\n";
        let source = write(temp.path(), "app/page.tsx", content);

        let readable = OxcModuleTransformer::new(false).transform(&source, temp.path());
        let minified = OxcModuleTransformer::new(true).transform(&source, temp.path());

        assert!(minified.code.len() < readable.code.len());
        assert!(minified.code.contains("/kaze/jsx-runtime.js"));
    }
}
