use crate::core::{
    interfaces::{CssPipeline, FileSystemService, PackageResolver},
    models::*,
};
use crate::infrastructure::runtime::RuntimeAssets;
use crate::utils::{Result, Timer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Bootstrap script template, rendered from structured route data.
/// `__KAZE_ROUTE_TABLE__` is the only substitution point; everything the
/// bundle does beyond that lives in the router runtime module.
const APP_BUNDLE_TEMPLATE: &str = "\
// kaze app bundle (template v1)
import { createRouter } from \"/kaze/router.js\";

const routes = __KAZE_ROUTE_TABLE__;

const router = createRouter(routes);
router.mount(document.getElementById(\"root\"));
";

const HTML_SHELL_TEMPLATE: &str = "\
<!DOCTYPE html>
<html lang=\"en\">
  <head>
    <meta charset=\"UTF-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />
    <title>kaze app</title>
__FAVICON_LINK__    <link rel=\"stylesheet\" href=\"__STYLES_URL__\" />
    <script type=\"importmap\">
__IMPORT_MAP__
    </script>
  </head>
  <body>
    <div id=\"root\"></div>
    <script type=\"module\" src=\"/app.js\"></script>
  </body>
</html>
";

/// Everything the assembly phase consumes, produced by the earlier phases
pub struct AssemblyInputs<'a> {
    pub routes: &'a [Route],
    pub transforms: &'a [TransformResult],
    /// External package name -> named bindings requested from it
    pub packages: BTreeMap<String, BTreeSet<String>>,
    /// Project stylesheets plus the CSS imports stripped during transform
    pub stylesheets: Vec<PathBuf>,
    pub public_assets: &'a [PathBuf],
}

pub struct AssemblyOutput {
    /// Top-level generated files, for the completion summary
    pub output_files: Vec<OutputFile>,
    pub warnings: Vec<String>,
    pub asset_count: usize,
}

/// Writes the complete output tree: mirrored modules, the framework
/// runtime directory, materialized packages, the stylesheet, the app
/// bundle and the HTML shell.
///
/// Given an unchanged source tree the output is byte-identical across
/// builds; the only cache-busting token is a content hash in the
/// stylesheet URL.
pub struct OutputAssembler {
    fs: Arc<dyn FileSystemService>,
    resolver: Arc<dyn PackageResolver>,
    css: Arc<dyn CssPipeline>,
}

impl OutputAssembler {
    pub fn new(
        fs: Arc<dyn FileSystemService>,
        resolver: Arc<dyn PackageResolver>,
        css: Arc<dyn CssPipeline>,
    ) -> Self {
        Self { fs, resolver, css }
    }

    pub async fn assemble(
        &self,
        inputs: AssemblyInputs<'_>,
        runtime: &RuntimeAssets,
        options: &BuildOptions,
    ) -> Result<AssemblyOutput> {
        let _timer = Timer::start("output assembly");
        let outdir = &options.outdir;
        let mut warnings = Vec::new();
        let mut asset_count = 0;

        // Per-file write targets are unique, so module writes may proceed
        // in parallel
        let module_writes = inputs.transforms.iter().map(|transform| {
            let path = outdir.join(transform.source.output_rel_path());
            async move { self.fs.write_file(&path, &transform.code).await }
        });
        for write in futures::future::join_all(module_writes).await {
            write?;
        }

        for (name, content) in runtime.files() {
            self.fs
                .write_file(&outdir.join("kaze").join(name), content)
                .await?;
            asset_count += 1;
        }

        let import_map = self
            .materialize_packages(&inputs, options, &mut warnings)
            .await?;

        let (styles_url, css_size) = self
            .write_stylesheet(&inputs, options, &mut warnings)
            .await?;
        asset_count += 1;

        let app_bundle = render_app_bundle(inputs.routes)?;
        self.fs
            .write_file(&outdir.join("app.js"), &app_bundle)
            .await?;
        asset_count += 1;

        let html = render_html_shell(&import_map, &styles_url, inputs.public_assets)?;
        self.fs
            .write_file(&outdir.join("index.html"), &html)
            .await?;
        asset_count += 1;

        // public/ contents land at the output root, favicon included
        let public_root = options.project_root.join("public");
        for asset in inputs.public_assets {
            let Ok(rel) = asset.strip_prefix(&public_root) else {
                continue;
            };
            self.fs.copy_file(asset, &outdir.join(rel)).await?;
            asset_count += 1;
        }

        Ok(AssemblyOutput {
            output_files: vec![
                OutputFile {
                    path: outdir.join("index.html"),
                    size: html.len(),
                },
                OutputFile {
                    path: outdir.join("app.js"),
                    size: app_bundle.len(),
                },
                OutputFile {
                    path: outdir.join("styles.css"),
                    size: css_size,
                },
            ],
            warnings,
            asset_count,
        })
    }

    /// One resolver call per distinct package name; shims surface as
    /// warnings, copies as import-map entries either way
    async fn materialize_packages(
        &self,
        inputs: &AssemblyInputs<'_>,
        options: &BuildOptions,
        warnings: &mut Vec<String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut import_map = BTreeMap::new();
        import_map.insert("kaze".to_string(), "/kaze/hooks.js".to_string());
        import_map.insert(
            "kaze/jsx-runtime".to_string(),
            "/kaze/jsx-runtime.js".to_string(),
        );
        import_map.insert(
            "kaze/jsx-dev-runtime".to_string(),
            "/kaze/jsx-runtime.js".to_string(),
        );
        import_map.insert("kaze/router".to_string(), "/kaze/router.js".to_string());

        for (package, bindings) in &inputs.packages {
            debug!("materializing package {}", package);
            let resolved = self
                .resolver
                .materialize(package, bindings, &options.project_root, &options.outdir)
                .await?;
            if resolved.shimmed {
                warnings.push(format!(
                    "package \"{}\" is not installed, emitted a shim",
                    package
                ));
            }
            import_map.insert(resolved.name, resolved.url);
        }

        Ok(import_map)
    }

    async fn write_stylesheet(
        &self,
        inputs: &AssemblyInputs<'_>,
        options: &BuildOptions,
        warnings: &mut Vec<String>,
    ) -> Result<(String, usize)> {
        let output = self
            .css
            .build_stylesheet(&inputs.stylesheets, &options.project_root, options.minify)
            .await?;
        warnings.extend(output.warnings);

        self.fs
            .write_file(&options.outdir.join("styles.css"), &output.code)
            .await?;

        // Content-hash token: unchanged CSS keeps the URL stable, changed
        // CSS busts caches
        let hash = blake3::hash(output.code.as_bytes()).to_hex();
        let url = format!("/styles.css?v={}", &hash.as_str()[..8]);
        Ok((url, output.code.len()))
    }
}

fn render_app_bundle(routes: &[Route]) -> Result<String> {
    let table: Vec<RouteTableEntry> = routes.iter().map(RouteTableEntry::from).collect();
    let json = serde_json::to_string_pretty(&table)?;
    Ok(APP_BUNDLE_TEMPLATE.replace("__KAZE_ROUTE_TABLE__", &json))
}

fn render_html_shell(
    import_map: &BTreeMap<String, String>,
    styles_url: &str,
    public_assets: &[PathBuf],
) -> Result<String> {
    let mut imports = serde_json::Map::new();
    for (name, url) in import_map {
        imports.insert(name.clone(), serde_json::Value::String(url.clone()));
    }
    let map_json = serde_json::to_string_pretty(&serde_json::json!({ "imports": imports }))?;

    let favicon_link = public_assets
        .iter()
        .find_map(|asset| {
            let name = asset.file_name()?.to_string_lossy().to_string();
            name.starts_with("favicon.").then(|| {
                format!("    <link rel=\"icon\" href=\"/{}\" />\n", name)
            })
        })
        .unwrap_or_default();

    Ok(HTML_SHELL_TEMPLATE
        .replace("__FAVICON_LINK__", &favicon_link)
        .replace("__STYLES_URL__", styles_url)
        .replace("__IMPORT_MAP__", &map_json))
}
