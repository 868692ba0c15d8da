use crate::core::{interfaces::*, models::*};
use crate::infrastructure::{
    assembler::{AssemblyInputs, OutputAssembler},
    runtime::RuntimeAssets,
    scan_project,
};
use crate::utils::{
    CompletionStats, KazeError, KazeProfiler, KazeUI, Logger, OutputFileInfo, Result, Timer,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// The build orchestrator: sequences the phase machine
/// `Idle → Preparing → Discovering → Transforming → Assembling → Done`
/// and collects everything the phases report along the way.
///
/// Only structural problems (unwritable output directory, missing app
/// directory, missing runtime files, timeout) fail a build; per-file
/// trouble degrades to warnings on a successful report.
pub struct KazeBuildService {
    fs: Arc<dyn FileSystemService>,
    route_discovery: Arc<dyn RouteDiscovery>,
    analyzer: Arc<dyn DependencyAnalyzer>,
    transformer: Arc<dyn ModuleTransformer>,
    assembler: OutputAssembler,
    profiler: Arc<KazeProfiler>,
    phase: Mutex<BuildPhase>,
}

impl KazeBuildService {
    pub fn new(
        fs: Arc<dyn FileSystemService>,
        route_discovery: Arc<dyn RouteDiscovery>,
        analyzer: Arc<dyn DependencyAnalyzer>,
        transformer: Arc<dyn ModuleTransformer>,
        resolver: Arc<dyn PackageResolver>,
        css: Arc<dyn CssPipeline>,
    ) -> Self {
        let assembler = OutputAssembler::new(Arc::clone(&fs), resolver, css);
        Self {
            fs,
            route_discovery,
            analyzer,
            transformer,
            assembler,
            profiler: Arc::new(KazeProfiler::new()),
            phase: Mutex::new(BuildPhase::Idle),
        }
    }

    fn advance(&self, next: BuildPhase) {
        let mut phase = self.phase.lock();
        debug_assert!(
            phase.can_advance_to(next),
            "illegal phase transition {} -> {}",
            phase,
            next
        );
        *phase = next;
    }

    async fn run(&self, options: &BuildOptions) -> Result<BuildReport> {
        let build_start = Instant::now();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        Logger::build_start(
            &options.project_root.display().to_string(),
            &options.outdir.display().to_string(),
        );

        // ── Preparing ────────────────────────────────────────────────
        self.advance(BuildPhase::Preparing);
        self.profiler.start_timer("prepare");

        let runtime = RuntimeAssets::load(options.runtime_dir.as_deref())?;
        self.fs
            .clean_directory(&options.outdir)
            .await
            .map_err(|err| {
                KazeError::structural(format!(
                    "could not prepare output directory {}: {}",
                    options.outdir.display(),
                    err
                ))
            })?;

        self.profiler.end_timer("prepare");

        // ── Discovering ──────────────────────────────────────────────
        self.advance(BuildPhase::Discovering);
        self.profiler.start_timer("discover");
        Logger::scanning_sources();

        let discovered = self
            .route_discovery
            .discover_routes(&options.project_root)
            .await?;
        let sources = scan_project(&self.fs, &options.project_root).await?;
        collect_diagnostics(&discovered.diagnostics, &mut warnings, &mut errors);

        Logger::found_routes(discovered.routes.len(), sources.components.len());

        // Transform targets keyed by path so a file reached through several
        // routes or imports is transformed exactly once
        let mut targets: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();
        for route in &discovered.routes {
            targets.insert(route.page.path.clone(), route.page.clone());
            for layout in &route.layout_chain {
                targets.insert(layout.path.clone(), layout.clone());
            }
        }
        for component in &sources.components {
            targets.insert(component.path.clone(), component.clone());
        }

        Logger::analyzing_dependencies();
        let mut packages = self
            .analyze_dependencies(&mut targets, options, &mut warnings, &mut errors)
            .await?;
        Logger::found_packages(packages.len());

        self.profiler.end_timer("discover");

        // ── Transforming ─────────────────────────────────────────────
        self.advance(BuildPhase::Transforming);
        self.profiler.start_timer("transform");

        let files: Vec<SourceFile> = targets.into_values().collect();
        Logger::transforming_modules(files.len());
        let transforms = self.transform_parallel(files, options).await?;

        let mut css_imports = BTreeSet::new();
        for transform in &transforms {
            collect_diagnostics(&transform.diagnostics, &mut warnings, &mut errors);
            for (package, bindings) in &transform.package_bindings {
                packages
                    .entry(package.clone())
                    .or_default()
                    .extend(bindings.iter().cloned());
            }
            for package in &transform.used_packages {
                packages.entry(package.clone()).or_default();
            }
            css_imports.extend(transform.css_imports.iter().cloned());
        }

        self.profiler.end_timer("transform");

        // ── Assembling ───────────────────────────────────────────────
        // Every transform has completed (success or recorded failure)
        // before the route table and bundle are emitted.
        self.advance(BuildPhase::Assembling);
        self.profiler.start_timer("assemble");
        Logger::assembling_output();

        let mut stylesheets: BTreeSet<PathBuf> = sources.stylesheets.iter().cloned().collect();
        stylesheets.extend(css_imports);

        let assembly = self
            .assembler
            .assemble(
                AssemblyInputs {
                    routes: &discovered.routes,
                    transforms: &transforms,
                    packages,
                    stylesheets: stylesheets.into_iter().collect(),
                    public_assets: &sources.public_assets,
                },
                &runtime,
                options,
            )
            .await?;
        warnings.extend(assembly.warnings);

        self.profiler.end_timer("assemble");

        // ── Done ─────────────────────────────────────────────────────
        self.advance(BuildPhase::Done);
        let build_time = build_start.elapsed();

        if !options.silent {
            self.show_completion(&assembly.output_files, &discovered.routes, &warnings, options);
        }
        if std::env::var("RUST_LOG").unwrap_or_default().contains("debug") {
            self.profiler.report_bottlenecks();
        }
        Logger::build_complete(
            discovered.routes.len(),
            transforms.len(),
            warnings.len(),
            build_time,
            &options.outdir.display().to_string(),
        );

        Ok(BuildReport {
            success: true,
            output_path: options.outdir.clone(),
            build_time_ms: build_time.as_millis() as u64,
            route_count: discovered.routes.len(),
            component_count: transforms.len(),
            asset_count: assembly.asset_count,
            errors,
            warnings,
        })
    }

    /// Depth-bounded analysis of every entry point, in parallel. Each entry
    /// gets its own visited set inside the analyzer, so parallel analyses
    /// never contaminate each other's closures.
    async fn analyze_dependencies(
        &self,
        targets: &mut BTreeMap<PathBuf, SourceFile>,
        options: &BuildOptions,
        warnings: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let analyzer = Arc::clone(&self.analyzer);
        let entries: Vec<PathBuf> = targets.keys().cloned().collect();
        let root = options.project_root.clone();

        let sets: Vec<DependencySet> = tokio::task::spawn_blocking(move || {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|entry| analyzer.analyze(entry, &root))
                .collect()
        })
        .await
        .map_err(|err| KazeError::Other(format!("dependency analysis panicked: {}", err)))?;

        let mut packages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        // Several entry points can trip over the same broken import; each
        // resolution problem is reported once
        let mut seen = BTreeSet::new();
        for set in sets {
            for diagnostic in &set.diagnostics {
                let message = diagnostic.to_string();
                if !seen.insert(message.clone()) {
                    continue;
                }
                match diagnostic.severity {
                    Severity::Warning => warnings.push(message),
                    Severity::Error => errors.push(message),
                }
            }
            for package in set.packages {
                packages.entry(package).or_default();
            }
            // Local imports outside the scanned roots still need their own
            // transformed module in the output tree
            for local in set.local_files {
                if targets.contains_key(&local) {
                    continue;
                }
                match SourceFile::new(local.clone(), &options.project_root, SourceKind::Component)
                {
                    Ok(source) => {
                        targets.insert(local, source);
                    }
                    Err(_) => {
                        debug!(
                            "skipping import outside the project root: {}",
                            local.display()
                        );
                    }
                }
            }
        }
        Ok(packages)
    }

    /// CPU-bound stage: rayon across cores inside a blocking task. Safe to
    /// parallelize because each file's transform is pure with respect to
    /// every other file.
    async fn transform_parallel(
        &self,
        files: Vec<SourceFile>,
        options: &BuildOptions,
    ) -> Result<Vec<TransformResult>> {
        debug!(
            "transforming {} modules across {} cores",
            files.len(),
            num_cpus::get()
        );
        let transformer = Arc::clone(&self.transformer);
        let root = options.project_root.clone();

        tokio::task::spawn_blocking(move || {
            use rayon::prelude::*;
            files
                .par_iter()
                .map(|file| transformer.transform(file, &root))
                .collect()
        })
        .await
        .map_err(|err| KazeError::Other(format!("transform stage panicked: {}", err)))
    }

    fn show_completion(
        &self,
        output_files: &[OutputFile],
        routes: &[Route],
        warnings: &[String],
        options: &BuildOptions,
    ) {
        let ui = KazeUI::new();
        ui.show_completion(CompletionStats {
            outdir: options.outdir.display().to_string(),
            output_files: output_files
                .iter()
                .map(|file| OutputFileInfo {
                    name: file
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    size: file.size,
                })
                .collect(),
            route_count: routes.len(),
            warnings: warnings.to_vec(),
        });
    }
}

#[async_trait::async_trait]
impl BuildService for KazeBuildService {
    async fn build(&self, options: &BuildOptions) -> Result<BuildReport> {
        *self.phase.lock() = BuildPhase::Idle;
        let _timer = Timer::start("full build");

        // The whole run lives under one timeout budget; a cancelled build
        // reports Failed, never a partial Done
        let budget = Duration::from_millis(options.build_timeout_ms);
        match tokio::time::timeout(budget, self.run(options)).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(err)) => {
                self.advance(BuildPhase::Failed);
                Err(err)
            }
            Err(_) => {
                self.advance(BuildPhase::Failed);
                Err(KazeError::Timeout(options.build_timeout_ms))
            }
        }
    }

    fn phase(&self) -> BuildPhase {
        *self.phase.lock()
    }
}

fn collect_diagnostics(
    diagnostics: &[Diagnostic],
    warnings: &mut Vec<String>,
    errors: &mut Vec<String>,
) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Warning => warnings.push(diagnostic.to_string()),
            Severity::Error => errors.push(diagnostic.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        HeuristicDependencyAnalyzer, KazeCssPipeline, NodePackageResolver, OxcModuleTransformer,
        RouteTreeBuilder, TailwindCli, TokioFileSystemService,
    };
    use std::path::Path;
    use tempfile::tempdir;

    fn service() -> KazeBuildService {
        let fs: Arc<dyn FileSystemService> = Arc::new(TokioFileSystemService);
        KazeBuildService::new(
            Arc::clone(&fs),
            Arc::new(RouteTreeBuilder::new(Arc::clone(&fs))),
            Arc::new(HeuristicDependencyAnalyzer::new()),
            Arc::new(OxcModuleTransformer::new(false)),
            Arc::new(NodePackageResolver::new(Arc::clone(&fs))),
            Arc::new(KazeCssPipeline::new(
                Arc::clone(&fs),
                TailwindCli::disabled(),
                1_000,
            )),
        )
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn options(root: &Path, outdir: &Path) -> BuildOptions {
        BuildOptions {
            project_root: root.to_path_buf(),
            outdir: outdir.to_path_buf(),
            silent: true,
            ..BuildOptions::default()
        }
    }

    #[tokio::test]
    async fn test_successful_build_reaches_done() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "app/page.tsx",
            "export default function Home() { return <h1>home</h1>; }",
        );

        let service = service();
        let report = service
            .build(&options(temp.path(), &temp.path().join("dist")))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.route_count, 1);
        assert_eq!(service.phase(), BuildPhase::Done);
    }

    #[tokio::test]
    async fn test_missing_app_directory_fails_the_phase_machine() {
        let temp = tempdir().unwrap();

        let service = service();
        let result = service
            .build(&options(temp.path(), &temp.path().join("dist")))
            .await;

        assert!(matches!(result, Err(KazeError::Structural { .. })));
        assert_eq!(service.phase(), BuildPhase::Failed);
    }

    #[tokio::test]
    async fn test_missing_runtime_override_is_structural() {
        let temp = tempdir().unwrap();
        write(temp.path(), "app/page.tsx", "export default () => <p>hi</p>;");

        let mut opts = options(temp.path(), &temp.path().join("dist"));
        opts.runtime_dir = Some(temp.path().join("no-such-runtime"));

        let service = service();
        let result = service.build(&opts).await;

        assert!(matches!(result, Err(KazeError::Structural { .. })));
        assert_eq!(service.phase(), BuildPhase::Failed);
    }
}
