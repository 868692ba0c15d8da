use crate::core::{interfaces::*, models::*, services::KazeBuildService};
use crate::infrastructure::{
    HeuristicDependencyAnalyzer, KazeCssPipeline, NodePackageResolver, OxcModuleTransformer,
    RouteTreeBuilder, TailwindCli, TokioFileSystemService,
};
use crate::utils::{ConfigLoader, Logger, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kaze")]
#[command(about = "Kaze - file-system-routed builds for the modern web")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project into a deployable output directory
    Build {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Output directory (default: dist, or kaze.config.json)
        #[arg(short, long)]
        outdir: Option<String>,
        /// Minify transformed modules
        #[arg(long)]
        minify: bool,
        /// Suppress the completion summary
        #[arg(long)]
        silent: bool,
        /// Write build-report.json into the output directory
        #[arg(long)]
        report: bool,
        /// Override directory for the framework runtime files
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
    },
    /// Print the discovered route table without building
    Routes {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        root: String,
    },
    /// Show framework information
    Info,
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            Commands::Build {
                root,
                outdir,
                minify,
                silent,
                report,
                runtime_dir,
            } => {
                Logger::init(silent);
                self.handle_build_command(
                    &root,
                    outdir.as_deref(),
                    minify,
                    silent,
                    report,
                    runtime_dir,
                )
                .await
            }
            Commands::Routes { root } => {
                Logger::init(true);
                self.handle_routes_command(&root).await
            }
            Commands::Info => {
                Logger::init(false);
                self.handle_info_command()
            }
        }
    }

    async fn handle_build_command(
        &self,
        root: &str,
        outdir: Option<&str>,
        minify: bool,
        silent: bool,
        report: bool,
        runtime_dir: Option<PathBuf>,
    ) -> Result<()> {
        let root = PathBuf::from(root);
        let file_config = ConfigLoader::load_from_file(&root)?;
        let options = ConfigLoader::merge_with_cli(
            file_config,
            root,
            outdir,
            // Bare flags only override when actually passed; absence defers
            // to the config file
            if minify { Some(true) } else { None },
            if silent { Some(true) } else { None },
            runtime_dir,
        );

        let service = build_service(&options);
        let build_report = service.build(&options).await?;

        for error in &build_report.errors {
            Logger::error(error);
        }

        if report {
            let report_path = build_report.output_path.join("build-report.json");
            let json = serde_json::to_string_pretty(&build_report)?;
            tokio::fs::write(&report_path, json)
                .await
                .map_err(crate::utils::KazeError::Io)?;
        }

        Ok(())
    }

    async fn handle_routes_command(&self, root: &str) -> Result<()> {
        let fs: Arc<dyn FileSystemService> = Arc::new(TokioFileSystemService);
        let builder = RouteTreeBuilder::new(fs);
        let discovered = builder.discover_routes(&PathBuf::from(root)).await?;

        println!();
        for route in &discovered.routes {
            let layouts = if route.layout_chain.is_empty() {
                "-".to_string()
            } else {
                route
                    .layout_chain
                    .iter()
                    .map(|layout| layout.rel_path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" › ")
            };
            println!(
                "  {}  {}  {}",
                route.url_path.bright_cyan().bold(),
                route.page.rel_path.display().to_string().bright_white(),
                format!("[{}]", layouts).bright_black()
            );
        }
        println!();
        println!(
            "  {} {} routes",
            "🗺".bright_green(),
            discovered.routes.len().to_string().bright_cyan().bold()
        );
        for diagnostic in &discovered.diagnostics {
            Logger::warn(&diagnostic.to_string());
        }

        Ok(())
    }

    fn handle_info_command(&self) -> Result<()> {
        tracing::info!("🌀 Kaze v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("═══════════════════════════════════════");
        tracing::info!("File-system-routed build pipeline");
        tracing::info!("");
        tracing::info!("🎯 Features:");
        tracing::info!("  • Route and layout discovery (app/, app/pages/)");
        tracing::info!("  • TSX/TS/JSX transpilation via oxc");
        tracing::info!("  • Heuristic dependency analysis with package shims");
        tracing::info!("  • Import rewriting to browser ESM");
        tracing::info!("  • Tailwind CLI integration with fallback stylesheet");
        tracing::info!("");
        tracing::info!("🔧 Commands:");
        tracing::info!("  • kaze build   - produce the output directory");
        tracing::info!("  • kaze routes  - print the discovered route table");
        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Wires the production service graph: real file system, oxc transforms,
/// Tailwind detection against the project root
pub fn build_service(options: &BuildOptions) -> KazeBuildService {
    let fs: Arc<dyn FileSystemService> = Arc::new(TokioFileSystemService);

    let tailwind = TailwindCli::detect(&options.project_root);
    if let Some(binary) = tailwind.binary() {
        Logger::tailwind_detected(&binary.display().to_string());
    }

    KazeBuildService::new(
        Arc::clone(&fs),
        Arc::new(RouteTreeBuilder::new(Arc::clone(&fs))),
        Arc::new(HeuristicDependencyAnalyzer::new()),
        Arc::new(OxcModuleTransformer::new(options.minify)),
        Arc::new(NodePackageResolver::new(Arc::clone(&fs))),
        Arc::new(KazeCssPipeline::new(
            Arc::clone(&fs),
            tailwind,
            options.css_timeout_ms,
        )),
    )
}
