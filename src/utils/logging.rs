use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Logger;

impl Logger {
    /// RUST_LOG wins when set; otherwise --silent raises the bar to warnings
    pub fn init(silent: bool) {
        let fallback = if silent { "kaze=warn" } else { "kaze=info" };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    pub fn build_start(root: &str, outdir: &str) {
        info!("🌀 Kaze - Production Build");
        info!("═══════════════════════════════════════");
        info!("📁 Project: {}", root);
        info!("📦 Output: {}", outdir);
    }

    pub fn scanning_sources() {
        info!("📁 Scanning app, components and lib directories...");
    }

    pub fn found_routes(route_count: usize, component_count: usize) {
        info!(
            "🗺️  Found {} routes, {} shared components",
            route_count, component_count
        );
    }

    pub fn analyzing_dependencies() {
        info!("🔍 Analyzing package dependencies...");
    }

    pub fn found_packages(count: usize) {
        info!("📦 {} external packages referenced", count);
    }

    pub fn transforming_modules(count: usize) {
        info!("⚡ Transforming {} modules...", count);
    }

    pub fn transforming_file(name: &str) {
        debug!("⚡ Transforming: {}", name);
    }

    pub fn resolving_package(name: &str) {
        debug!("🔗 Resolving package: {}", name);
    }

    pub fn processing_css(name: &str) {
        debug!("🎨 Processing CSS: {}", name);
    }

    pub fn tailwind_detected(binary: &str) {
        info!("🎨 Tailwind CLI detected: {}", binary);
    }

    pub fn tailwind_unavailable() {
        info!("🎨 Tailwind CLI not found, falling back to plain CSS bundling");
    }

    pub fn assembling_output() {
        info!("📝 Assembling output directory...");
    }

    pub fn build_complete(
        route_count: usize,
        component_count: usize,
        warning_count: usize,
        build_time: std::time::Duration,
        outdir: &str,
    ) {
        info!("");
        info!("📊 Build Statistics:");
        info!("  • Routes: {}", route_count);
        info!("  • Modules transformed: {}", component_count);
        if warning_count > 0 {
            info!("  • Warnings: {}", warning_count);
        }
        info!("  • Build time: {:.2?}", build_time);
        info!("  • Output directory: {}", outdir);
        info!("");
        info!("✅ Build completed successfully!");
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
