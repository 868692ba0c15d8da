use colored::*;
use std::time::Instant;

pub struct KazeUI {
    start_time: Instant,
}

impl KazeUI {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn show_banner(&self) {
        // Simple, clean output like Vite
        println!(
            "\n  {} {}",
            "KAZE".bright_cyan().bold(),
            concat!("v", env!("CARGO_PKG_VERSION")).bright_white()
        );
        println!();
    }

    pub fn show_completion(&self, stats: CompletionStats) {
        let build_time = self.start_time.elapsed();

        println!();
        for file in &stats.output_files {
            let size_kb = file.size as f64 / 1024.0;
            let size_str = if size_kb < 1.0 {
                format!("{:.2} B", file.size)
            } else {
                format!("{:.2} kB", size_kb)
            };

            println!(
                "  {}{} {}",
                format!("{}/", stats.outdir).bright_black(),
                file.name.bright_cyan(),
                format!("({})", size_str).bright_black()
            );
        }

        if stats.route_count > 0 {
            println!();
            println!(
                "  {} {} routes",
                "🗺".bright_green(),
                stats.route_count.to_string().bright_cyan().bold()
            );
        }

        for warning in &stats.warnings {
            println!("  {} {}", "⚠".bright_yellow(), warning.bright_yellow());
        }

        println!();
        println!(
            "  {} built in {}",
            "✓".bright_green(),
            format!("{:.0}ms", build_time.as_secs_f64() * 1000.0)
                .bright_white()
                .bold()
        );
    }

    pub fn show_failure(&self, errors: &[String]) {
        println!();
        for error in errors {
            println!("  {} {}", "✗".bright_red(), error.bright_red());
        }
        println!();
        println!("  {} build failed", "✗".bright_red().bold());
    }
}

#[derive(Clone)]
pub struct CompletionStats {
    pub outdir: String,
    pub output_files: Vec<OutputFileInfo>,
    pub route_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct OutputFileInfo {
    pub name: String,
    pub size: usize,
}

impl Default for KazeUI {
    fn default() -> Self {
        Self::new()
    }
}
