use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-phase profiler for identifying slow build stages
pub struct KazeProfiler {
    timings: Mutex<HashMap<String, Vec<Duration>>>,
    active_timers: Mutex<HashMap<String, Instant>>,
}

impl KazeProfiler {
    pub fn new() -> Self {
        Self {
            timings: Mutex::new(HashMap::new()),
            active_timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn start_timer(&self, name: &str) {
        let mut timers = self.active_timers.lock();
        timers.insert(name.to_string(), Instant::now());
    }

    pub fn end_timer(&self, name: &str) -> Duration {
        let mut timers = self.active_timers.lock();
        let start = timers.remove(name).unwrap_or_else(Instant::now);
        let duration = start.elapsed();

        let mut timings = self.timings.lock();
        timings.entry(name.to_string()).or_default().push(duration);

        duration
    }

    /// Total recorded time for a phase, zero when the phase never ran
    pub fn get_duration(&self, name: &str) -> Duration {
        let timings = self.timings.lock();
        timings
            .get(name)
            .map(|durations| durations.iter().sum())
            .unwrap_or_default()
    }

    pub fn get_stats(&self) -> ProfilerStats {
        let timings = self.timings.lock();
        let mut stats = ProfilerStats {
            total_time: Duration::new(0, 0),
            bottlenecks: Vec::new(),
        };

        for (name, durations) in timings.iter() {
            let total: Duration = durations.iter().sum();

            stats.total_time += total;
            stats.bottlenecks.push(BottleneckInfo {
                name: name.clone(),
                total_time: total,
                call_count: durations.len(),
            });
        }

        // Sort by total time (biggest bottlenecks first)
        stats
            .bottlenecks
            .sort_by(|a, b| b.total_time.cmp(&a.total_time));
        stats
    }

    pub fn report_bottlenecks(&self) {
        let stats = self.get_stats();

        println!("🔍 Performance Profile:");
        println!("   Total build time: {:?}", stats.total_time);
        println!("   Top bottlenecks:");

        for (i, bottleneck) in stats.bottlenecks.iter().take(5).enumerate() {
            let percentage = (bottleneck.total_time.as_millis() as f64
                / stats.total_time.as_millis().max(1) as f64)
                * 100.0;
            println!(
                "   {}. {} - {:?} ({:.1}% of total, {} calls)",
                i + 1,
                bottleneck.name,
                bottleneck.total_time,
                percentage,
                bottleneck.call_count
            );
        }
    }
}

impl Default for KazeProfiler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ProfilerStats {
    pub total_time: Duration,
    pub bottlenecks: Vec<BottleneckInfo>,
}

#[derive(Debug)]
pub struct BottleneckInfo {
    pub name: String,
    pub total_time: Duration,
    pub call_count: usize,
}
