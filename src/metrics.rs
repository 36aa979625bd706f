//! Prometheus-compatible metrics exporter for condx
//!
//! Endpoint: GET /metrics (on the web UI port, default 8073)

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::level::Level;
use crate::report::Reporter;

/// Global metrics counters that are atomically updated from report handling
pub struct MetricsCounters {
    /// Total report requests received
    pub requests_total: AtomicU64,
    /// Requests for all bands
    pub requests_all: AtomicU64,
    /// Requests for a single known band
    pub requests_single: AtomicU64,
    /// Requests for a band outside the known list
    pub requests_wrong_band: AtomicU64,
    /// Known bands that were absent from a fetched snapshot
    pub missing_band_scores: AtomicU64,
    /// Level counters
    pub level_great: AtomicU64,
    pub level_good: AtomicU64,
    pub level_fair: AtomicU64,
    pub level_poor: AtomicU64,
    pub level_dead: AtomicU64,
    pub level_unknown: AtomicU64,
    /// Server start time
    pub start_time: Instant,
}

impl MetricsCounters {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_all: AtomicU64::new(0),
            requests_single: AtomicU64::new(0),
            requests_wrong_band: AtomicU64::new(0),
            missing_band_scores: AtomicU64::new(0),
            level_great: AtomicU64::new(0),
            level_good: AtomicU64::new(0),
            level_fair: AtomicU64::new(0),
            level_poor: AtomicU64::new(0),
            level_dead: AtomicU64::new(0),
            level_unknown: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn inc_level(&self, level: Level) {
        match level {
            Level::Great => self.level_great.fetch_add(1, Ordering::Relaxed),
            Level::Good => self.level_good.fetch_add(1, Ordering::Relaxed),
            Level::Fair => self.level_fair.fetch_add(1, Ordering::Relaxed),
            Level::Poor => self.level_poor.fetch_add(1, Ordering::Relaxed),
            Level::Dead => self.level_dead.fetch_add(1, Ordering::Relaxed),
            Level::Unknown => self.level_unknown.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Get request counters for Web UI
    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "total": self.requests_total.load(Ordering::Relaxed),
            "all_bands": self.requests_all.load(Ordering::Relaxed),
            "single_band": self.requests_single.load(Ordering::Relaxed),
            "wrong_band": self.requests_wrong_band.load(Ordering::Relaxed),
            "missing_band_scores": self.missing_band_scores.load(Ordering::Relaxed),
            "uptime_secs": self.start_time.elapsed().as_secs(),
        })
    }
}

/// Generate Prometheus-format metrics text
pub fn render_metrics(reporter: &Reporter) -> String {
    let mut out = String::with_capacity(2048);
    let c = &reporter.metrics;

    let uptime = c.start_time.elapsed().as_secs_f64();
    write_help_type(&mut out, "condx_up", "Whether the reporter is up.", "gauge");
    writeln!(out, "condx_up 1").ok();

    write_help_type(&mut out, "condx_time_up_seconds_total", "Uptime since start in seconds.", "counter");
    writeln!(out, "condx_time_up_seconds_total {:.3}", uptime).ok();

    let requests_total = c.requests_total.load(Ordering::Relaxed);
    write_help_type(&mut out, "condx_requests_total", "Total report requests received.", "counter");
    writeln!(out, "condx_requests_total {}", requests_total).ok();

    write_help_type(&mut out, "condx_requests_by_kind_total", "Total report requests by selector kind.", "counter");
    write_counter_if_nonzero(&mut out, "condx_requests_by_kind_total", "kind", "all", c.requests_all.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_requests_by_kind_total", "kind", "single", c.requests_single.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_requests_by_kind_total", "kind", "wrong_band", c.requests_wrong_band.load(Ordering::Relaxed));

    let missing = c.missing_band_scores.load(Ordering::Relaxed);
    write_help_type(&mut out, "condx_missing_band_scores_total", "Known bands absent from a fetched snapshot.", "counter");
    writeln!(out, "condx_missing_band_scores_total {}", missing).ok();

    write_help_type(&mut out, "condx_band_levels_total", "Band classifications reported, by level.", "counter");
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Great", c.level_great.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Good", c.level_good.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Fair", c.level_fair.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Poor", c.level_poor.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Dead", c.level_dead.load(Ordering::Relaxed));
    write_counter_if_nonzero(&mut out, "condx_band_levels_total", "level", "Unknown", c.level_unknown.load(Ordering::Relaxed));

    // Upstream fetch stats
    let upstream = reporter.upstream.get_stats();
    let fetches = upstream["total_fetches"].as_u64().unwrap_or(0);
    let failures = upstream["total_failures"].as_u64().unwrap_or(0);

    write_help_type(&mut out, "condx_upstream_fetches_total", "Total fetches of the upstream status page.", "counter");
    writeln!(out, "condx_upstream_fetches_total {}", fetches).ok();

    write_help_type(&mut out, "condx_upstream_fetch_failures_total", "Total upstream fetches that failed.", "counter");
    writeln!(out, "condx_upstream_fetch_failures_total {}", failures).ok();

    out
}

fn write_help_type(out: &mut String, name: &str, help: &str, mtype: &str) {
    writeln!(out, "# HELP {} {}", name, help).ok();
    writeln!(out, "# TYPE {} {}", name, mtype).ok();
}

fn write_counter_if_nonzero(out: &mut String, name: &str, label: &str, value: &str, count: u64) {
    if count > 0 {
        writeln!(out, "{}{{{}=\"{}\"}} {}", name, label, value, count).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::config::{Config, ReportConfig, UpstreamConfig, WebConfig};

    #[test]
    fn test_render_includes_core_series() {
        let config = Config {
            upstream: UpstreamConfig {
                url: "http://unused.invalid/".to_string(),
                timeout_ms: 2000,
            },
            report: ReportConfig::default(),
            web: WebConfig {
                enabled: false,
                address: "127.0.0.1".to_string(),
                port: 0,
            },
        };
        let reporter = Reporter::new(Arc::new(config)).unwrap();
        reporter.metrics.requests_total.fetch_add(3, Ordering::Relaxed);
        reporter.metrics.inc_level(Level::Fair);

        let text = render_metrics(&reporter);
        assert!(text.contains("condx_up 1"));
        assert!(text.contains("condx_requests_total 3"));
        assert!(text.contains("condx_band_levels_total{level=\"Fair\"} 1"));
        assert!(text.contains("condx_upstream_fetches_total 0"));
    }
}
