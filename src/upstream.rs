use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use chrono::Utc;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

/// One fetch's worth of band conditions: band id -> raw score.
/// Built fresh on every request and thrown away with it.
pub type Snapshot = HashMap<String, i64>;

pub struct UpstreamSource {
    config: UpstreamConfig,
    client: reqwest::Client,
    line_pattern: Regex,
    // Stats
    total_fetches: AtomicU64,
    total_failures: AtomicU64,
    latency_history: RwLock<Vec<Duration>>, // Recent latencies
    last_fetch_at: RwLock<Option<String>>,
    last_error: RwLock<Option<String>>,
}

impl UpstreamSource {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        // The status page encodes each band's score as the filename of an
        // embedded condition image: `160 ... bandcondx.com/98.jpg`
        let line_pattern = Regex::new(r"^(\d+).*bandcondx\.com/(\d+)\.jpg")
            .map_err(|e| anyhow::anyhow!("Invalid line pattern: {}", e))?;

        Ok(Self {
            config: config.clone(),
            client,
            line_pattern,
            total_fetches: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            latency_history: RwLock::new(Vec::new()),
            last_fetch_at: RwLock::new(None),
            last_error: RwLock::new(None),
        })
    }

    /// Fetch the status page and extract a fresh snapshot.
    ///
    /// A failed request (connect error, timeout, non-2xx) is a hard error.
    /// A page where no line matches is an empty snapshot, not an error.
    pub async fn fetch(&self) -> anyhow::Result<Snapshot> {
        self.total_fetches.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = self.fetch_body().await;
        let latency = start.elapsed();
        self.record_latency(latency);
        *self.last_fetch_at.write() =
            Some(Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());

        let body = match result {
            Ok(body) => {
                *self.last_error.write() = None;
                body
            }
            Err(e) => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                *self.last_error.write() = Some(e.to_string());
                return Err(e);
            }
        };

        let snapshot = self.parse_snapshot(&body);
        debug!("Fetched {} band scores in {:?}", snapshot.len(), latency);
        if snapshot.is_empty() {
            warn!("Status page yielded no band scores (upstream format change?)");
        }
        Ok(snapshot)
    }

    async fn fetch_body(&self) -> anyhow::Result<String> {
        let response = self.client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Fetch from {} failed: {}", self.config.url, e))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Upstream {} returned status {}",
                self.config.url,
                response.status()
            ));
        }

        response.text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read body from {}: {}", self.config.url, e))
    }

    /// Extract band -> score pairs from the raw page text.
    ///
    /// The page is uncontrolled HTML, so parsing is lenient: lines that do
    /// not match the pattern are skipped, and a repeated band id keeps the
    /// last match. This function owns every assumption about the upstream
    /// format.
    pub fn parse_snapshot(&self, body: &str) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for line in body.split("\r\n") {
            if let Some(caps) = self.line_pattern.captures(line) {
                if let Ok(score) = caps[2].parse::<i64>() {
                    snapshot.insert(caps[1].to_string(), score);
                }
            }
        }
        snapshot
    }

    fn record_latency(&self, latency: Duration) {
        let mut history = self.latency_history.write();
        history.push(latency);
        // Keep last 100 entries
        if history.len() > 100 {
            let drain_to = history.len() - 100;
            history.drain(..drain_to);
        }
    }

    /// Get upstream stats for Web UI
    pub fn get_stats(&self) -> serde_json::Value {
        let history = self.latency_history.read();
        let avg_latency = if history.is_empty() {
            0.0
        } else {
            history.iter().map(|d| d.as_millis() as f64).sum::<f64>() / history.len() as f64
        };

        serde_json::json!({
            "url": self.config.url,
            "timeout_ms": self.config.timeout_ms,
            "total_fetches": self.total_fetches.load(Ordering::Relaxed),
            "total_failures": self.total_failures.load(Ordering::Relaxed),
            "avg_latency_ms": format!("{:.1}", avg_latency),
            "last_fetch_at": self.last_fetch_at.read().clone(),
            "last_error": self.last_error.read().clone(),
        })
    }
}
