use std::sync::Arc;
use std::sync::atomic::Ordering;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::level::{classify, Level};
use crate::metrics::MetricsCounters;
use crate::upstream::{Snapshot, UpstreamSource};

const REPORT_PREFIX: &str = "Band conditions now... ";

/// Fixed answer for selectors outside the known band list.
const WRONG_BAND: &str = "Wrong band...";

/// One band's entry in the structured JSON view
#[derive(Debug, Clone, Serialize)]
pub struct BandReport {
    pub band: String,
    pub score: Option<i64>,
    pub level: Level,
}

/// Core reporter - fetches a fresh snapshot per request and renders it as
/// the spoken-style text a voice front end reads out verbatim.
///
/// Conditions are volatile, so nothing is cached: every request pays for
/// its own fetch and gets current data.
pub struct Reporter {
    config: Arc<Config>,
    pub upstream: UpstreamSource,
    pub metrics: MetricsCounters,
}

impl Reporter {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let upstream = UpstreamSource::new(&config.upstream)?;
        Ok(Self {
            config,
            upstream,
            metrics: MetricsCounters::new(),
        })
    }

    /// Build the report for one band or "all".
    ///
    /// Unrecognized selectors resolve to fixed text before the upstream is
    /// touched, so "Wrong band..." comes back even when the source is down.
    /// The only error path out of here is a failed fetch.
    pub async fn summarize(&self, band: &str) -> anyhow::Result<String> {
        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

        if band == "all" {
            self.metrics.requests_all.fetch_add(1, Ordering::Relaxed);
        } else if self.config.report.bands.iter().any(|b| b == band) {
            self.metrics.requests_single.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.requests_wrong_band.fetch_add(1, Ordering::Relaxed);
            debug!("Unrecognized band selector: {:?}", band);
            return Ok(WRONG_BAND.to_string());
        }

        let snapshot = self.upstream.fetch().await?;
        Ok(self.render(band, &snapshot))
    }

    /// Structured per-band conditions for the JSON API and dashboard.
    /// Same fetch-and-classify chain as `summarize`, different shape.
    pub async fn conditions(&self) -> anyhow::Result<Vec<BandReport>> {
        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.upstream.fetch().await?;
        Ok(self.config.report.bands
            .iter()
            .map(|band| {
                let score = snapshot.get(band).copied();
                let level = score.map_or(Level::Unknown, classify);
                BandReport {
                    band: band.clone(),
                    score,
                    level,
                }
            })
            .collect())
    }

    fn render(&self, band: &str, snapshot: &Snapshot) -> String {
        let mut report = String::from(REPORT_PREFIX);
        if band == "all" {
            for b in &self.config.report.bands {
                report.push_str(&self.fragment(b, snapshot));
            }
        } else {
            report.push_str(&self.fragment(band, snapshot));
        }
        report
    }

    fn fragment(&self, band: &str, snapshot: &Snapshot) -> String {
        let level = match snapshot.get(band) {
            Some(score) => classify(*score),
            None => {
                // Known band with no score in the snapshot reads as Unknown
                warn!("Status page has no score for the {} meter band", band);
                self.metrics.missing_band_scores.fetch_add(1, Ordering::Relaxed);
                Level::Unknown
            }
        };
        self.metrics.inc_level(level);
        format!("{} meter band is {}... ", band, level.name())
    }

    /// Get reporter stats for Web UI
    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "bands": self.config.report.bands,
            "upstream": self.upstream.get_stats(),
            "requests": self.metrics.get_stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReportConfig, UpstreamConfig, WebConfig};

    fn test_reporter(url: &str) -> Reporter {
        let config = Config {
            upstream: UpstreamConfig {
                url: url.to_string(),
                timeout_ms: 2000,
            },
            report: ReportConfig::default(),
            web: WebConfig {
                enabled: false,
                address: "127.0.0.1".to_string(),
                port: 0,
            },
        };
        Reporter::new(Arc::new(config)).unwrap()
    }

    fn fixture_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("160".to_string(), 98);
        snapshot.insert("80".to_string(), 20);
        snapshot.insert("40".to_string(), 50);
        snapshot.insert("30".to_string(), 50);
        snapshot.insert("20".to_string(), 50);
        snapshot.insert("17".to_string(), 50);
        snapshot.insert("15".to_string(), 50);
        snapshot
    }

    #[test]
    fn test_render_all_bands_in_fixed_order() {
        let reporter = test_reporter("http://unused.invalid/");
        let report = reporter.render("all", &fixture_snapshot());
        assert_eq!(
            report,
            "Band conditions now... 160 meter band is Great... 80 meter band is Poor... \
             40 meter band is Fair... 30 meter band is Fair... 20 meter band is Fair... \
             17 meter band is Fair... 15 meter band is Fair... "
        );
    }

    #[test]
    fn test_render_single_band() {
        let reporter = test_reporter("http://unused.invalid/");
        let mut snapshot = Snapshot::new();
        snapshot.insert("20".to_string(), 5);
        let report = reporter.render("20", &snapshot);
        assert_eq!(report, "Band conditions now... 20 meter band is Dead... ");
    }

    #[test]
    fn test_render_missing_band_reads_unknown() {
        let reporter = test_reporter("http://unused.invalid/");
        let report = reporter.render("30", &Snapshot::new());
        assert_eq!(report, "Band conditions now... 30 meter band is Unknown... ");
    }

    #[tokio::test]
    async fn test_wrong_band_answers_without_fetching() {
        // Nothing listens on this URL; summarize must still answer
        let reporter = test_reporter("http://127.0.0.1:9/index.htm");
        let report = reporter.summarize("99").await.unwrap();
        assert_eq!(report, "Wrong band...");
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let reporter = test_reporter(&format!("http://{}/index.htm", addr));
        assert!(reporter.summarize("all").await.is_err());
    }

    #[tokio::test]
    async fn test_summarize_end_to_end() {
        let app = axum::Router::new().route(
            "/index.htm",
            axum::routing::get(|| async {
                "160 day bandcondx.com/98.jpg\r\n80 day bandcondx.com/20.jpg\r\n\
                 40 day bandcondx.com/50.jpg\r\n30 day bandcondx.com/50.jpg\r\n\
                 20 day bandcondx.com/50.jpg\r\n17 day bandcondx.com/50.jpg\r\n\
                 15 day bandcondx.com/96.jpg\r\nfooter junk"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let reporter = test_reporter(&format!("http://{}/index.htm", addr));
        let report = reporter.summarize("all").await.unwrap();
        assert!(report.starts_with("Band conditions now... 160 meter band is Great... "));
        assert!(report.ends_with("15 meter band is Great... "));

        let conditions = reporter.conditions().await.unwrap();
        assert_eq!(conditions.len(), 7);
        assert_eq!(conditions[0].band, "160");
        assert_eq!(conditions[0].score, Some(98));
        assert_eq!(conditions[0].level, Level::Great);
    }
}
