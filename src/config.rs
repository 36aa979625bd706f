use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Bands included in the report, in the order the "all" report speaks them
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_address")]
    pub address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_url() -> String { "http://75.35.171.117/index.htm".to_string() }
fn default_timeout_ms() -> u64 { 5000 }
fn default_true() -> bool { true }
fn default_web_address() -> String { "0.0.0.0".to_string() }
fn default_web_port() -> u16 { 8073 }

fn default_bands() -> Vec<String> {
    ["160", "80", "40", "30", "20", "17", "15"]
        .iter()
        .map(|b| b.to_string())
        .collect()
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?;
        Ok(config)
    }
}
