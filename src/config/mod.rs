mod env;

use crate::geometry::Position;
use crate::transform::ObservedAtRules;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Complete map synchronization configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub ngsi: NgsiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Upstream context broker
#[derive(Debug, Clone, Deserialize)]
pub struct NgsiConfig {
    /// Broker base URL; unset means the built-in fixture is used
    #[serde(default)]
    pub base_url: Option<String>,
    /// Force the fixture even when a base URL is set
    #[serde(default)]
    pub use_mock: bool,
    /// JSON-LD context document sent in the `Link` header
    #[serde(default)]
    pub context_url: Option<String>,
    /// Page size for each per-type entity request
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    200
}

impl Default for NgsiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            use_mock: false,
            context_url: None,
            limit: default_limit(),
        }
    }
}

impl NgsiConfig {
    /// Whether entities come from the fixture instead of the network.
    pub fn uses_fixture(&self) -> bool {
        self.use_mock
            || self
                .base_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    15
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl PollingConfig {
    /// Poll cadence; a zero setting is raised to one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

/// Viewport behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Initial centre as `[lat, lon]`
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
    /// Upper bound on the initial location fix
    #[serde(default = "default_geolocation_timeout_ms")]
    pub geolocation_timeout_ms: u64,
    /// Fraction of the bounds span added on every side when fitting
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f64,
    /// Fixed device location as `"lat,lon"`; unset means no location source
    #[serde(default)]
    pub location: Option<String>,
}

fn default_center() -> [f64; 2] {
    [59.3326, 18.0649]
}

fn default_zoom() -> u8 {
    12
}

fn default_geolocation_timeout_ms() -> u64 {
    5000
}

fn default_fit_padding() -> f64 {
    0.2
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            default_zoom: default_zoom(),
            geolocation_timeout_ms: default_geolocation_timeout_ms(),
            fit_padding: default_fit_padding(),
            location: None,
        }
    }
}

impl ViewConfig {
    pub fn center(&self) -> Position {
        let [lat, lon] = self.default_center;
        Position::new(lon, lat)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    /// Parsed `location`, if set and well formed.
    pub fn fixed_location(&self) -> Option<Position> {
        self.location.as_deref().and_then(parse_lat_lon)
    }
}

/// Parse `"lat,lon"` into a position.
pub fn parse_lat_lon(text: &str) -> Option<Position> {
    let (lat, lon) = text.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    let position = Position::new(lon, lat);
    (lat.is_finite() && lon.is_finite()).then_some(position)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub observed_at: ObservedAtConfig,
}

/// Overrides for the observed-at preference rules
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservedAtConfig {
    /// Candidate keys for types without their own entry
    #[serde(default)]
    pub default: Vec<String>,
    /// Candidate keys per entity type
    #[serde(default)]
    pub by_type: BTreeMap<String, Vec<String>>,
}

impl TransformConfig {
    /// Built-in rules with the configured overrides layered on top.
    pub fn rules(&self) -> ObservedAtRules {
        ObservedAtRules::default()
            .with_overrides(&self.observed_at.default, &self.observed_at.by_type)
    }
}

impl MapConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<MapConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: MapConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// File (when given) or defaults, then environment overrides.
pub fn resolve_config(path: Option<&Path>) -> Result<MapConfig> {
    let Some(path) = path else {
        return Ok(MapConfig::from_env());
    };
    let mut config = load_config(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.ngsi.base_url, None);
        assert!(config.ngsi.uses_fixture());
        assert_eq!(config.ngsi.limit, 200);
        assert_eq!(config.polling.interval_seconds, 15);
        assert_eq!(config.view.default_zoom, 12);
        assert_eq!(config.view.geolocation_timeout_ms, 5000);
        assert_eq!(config.view.fit_padding, 0.2);
        assert_eq!(config.view.center(), Position::new(18.0649, 59.3326));
        assert_eq!(config.view.fixed_location(), None);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [ngsi]
            base_url = "http://broker:1026"
            context_url = "http://broker/context.jsonld"
            limit = 50

            [polling]
            interval_seconds = 30

            [view]
            default_center = [51.5072, -0.1276]
            default_zoom = 10
            geolocation_timeout_ms = 2000
            fit_padding = 0.1
            location = "51.5, -0.12"

            [transform.observed_at]
            default = ["dateObserved"]

            [transform.observed_at.by_type]
            Station = ["lastSeen", "dateModified"]
        "#;

        let config: MapConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ngsi.base_url.as_deref(), Some("http://broker:1026"));
        assert!(!config.ngsi.uses_fixture());
        assert_eq!(config.ngsi.limit, 50);
        assert_eq!(config.polling.interval(), Duration::from_secs(30));
        assert_eq!(config.view.center(), Position::new(-0.1276, 51.5072));
        assert_eq!(config.view.fixed_location(), Some(Position::new(-0.12, 51.5)));

        let rules = config.transform.rules();
        assert_eq!(rules.candidates("Sensor"), ["dateObserved".to_string()]);
        assert_eq!(rules.candidates("Station")[0], "lastSeen");
        assert_eq!(rules.candidates("RoadAccident")[0], "accidentDate");
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and keys use defaults
        let toml = r#"
            [view]
            default_zoom = 8
        "#;

        let config: MapConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.view.default_zoom, 8);
        assert_eq!(config.view.fit_padding, 0.2);
        assert_eq!(config.polling.interval_seconds, 15);
        assert_eq!(config.ngsi.limit, 200);
    }

    #[test]
    fn test_mock_flag_wins_over_base_url() {
        let config: MapConfig = toml::from_str(
            r#"
            [ngsi]
            base_url = "http://broker:1026"
            use_mock = true
        "#,
        )
        .unwrap();
        assert!(config.ngsi.uses_fixture());
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let config = PollingConfig { interval_seconds: 0 };
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_lat_lon() {
        assert_eq!(parse_lat_lon("59.3,18.0"), Some(Position::new(18.0, 59.3)));
        assert_eq!(parse_lat_lon(" 59.3 , 18.0 "), Some(Position::new(18.0, 59.3)));
        assert_eq!(parse_lat_lon("59.3"), None);
        assert_eq!(parse_lat_lon("north,east"), None);
        assert_eq!(parse_lat_lon("NaN,1"), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling]\ninterval_seconds = 5").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.polling.interval_seconds, 5);
    }

    #[test]
    fn test_load_config_reports_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling\ninterval_seconds = ").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let missing = load_config("/nonexistent/ngsi-map.toml").unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
