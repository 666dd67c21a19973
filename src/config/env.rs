use super::MapConfig;
use tracing::warn;

/// Environment variables that override file settings.
pub const ENV_BASE_URL: &str = "NGSI_BASE_URL";
pub const ENV_USE_MOCK: &str = "NGSI_USE_MOCK";
pub const ENV_CONTEXT: &str = "NGSI_CONTEXT";
pub const ENV_POLL_INTERVAL: &str = "NGSI_POLL_INTERVAL_SECONDS";
pub const ENV_LOCATION: &str = "NGSI_LOCATION";

impl MapConfig {
    /// Apply overrides looked up through `var`.
    ///
    /// Unparsable values are ignored with a warning and the current setting
    /// is kept.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var(ENV_BASE_URL) {
            let v = v.trim();
            self.ngsi.base_url = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = var(ENV_USE_MOCK) {
            self.ngsi.use_mock = v.trim() == "true";
        }
        if let Some(v) = var(ENV_CONTEXT) {
            let v = v.trim();
            self.ngsi.context_url = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = var(ENV_POLL_INTERVAL) {
            match v.trim().parse::<u64>() {
                Ok(n) => self.polling.interval_seconds = n,
                Err(_) => warn!(key = ENV_POLL_INTERVAL, value = %v, "Ignoring invalid override"),
            }
        }
        if let Some(v) = var(ENV_LOCATION) {
            if super::parse_lat_lon(&v).is_some() {
                self.view.location = Some(v);
            } else {
                warn!(key = ENV_LOCATION, value = %v, "Ignoring invalid override");
            }
        }
    }
}
