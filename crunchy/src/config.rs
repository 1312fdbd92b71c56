use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;

/// Client-side settings shared by every request built from a [`Context`](crate::Context).
#[serde_as]
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Base URL of the search engine, e.g. "http://localhost:9200"
    #[serde(default = "default_url")]
    pub url: String,
    /// Prepended to every index base name as `<prefix>_<name>`
    #[serde(default)]
    pub prefix: Option<String>,
    /// Local deadline for a single engine call, in seconds
    #[serde_as(as = "Option<serde_with::DurationSeconds<u64>>")]
    #[serde(default)]
    pub request_timeout: Option<Duration>,
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_scroll_batch_size")]
    pub scroll_batch_size: u64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,
    /// Strategy at the bottom of every [`StrategyStack`](crate::strategy::StrategyStack)
    #[serde(default = "default_root_strategy")]
    pub root_strategy: String,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_scroll_keep_alive() -> String {
    "1m".to_string()
}

fn default_scroll_batch_size() -> u64 {
    100
}

fn default_per_page() -> u64 {
    25
}

fn default_root_strategy() -> String {
    "base".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: default_url(),
            prefix: None,
            request_timeout: None,
            scroll_keep_alive: default_scroll_keep_alive(),
            scroll_batch_size: default_scroll_batch_size(),
            default_per_page: default_per_page(),
            root_strategy: default_root_strategy(),
        }
    }
}

impl Settings {
    /// The configured prefix, if it is not blank.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Reads settings from `<config_directory>/base.yaml`, an optional
/// `<config_directory>/<CRUNCHY_ENVIRONMENT>.yaml` and `CRUNCHY_*` environment
/// variables, later sources overriding earlier ones. Missing files are skipped.
pub fn read_config(config_directory: &Path) -> Result<Settings, config::ConfigError> {
    let environment = std::env::var("CRUNCHY_ENVIRONMENT").unwrap_or_else(|_| "local".into());
    let environment_filename = format!("{}.yaml", environment.to_lowercase());

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(config_directory.join(environment_filename)).required(false),
        )
        .add_source(
            config::Environment::with_prefix("CRUNCHY")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_source() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_config(dir.path()).unwrap();

        assert_eq!(settings.url, "http://localhost:9200");
        assert_eq!(settings.scroll_batch_size, 100);
        assert_eq!(settings.default_per_page, 25);
        assert_eq!(settings.root_strategy, "base");
        assert_eq!(settings.request_timeout, None);
    }

    #[test]
    fn reads_base_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "url: http://search:9200\nprefix: test\nrequest_timeout: 5\nscroll_batch_size: 50\n",
        )
        .unwrap();

        let settings = read_config(dir.path()).unwrap();
        assert_eq!(settings.url, "http://search:9200");
        assert_eq!(settings.prefix(), Some("test"));
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.scroll_batch_size, 50);
    }

    #[test]
    fn blank_prefix_is_ignored() {
        let settings = Settings {
            prefix: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.prefix(), None);
    }
}
