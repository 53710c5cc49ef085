//! Configuration
//!
//! Settings come from `config.toml` in the user's config directory (or an
//! explicit path), then environment variables override individual keys.
//! `.env` files are loaded by `main` before this runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{ClientConfig, DEFAULT_APPLICATION_NAME, DEFAULT_GRAPH_URL};
use crate::api::metadata::DescriptorRegistry;
use crate::api::query::Dialect;

pub const APP_DIR: &str = "sharepoint-cli";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site collection URL used for SharePoint REST and CSOM
    pub site_url: Option<String>,
    pub graph_url: Option<String>,
    pub access_token: Option<String>,
    pub graph_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub application_name: Option<String>,
    pub default_dialect: Option<Dialect>,
    /// Extra descriptor files merged over the built-in models
    pub descriptors: Vec<PathBuf>,
}

impl Config {
    /// `$CONFIG_DIR/sharepoint-cli/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `None`, then apply
    /// environment overrides. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    log::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SP_*` overrides from `lookup` (the process environment in
    /// production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SP_SITE_URL") {
            self.site_url = Some(url);
        }
        if let Some(url) = non_empty("SP_GRAPH_URL") {
            self.graph_url = Some(url);
        }
        if let Some(token) = non_empty("SP_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(token) = non_empty("SP_GRAPH_TOKEN") {
            self.graph_token = Some(token);
        }
        if let Some(secs) = non_empty("SP_TIMEOUT_SECS") {
            match secs.trim().parse() {
                Ok(secs) => self.timeout_secs = Some(secs),
                Err(_) => log::warn!("Ignoring invalid SP_TIMEOUT_SECS value '{}'", secs),
            }
        }
        if let Some(paths) = non_empty("SP_DESCRIPTORS") {
            self.descriptors = std::env::split_paths(&paths).collect();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }

    pub fn dialect(&self) -> Dialect {
        self.default_dialect.unwrap_or(Dialect::SharePointRest)
    }

    /// Client settings; the site URL is required for SharePoint REST and CSOM
    pub fn client_config(&self, dialect: Dialect) -> Result<ClientConfig> {
        let site_url = match (&self.site_url, dialect) {
            (Some(url), _) => url.clone(),
            (None, Dialect::Graph) => String::new(),
            (None, Dialect::SharePointRest) => anyhow::bail!(
                "No site URL configured. Set SP_SITE_URL or site_url in {}",
                Self::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| CONFIG_FILE.to_string())
            ),
        };

        let mut builder = ClientConfig::builder()
            .site_url(site_url)
            .graph_url(self.graph_url.as_deref().unwrap_or(DEFAULT_GRAPH_URL))
            .timeout(self.timeout())
            .application_name(
                self.application_name
                    .as_deref()
                    .unwrap_or(DEFAULT_APPLICATION_NAME),
            );
        if let Some(token) = &self.access_token {
            builder = builder.sharepoint_token(token.clone());
        }
        if let Some(token) = &self.graph_token {
            builder = builder.graph_token(token.clone());
        }
        Ok(builder.build())
    }

    /// Built-in descriptor tables plus every configured descriptor file
    pub fn registry(&self) -> Result<DescriptorRegistry> {
        let mut registry = DescriptorRegistry::builtin();
        for path in &self.descriptors {
            registry.extend_from_file(path)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config_file() {
        let config = Config::from_toml(
            r#"
site_url = "https://contoso.sharepoint.com/sites/dev"
timeout_secs = 10
default_dialect = "graph"
descriptors = ["models.toml"]
"#,
        )
        .unwrap();
        assert_eq!(config.site_url.as_deref(), Some("https://contoso.sharepoint.com/sites/dev"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.dialect(), Dialect::Graph);
        assert_eq!(config.descriptors, vec![PathBuf::from("models.toml")]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect(), Dialect::SharePointRest);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = Config::from_toml(r#"site_url = "https://old""#).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SP_SITE_URL", "https://new"),
            ("SP_ACCESS_TOKEN", "token"),
            ("SP_TIMEOUT_SECS", "not-a-number"),
            ("SP_GRAPH_TOKEN", "  "),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.site_url.as_deref(), Some("https://new"));
        assert_eq!(config.access_token.as_deref(), Some("token"));
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.graph_token, None);
    }

    #[test]
    fn test_client_config_requires_site_for_sharepoint() {
        let config = Config::default();
        assert!(config.client_config(Dialect::SharePointRest).is_err());

        let client = config.client_config(Dialect::Graph).unwrap();
        assert_eq!(client.graph_url, DEFAULT_GRAPH_URL);
        assert_eq!(client.application_name, DEFAULT_APPLICATION_NAME);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/sharepoint-cli.toml"))).is_err());
    }
}
