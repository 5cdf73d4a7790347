use crate::decode::FetchOptions;
use crate::render::gradient::GradientOverrides;
use crate::render::result_cache::{CacheConfig, CacheKeyPolicy};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "ACCENT_GRADIENT_CONFIG";

pub const DEFAULT_FALLBACK_GRADIENT: &str = "linear-gradient(135deg, rgb(24,24,27), rgb(9,9,11))";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Shown when a URL is empty or its extraction fails.
    #[serde(default = "default_fallback_gradient")]
    pub fallback_gradient: String,

    #[serde(default)]
    pub gradient: GradientOverrides,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub fetch: FetchOptions,
}

fn default_fallback_gradient() -> String {
    DEFAULT_FALLBACK_GRADIENT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_gradient: default_fallback_gradient(),
            gradient: GradientOverrides::default(),
            cache: CacheSection::default(),
            fetch: FetchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub capacity: Option<usize>,
    pub ttl_secs: Option<u64>,
    pub key_policy: CacheKeyPolicy,
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.capacity,
            ttl: self.ttl_secs.map(Duration::from_secs),
            key_policy: self.key_policy,
        }
    }
}

impl Config {
    /// Loads from `path`, or the default location when `None`. A missing file
    /// means defaults; a malformed one is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, raw).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// `$ACCENT_GRADIENT_CONFIG`, else `<config_dir>/accent-gradient/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(p) = std::env::var_os(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(p));
        }
        ProjectDirs::from("", "", "accent-gradient").map(|d| d.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.fetch.timeout_secs, 8);
        assert_eq!(cfg.cache.key_policy, CacheKeyPolicy::UrlAndOptions);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[gradient]
angle = 90.0

[cache]
capacity = 64
ttl_secs = 3600
key_policy = "url"

[fetch]
origin = "https://dashboard.example"
"#,
        )
        .unwrap();

        let cfg = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(cfg.gradient.angle, Some(90.0));
        assert_eq!(cfg.gradient.sample_rate, None);
        assert_eq!(cfg.fetch.origin.as_deref(), Some("https://dashboard.example"));
        assert_eq!(cfg.fetch.max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.fallback_gradient, DEFAULT_FALLBACK_GRADIENT);

        let cache = cfg.cache.to_cache_config();
        assert_eq!(cache.capacity, Some(64));
        assert_eq!(cache.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(cache.key_policy, CacheKeyPolicy::Url);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\ncapacity = \"lots\"\n").unwrap();
        let err = Config::load_or_default(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.cache.capacity = Some(10);
        cfg.gradient.min_contrast = Some(60.0);
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }
}
