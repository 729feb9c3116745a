use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "REPO_GALLERY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            folder: String::new(),
            branch: default_branch(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    /// `owner/repo`, as shown in the title bar and the about dialog.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

fn default_owner() -> String {
    "mayank19o7".into()
}

fn default_repo() -> String {
    "wallpapers".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".into()
}

fn default_user_agent() -> String {
    format!("repo-gallery/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_search_debounce", with = "humantime_serde")]
    pub search_debounce: Duration,
    #[serde(default = "default_reveal_delay", with = "humantime_serde")]
    pub reveal_delay: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            search_debounce: default_search_debounce(),
            reveal_delay: default_reveal_delay(),
        }
    }
}

fn default_search_debounce() -> Duration {
    Duration::from_millis(200)
}

fn default_reveal_delay() -> Duration {
    Duration::from_millis(300)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: usize,
    #[serde(default = "default_media_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_cache_bytes: default_max_cache_bytes(),
            timeout: default_media_timeout(),
        }
    }
}

fn default_workers() -> usize {
    2
}

fn default_max_cache_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_media_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DownloadConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl DownloadConfig {
    /// Configured directory, else the platform download dir, else `.`.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("repo-gallery").join("repo-gallery.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        anyhow::ensure!(
            path.exists(),
            "config: file {} does not exist",
            path.display()
        );
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.source.owner.is_empty() {
        base.source.owner = other.source.owner;
    }
    if !other.source.repo.is_empty() {
        base.source.repo = other.source.repo;
    }
    base.source.folder = other.source.folder;
    if !other.source.branch.is_empty() {
        base.source.branch = other.source.branch;
    }
    if !other.source.api_base.is_empty() {
        base.source.api_base = other.source.api_base;
    }
    if !other.source.raw_base.is_empty() {
        base.source.raw_base = other.source.raw_base;
    }
    if !other.source.user_agent.is_empty() {
        base.source.user_agent = other.source.user_agent;
    }

    base.ui.search_debounce = other.ui.search_debounce;
    base.ui.reveal_delay = other.ui.reveal_delay;

    if other.media.workers != 0 {
        base.media.workers = other.media.workers;
    }
    if other.media.max_cache_bytes != 0 {
        base.media.max_cache_bytes = other.media.max_cache_bytes;
    }
    if !other.media.timeout.is_zero() {
        base.media.timeout = other.media.timeout;
    }

    if other.download.dir.is_some() {
        base.download.dir = other.download.dir;
    }

    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "source.owner" => cfg.source.owner = value,
        "source.repo" => cfg.source.repo = value,
        "source.folder" => cfg.source.folder = value,
        "source.branch" => cfg.source.branch = value,
        "source.api_base" => cfg.source.api_base = value,
        "source.raw_base" => cfg.source.raw_base = value,
        "source.user_agent" => cfg.source.user_agent = value,
        "ui.search_debounce" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.search_debounce = duration;
            }
        }
        "ui.reveal_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.reveal_delay = duration;
            }
        }
        "media.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.workers = parsed;
            }
        }
        "media.max_cache_bytes" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.max_cache_bytes = parsed;
            }
        }
        "media.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.media.timeout = duration;
            }
        }
        "download.dir" => cfg.download.dir = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repo-gallery").join("config.yaml"))
}

pub fn to_yaml(cfg: &Config) -> Result<String> {
    serde_yaml::to_string(cfg).context("config: failed to serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: None,
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated("RG_TEST_DEFAULTS")).unwrap();
        assert_eq!(cfg.source.owner, "mayank19o7");
        assert_eq!(cfg.source.repo, "wallpapers");
        assert_eq!(cfg.source.branch, "main");
        assert_eq!(cfg.source.folder, "");
        assert_eq!(cfg.ui.search_debounce, Duration::from_millis(200));
        assert_eq!(cfg.source.slug(), "mayank19o7/wallpapers");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "source:\n  owner: octo\n  repo: pics\n  folder: art/2024\nui:\n  search_debounce: 350ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("RG_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.source.owner, "octo");
        assert_eq!(cfg.source.repo, "pics");
        assert_eq!(cfg.source.folder, "art/2024");
        assert_eq!(cfg.source.branch, "main");
        assert_eq!(cfg.ui.search_debounce, Duration::from_millis(350));
        assert_eq!(cfg.ui.reveal_delay, Duration::from_millis(300));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load(LoadOptions {
            config_file: Some(dir.path().join("nope.yaml")),
            env_prefix: Some("RG_TEST_MISSING".into()),
        });
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("RG_TEST_ENV_SOURCE__BRANCH", "gh-pages");
        env::set_var("RG_TEST_ENV_MEDIA__WORKERS", "5");
        env::set_var("RG_TEST_ENV_UI__REVEAL_DELAY", "1s");
        let cfg = load(isolated("RG_TEST_ENV")).unwrap();
        assert_eq!(cfg.source.branch, "gh-pages");
        assert_eq!(cfg.media.workers, 5);
        assert_eq!(cfg.ui.reveal_delay, Duration::from_secs(1));
        env::remove_var("RG_TEST_ENV_SOURCE__BRANCH");
        env::remove_var("RG_TEST_ENV_MEDIA__WORKERS");
        env::remove_var("RG_TEST_ENV_UI__REVEAL_DELAY");
    }

    #[test]
    fn yaml_round_trip_keeps_durations_readable() {
        let yaml = to_yaml(&Config::default()).unwrap();
        assert!(yaml.contains("search_debounce: 200ms"), "yaml was: {yaml}");
    }
}
