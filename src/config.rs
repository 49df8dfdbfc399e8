use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_REST_URL: &str = "https://api.rememberthemilk.com/services/rest/";
pub const DEFAULT_AUTH_URL: &str = "https://api.rememberthemilk.com/services/auth/";
pub const DEFAULT_HOME_URL: &str = "https://www.rememberthemilk.com";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tasklens", "tasklens")
}

fn default_config_dir() -> PathBuf {
    if let Some(dirs) = project_dirs() {
        return dirs.config_dir().to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".tasklens")
}

pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TASKLENS_CONFIG") {
        return PathBuf::from(path);
    }
    default_config_dir().join("config.toml")
}

/// Location of the persisted auth token.
pub fn token_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TASKLENS_TOKEN") {
        return PathBuf::from(path);
    }
    default_config_dir().join("token")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub rtm: RtmConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RtmConfig {
    pub api_key: String,
    pub shared_secret: String,
    pub perms: String,
    pub rest_url: String,
    pub auth_url: String,
    pub home_url: String,
}

impl Default for RtmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            shared_secret: String::new(),
            perms: "write".to_string(),
            rest_url: DEFAULT_REST_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            home_url: DEFAULT_HOME_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub staleness_seconds: i64,
    /// Empty keeps the cache in memory.
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness_seconds: 20,
            path: PathBuf::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub min_search_length: usize,
    pub icon_base: String,
    pub show_completed: bool,
    pub order: String,
    pub fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_search_length: 3,
            icon_base: "/usr/share/tasklens/icons/task".to_string(),
            show_completed: false,
            order: "priority".to_string(),
            fields: vec![
                "category".to_string(),
                "due".to_string(),
                "priority".to_string(),
            ],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub debug: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(config_path: &Path) -> Self {
        let mut config = if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config.toml ({config_path:?}), using defaults: {e}");
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        let changed = config.normalize();

        if changed || !config_path.exists() {
            if let Err(e) = config.save_to_path(config_path) {
                eprintln!("Could not write {config_path:?}: {e}");
            }
        }

        config
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).unwrap_or_default();
        fs::write(path, content)
    }

    fn normalize(&mut self) -> bool {
        let mut changed = false;

        if self.rtm.rest_url.trim().is_empty() {
            self.rtm.rest_url = DEFAULT_REST_URL.to_string();
            changed = true;
        }
        if self.rtm.auth_url.trim().is_empty() {
            self.rtm.auth_url = DEFAULT_AUTH_URL.to_string();
            changed = true;
        }
        if self.rtm.perms.trim().is_empty() {
            self.rtm.perms = "write".to_string();
            changed = true;
        }
        if self.cache.staleness_seconds < 0 {
            self.cache.staleness_seconds = CacheConfig::default().staleness_seconds;
            changed = true;
        }
        if !self.cache.path.as_os_str().is_empty() && self.cache.path.is_relative() {
            self.cache.path = default_config_dir().join(&self.cache.path);
            changed = true;
        }

        changed
    }

    pub fn has_credentials(&self) -> bool {
        !self.rtm.api_key.trim().is_empty() && !self.rtm.shared_secret.trim().is_empty()
    }
}
