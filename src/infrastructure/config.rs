use crate::domain::{
    config::SipLineConfig,
    error::{SipLineError, SipLineResult},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PROJECT_DIR: &str = ".sipline";
const CONFIG_FILE: &str = "config.toml";

/// Locates, loads and saves SipLine configuration files.
///
/// The global file (`~/.config/sipline/config.toml`) holds every section.
/// A project file (`.sipline/config.toml`, found by walking up from the
/// working directory) overrides the `[connection]` and `[media]` sections.
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> SipLineResult<Self> {
        let global_config_path = Self::default_global_config_path()?;
        let project_config_path = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_project_config_path(&dir));

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager over explicit file locations
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Defaults, overlaid with the global file, overlaid with the project file
    pub fn load_config(&self) -> SipLineResult<SipLineConfig> {
        let mut config = SipLineConfig::default();

        if self.global_config_path.exists() {
            debug!("Loading global config from {}", self.global_config_path.display());
            config = self.load_config_from_path(&self.global_config_path)?;
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                debug!("Loading project config from {}", project_path.display());
                let project = self.load_config_from_path(project_path)?;
                config.connection = project.connection;
                config.media = project.media;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Write `config` to the global file, creating its directory as needed
    pub fn save_config(&self, config: &SipLineConfig) -> SipLineResult<()> {
        config.validate()?;
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SipLineError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }
        self.save_config_to_path(&self.global_config_path, config)
    }

    fn default_global_config_path() -> SipLineResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| SipLineError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("sipline").join(CONFIG_FILE))
    }

    /// Walk up from `start` looking for `.sipline/config.toml`
    pub fn find_project_config_path(start: &Path) -> Option<PathBuf> {
        let mut path = start;
        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            path = path.parent()?;
        }
    }

    pub fn load_config_from_path(&self, path: &Path) -> SipLineResult<SipLineConfig> {
        let content = fs::read_to_string(path).map_err(|e| SipLineError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SipLineError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    pub fn save_config_to_path(&self, path: &Path, config: &SipLineConfig) -> SipLineResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| SipLineError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| SipLineError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create `.sipline/config.toml` under `path` with default settings.
    /// Returns the file written.
    pub fn init_project_config(&self, path: &Path) -> SipLineResult<PathBuf> {
        let config_dir = path.join(PROJECT_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(SipLineError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| SipLineError::Config {
            message: format!("Failed to create {} directory: {}", PROJECT_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &SipLineConfig::default())?;
        Ok(config_file)
    }

    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_config_path.as_deref()
    }

    pub fn global_config_path(&self) -> &Path {
        &self.global_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> ConfigManager {
        ConfigManager::with_paths(dir.path().join("global").join(CONFIG_FILE), None)
    }

    #[test]
    fn test_load_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = manager_in(&dir).load_config().unwrap();

        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.max_sessions, 1);
        assert_eq!(config.connection.reconnection_attempts, 3);
    }

    #[test]
    fn test_save_then_load_global() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);
        let mut config = SipLineConfig::default();
        config.global.max_sessions = 3;
        config.connection.server_url = "wss://pbx.example.com/ws".to_string();

        manager.save_config(&config).unwrap();
        let loaded = manager.load_config().unwrap();

        assert_eq!(loaded.global.max_sessions, 3);
        assert_eq!(loaded.connection.server_url, "wss://pbx.example.com/ws");
    }

    #[test]
    fn test_project_overrides_connection() {
        let dir = TempDir::new().unwrap();
        let global_path = dir.path().join("global.toml");
        fs::write(
            &global_path,
            "[global]\nmax_sessions = 2\n[connection]\nserver_url = \"wss://global.example.com\"\n",
        )
        .unwrap();

        let project_root = dir.path().join("project");
        let manager = ConfigManager::with_paths(global_path, None);
        let project_path = manager.init_project_config(&project_root).unwrap();
        fs::write(
            &project_path,
            "[connection]\nserver_url = \"wss://project.example.com\"\n",
        )
        .unwrap();

        let manager = ConfigManager::with_paths(
            manager.global_config_path().to_path_buf(),
            Some(project_path),
        );
        let config = manager.load_config().unwrap();
        assert_eq!(config.global.max_sessions, 2);
        assert_eq!(config.connection.server_url, "wss://project.example.com");
    }

    #[test]
    fn test_init_project_config_once() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);

        let path = manager.init_project_config(dir.path()).unwrap();
        assert!(path.ends_with(".sipline/config.toml"));
        assert!(matches!(
            manager.init_project_config(dir.path()),
            Err(SipLineError::Config { .. })
        ));
    }

    #[test]
    fn test_find_project_config_walks_up() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);
        manager.init_project_config(dir.path()).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = ConfigManager::find_project_config_path(&nested).unwrap();
        assert_eq!(found, dir.path().join(PROJECT_DIR).join(CONFIG_FILE));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[global]\nmax_sessions = 0\n").unwrap();

        let manager = ConfigManager::with_paths(path, None);
        assert!(matches!(manager.load_config(), Err(SipLineError::Config { .. })));
    }
}
