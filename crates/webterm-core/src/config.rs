use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub shell: ShellConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.config/webterm/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webterm")
            .join("config.toml")
    }

    /// Apply environment variable overrides on top of the loaded file.
    ///
    /// `WEBTERM_PASS_KEY` (or `PASS_KEY`) sets the shared secret;
    /// `WEBTERM_PORT` (or `PORT`) sets the listen port. Environment wins
    /// over the file; CLI flags are applied after this and win over both.
    pub fn apply_env(&mut self) {
        if let Ok(key) =
            std::env::var("WEBTERM_PASS_KEY").or_else(|_| std::env::var("PASS_KEY"))
        {
            if !key.is_empty() {
                self.server.pass_key = Some(key);
            }
        }

        if let Ok(port) = std::env::var("WEBTERM_PORT").or_else(|_| std::env::var("PORT")) {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => {
                    tracing::warn!("Ignoring unparseable port in environment: {:?}", port)
                }
            }
        }
    }
}

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Shared secret for the websocket gate (None = all upgrades rejected).
    pub pass_key: Option<String>,
    /// Directory the terminal UI is served from.
    pub static_dir: PathBuf,
    /// Enable CORS.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            pass_key: None,
            static_dir: PathBuf::from("web"),
            cors: true,
        }
    }
}

/// Shell selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell executable to spawn (None = autodetect, preferring $SHELL).
    pub program: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("127.0.0.1"));
        assert!(toml_str.contains("8080"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.server.pass_key, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\npass_key = \"hunter2\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.pass_key.as_deref(), Some("hunter2"));
        // Unspecified fields fall back to defaults.
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_env_overrides() {
        // One test touches the process environment to avoid races between
        // parallel test threads.
        std::env::set_var("WEBTERM_PASS_KEY", "from-env");
        std::env::set_var("WEBTERM_PORT", "9999");

        let mut config = AppConfig::default();
        config.apply_env();
        assert_eq!(config.server.pass_key.as_deref(), Some("from-env"));
        assert_eq!(config.server.port, 9999);

        // A garbage port is ignored, the previous value stays.
        std::env::set_var("WEBTERM_PORT", "not-a-port");
        config.apply_env();
        assert_eq!(config.server.port, 9999);

        std::env::remove_var("WEBTERM_PASS_KEY");
        std::env::remove_var("WEBTERM_PORT");
    }
}
