use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::drift::{DriftOptions, TieBreak};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub drift: DriftConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret_file: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub secret_file: Option<String>,
    pub tie_break: Option<TieBreak>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/release-drift/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(secret_file) = overrides.secret_file {
            self.auth.secret_file = secret_file;
        }
        if let Some(tie_break) = overrides.tie_break {
            self.drift.tie_break = tie_break;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn drift_options(&self) -> DriftOptions {
        DriftOptions {
            tie_break: self.drift.tie_break,
        }
    }

    /// Reads the token signing secret named by `auth.secret_file`.
    pub fn load_jwt_secret(&self) -> Result<String> {
        if self.auth.secret_file.trim().is_empty() {
            bail!("auth.secret_file is not set (use --jwt-secret-file or JWT_SECRET_FILE)");
        }
        let path = expand_tilde(&self.auth.secret_file);
        let secret = fs::read_to_string(&path)
            .with_context(|| format!("failed reading JWT secret: {}", path.display()))?;
        let secret = secret.trim().to_string();
        if secret.is_empty() {
            bail!("JWT secret file is empty: {}", path.display());
        }
        Ok(secret)
    }

    pub fn default_template() -> String {
        let template = r#"[server]
host = "0.0.0.0"
port = 3000

[storage]
db_path = "~/.local/share/release-drift/releases.db"

[auth]
# File holding the HS256 signing secret for session tokens.
secret_file = "~/.config/release-drift/jwt_secret"
token_ttl_minutes = 120

[drift]
# Which duplicate record wins per (name, account, region):
# "first_seen" (most recent insert) or "highest_version".
tie_break = "first_seen"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_file: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "~/.local/share/release-drift/releases.db".to_string()
}

fn default_token_ttl_minutes() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).unwrap();
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.auth.token_ttl_minutes, 120);
        assert_eq!(parsed.drift.tie_break, TieBreak::FirstSeen);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str("[drift]\ntie_break = \"highest_version\"\n").unwrap();
        assert_eq!(parsed.drift.tie_break, TieBreak::HighestVersion);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.storage.db_path, default_db_path());
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn overrides_replace_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            db_path: Some("/tmp/x.db".to_string()),
            secret_file: None,
            tie_break: Some(TieBreak::HighestVersion),
        });
        assert_eq!(config.resolved_db_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(config.drift_options().tie_break, TieBreak::HighestVersion);
        assert!(config.auth.secret_file.is_empty());
    }

    #[test]
    fn jwt_secret_is_trimmed_and_required() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        assert!(config.load_jwt_secret().is_err());

        let path = dir.path().join("secret");
        fs::write(&path, "  topsecret\n").unwrap();
        config.auth.secret_file = path.display().to_string();
        assert_eq!(config.load_jwt_secret().unwrap(), "topsecret");

        fs::write(&path, "\n").unwrap();
        assert!(config.load_jwt_secret().is_err());
    }
}
