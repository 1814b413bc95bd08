//! Configuration management for the radi8 chat client
//!
//! Values come from built-in defaults, an optional `radi8c.toml` in the working
//! directory, then `RADI8C_*` environment variables, in that order of precedence.

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transfer::file_ops::default_download_dir;
use crate::transport::Endpoint;

const CONFIG_FILE: &str = "radi8c";
const ENV_PREFIX: &str = "RADI8C";

/// Connection and runtime settings for one client process
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    // ═══ CONNECTION (Environment Override Supported) ═══
    /// Server host name or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Wrap the socket in TLS
    pub use_tls: bool,

    /// Name sent with the authentication request
    pub username: String,

    /// Optional password; never written back anywhere
    pub password: Option<String>,

    // ═══ FILE TRANSFER ═══
    /// Where completed downloads land (defaults to ~/radi8-files)
    pub download_dir: Option<String>,

    // ═══ TIMING ═══
    pub connect_timeout_secs: u64,

    /// Upper bound on a single socket read before reporting "no data"
    pub receive_timeout_ms: u64,

    /// Period of the outgoing-chunk / finalization ticker
    pub tick_interval_ms: u64,

    /// How long to wait for `!apr:name` or `!err:name` after authenticating
    pub auth_timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from radi8c.toml (if present) with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX));

        Self::finish(builder)
    }

    /// Load configuration from an explicit file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?.add_source(File::from(path));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("host", "localhost")?
            .set_default("port", 1337_i64)?
            .set_default("use_tls", false)?
            .set_default("username", "")?
            .set_default("connect_timeout_secs", 10_i64)?
            .set_default("receive_timeout_ms", 100_i64)?
            .set_default("tick_interval_ms", 1_i64)?
            .set_default("auth_timeout_secs", 30_i64)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.host.trim().is_empty() {
            return Err(config::ConfigError::Message("host cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.username.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "username must be set (RADI8C_USERNAME or radi8c.toml)".into(),
            ));
        }

        if self.username.contains([':', '\n', '\r']) {
            return Err(config::ConfigError::Message(
                "username cannot contain ':' or line breaks".into(),
            ));
        }

        if self.connect_timeout_secs == 0
            || self.receive_timeout_ms == 0
            || self.tick_interval_ms == 0
            || self.auth_timeout_secs == 0
        {
            return Err(config::ConfigError::Message(
                "timeouts and intervals must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            secure: self.use_tls,
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        match &self.download_dir {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_download_dir(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radi8c.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let (_dir, path) = write_config("username = \"alice\"\n");
        let config = ClientConfig::load_from(&path).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1337);
        assert!(!config.use_tls);
        assert_eq!(config.password, None);
        assert_eq!(config.auth_timeout(), Duration::from_secs(30));
        assert_eq!(config.receive_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let (_dir, path) = write_config(
            "host = \"chat.example.org\"\nport = 7000\nuse_tls = true\nusername = \"bob\"\npassword = \"hunter2\"\ndownload_dir = \"/tmp/dl\"\n",
        );
        let config = ClientConfig::load_from(&path).unwrap();

        let endpoint = config.endpoint();
        assert_eq!(endpoint.host, "chat.example.org");
        assert_eq!(endpoint.port, 7000);
        assert!(endpoint.secure);
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/dl"));
    }

    #[test]
    fn test_missing_username_is_rejected() {
        let (_dir, path) = write_config("host = \"localhost\"\n");
        assert!(ClientConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let (_dir, path) = write_config("username = \"alice\"\nport = 0\n");
        assert!(ClientConfig::load_from(&path).is_err());
    }
}
