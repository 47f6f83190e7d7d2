use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::duckduckgo::DEFAULT_SEARCH_BASE_URL;
use crate::tools::terminal::MAX_TIMEOUT_SECS;
use crate::tools::{ToolSettings, Variant};

pub const DEFAULT_CONFIG_FILE: &str = "crew-mcp.toml";
pub const API_KEY_PLACEHOLDER: &str = "your_openai_api_key_here";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How the tool server is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: String, // "stdio" or "server"
    pub port: u16,
    pub tools_variant: String,
    pub tools_root: Option<PathBuf>,
    pub command_timeout_secs: u64,
    pub search_base_url: String,
    pub crew_engine_cmd: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    /// File the values were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: "stdio".into(),
            port: 8080,
            tools_variant: Variant::Simple.as_str().into(),
            tools_root: None,
            command_timeout_secs: 30,
            search_base_url: DEFAULT_SEARCH_BASE_URL.into(),
            crew_engine_cmd: None,
            openai_api_key: None,
            source: None,
        }
    }
}

fn env_nonempty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env_nonempty(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

impl Config {
    /// File layer (`CREW_MCP_CONFIG`, else `./crew-mcp.toml` when present)
    /// overlaid by environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = env_nonempty("CREW_MCP_CONFIG").map(PathBuf::from);
        let mut cfg = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(mode) = env_nonempty("MODE") {
            self.mode = mode;
        }
        if let Some(port) = env_parsed::<u16>("PORT")? {
            self.port = port;
        }
        if let Some(variant) = env_nonempty("TOOLS_VARIANT") {
            self.tools_variant = variant;
        }
        if let Some(root) = env_nonempty("TOOLS_ROOT") {
            self.tools_root = Some(PathBuf::from(root));
        }
        if let Some(secs) = env_parsed::<u64>("COMMAND_TIMEOUT_SECS")? {
            self.command_timeout_secs = secs;
        }
        if let Some(url) = env_nonempty("SEARCH_BASE_URL") {
            self.search_base_url = url;
        }
        if let Some(cmd) = env_nonempty("CREW_ENGINE_CMD") {
            self.crew_engine_cmd = Some(cmd);
        }
        if let Some(key) = env_nonempty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        Ok(())
    }

    pub fn transport(&self) -> Result<Transport, ConfigError> {
        match self.mode.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "server" | "http" => Ok(Transport::Server),
            other => Err(ConfigError::Invalid(format!(
                "unknown mode '{other}' (expected 'stdio' or 'server')"
            ))),
        }
    }

    pub fn variant(&self) -> Result<Variant, ConfigError> {
        self.tools_variant.parse::<Variant>().map_err(ConfigError::Invalid)
    }

    /// The API key, unless it is missing or still the template placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_PLACEHOLDER)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let transport = self.transport()?;
        self.variant()?;
        if transport == Transport::Server && self.port == 0 {
            return Err(ConfigError::Invalid("PORT must be non-zero in server mode".into()));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.command_timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "COMMAND_TIMEOUT_SECS must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        if !(self.search_base_url.starts_with("http://") || self.search_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "SEARCH_BASE_URL '{}' is not an http(s) URL",
                self.search_base_url
            )));
        }
        if let Some(root) = &self.tools_root {
            if !root.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "TOOLS_ROOT '{}' is not a directory",
                    root.display()
                )));
            }
        }
        Ok(())
    }

    pub fn tool_settings(&self) -> ToolSettings {
        let defaults = ToolSettings::default();
        ToolSettings {
            root: self.tools_root.clone().unwrap_or(defaults.root),
            command_timeout_secs: self.command_timeout_secs,
            search_base_url: self.search_base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "CREW_MCP_CONFIG",
        "MODE",
        "PORT",
        "TOOLS_VARIANT",
        "TOOLS_ROOT",
        "COMMAND_TIMEOUT_SECS",
        "SEARCH_BASE_URL",
        "CREW_ENGINE_CMD",
        "OPENAI_API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_to_stdio_simple_8080() {
        clear_env();
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.transport().unwrap(), Transport::Stdio);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.variant().unwrap(), Variant::Simple);
        assert_eq!(cfg.command_timeout_secs, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        clear_env();
        std::env::set_var("MODE", "server");
        std::env::set_var("PORT", "9090");
        std::env::set_var("TOOLS_VARIANT", "terminal");
        std::env::set_var("COMMAND_TIMEOUT_SECS", "5");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.transport().unwrap(), Transport::Server);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.variant().unwrap(), Variant::Terminal);
        assert_eq!(cfg.tool_settings().command_timeout_secs, 5);
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_unparsable_port() {
        clear_env();
        std::env::set_var("PORT", "eighty");
        let err = Config::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
        clear_env();
    }

    #[test]
    #[serial]
    fn file_layer_is_overridden_by_env() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crew.toml");
        std::fs::write(&path, "mode = \"server\"\nport = 7000\ntools_variant = \"filesystem\"\n").unwrap();
        std::env::set_var("CREW_MCP_CONFIG", &path);
        std::env::set_var("PORT", "7001");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.mode, "server");
        assert_eq!(cfg.port, 7001);
        assert_eq!(cfg.tools_variant, "filesystem");
        assert_eq!(cfg.source.as_deref(), Some(path.as_path()));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        clear_env();
        std::env::set_var("CREW_MCP_CONFIG", "/definitely/not/here.toml");
        assert!(matches!(Config::load().unwrap_err(), ConfigError::Read { .. }));
        clear_env();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = Config { mode: "carrier-pigeon".into(), ..Config::default() };
        assert!(cfg.validate().is_err());
        let cfg = Config { mode: "server".into(), port: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
        let cfg = Config { command_timeout_secs: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
        let cfg = Config { search_base_url: "ftp://x".into(), ..Config::default() };
        assert!(cfg.validate().is_err());
        let cfg = Config { tools_root: Some("/definitely/not/here".into()), ..Config::default() };
        assert!(cfg.validate().is_err());
        let cfg = Config { tools_variant: "quantum".into(), ..Config::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn placeholder_api_key_counts_as_missing() {
        let cfg = Config { openai_api_key: Some(API_KEY_PLACEHOLDER.into()), ..Config::default() };
        assert_eq!(cfg.api_key(), None);
        let cfg = Config { openai_api_key: Some("sk-test".into()), ..Config::default() };
        assert_eq!(cfg.api_key(), Some("sk-test"));
    }
}
