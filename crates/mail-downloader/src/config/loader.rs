use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use encoding_rs::Encoding;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Directory under the platform config dir, e.g. `~/.config/mail-downloader`.
const APP_DIR_NAME: &str = "mail-downloader";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Parses a YAML document. An empty document yields the defaults.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// `./config.yml` if present, else the file in the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Values given on the command line. Each one replaces the config value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub mailbox: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub output: Option<PathBuf>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(server) = overrides.server {
            self.imap.server = server;
        }
        if let Some(port) = overrides.port {
            self.imap.port = port;
        }
        if let Some(username) = overrides.username {
            self.imap.username = username;
        }
        if let Some(password) = overrides.password {
            self.imap.password = Some(password);
        }
        if let Some(mailbox) = overrides.mailbox {
            self.imap.mailbox = mailbox;
        }
        if let Some(from) = overrides.from {
            self.range.from = Some(from);
        }
        if let Some(to) = overrides.to {
            self.range.to = Some(to);
        }
        if let Some(output) = overrides.output {
            self.output.directory = output;
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| ConfigError::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let imap = &config.imap;

    if imap.server.trim().is_empty() {
        return Err(validation("imap.server is required"));
    }
    if imap.port == 0 {
        return Err(validation("imap.port must be non-zero"));
    }
    if imap.username.trim().is_empty() {
        return Err(validation("imap.username is required"));
    }
    if imap.mailbox.trim().is_empty() {
        return Err(validation("imap.mailbox must not be empty"));
    }
    if !has_secret_source(
        imap.password.as_deref(),
        imap.password_file.as_deref(),
        imap.password_env_var.as_deref(),
    ) {
        return Err(validation(
            "one of imap.password, imap.passwordFile or imap.passwordEnvVar is required",
        ));
    }

    match (config.range.from, config.range.to) {
        (Some(from), Some(to)) if from >= to => {
            return Err(validation(format!(
                "range.from ({}) must be before range.to ({})",
                from, to
            )));
        }
        (Some(_), Some(_)) => {}
        (None, _) => return Err(validation("range.from is required")),
        (_, None) => return Err(validation("range.to is required")),
    }

    for (alias, target) in &config.charsets.aliases {
        if Encoding::for_label(target.trim().as_bytes()).is_none() {
            return Err(validation(format!(
                "charset alias '{}' points to unknown encoding '{}'",
                alias, target
            )));
        }
    }

    if config.fetch.channel_capacity == 0 {
        return Err(validation("fetch.channelCapacity must be greater than zero"));
    }

    if config.renderer.command.trim().is_empty() {
        return Err(validation("renderer.command must not be empty"));
    }

    Ok(())
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
