// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExecError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ExecError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.environment))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_environments(cfg)?;
    validate_environment_ids(cfg)?;
    validate_env_entries(cfg)?;
    Ok(())
}

fn ensure_has_environments(cfg: &RawConfigFile) -> Result<()> {
    if cfg.environment.is_empty() {
        return Err(ExecError::ConfigError(
            "config must contain at least one [environment.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_environment_ids(cfg: &RawConfigFile) -> Result<()> {
    for id in cfg.environment.keys() {
        if id.trim().is_empty() {
            return Err(ExecError::ConfigError(
                "environment id must not be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ExecError::ConfigError(format!(
                "environment id '{}' must not contain whitespace",
                id
            )));
        }
    }
    Ok(())
}

fn validate_env_entries(cfg: &RawConfigFile) -> Result<()> {
    for (id, env) in cfg.environment.iter() {
        for entry in env.env.iter() {
            match entry.split_once('=') {
                Some((name, _)) if !name.is_empty() => {}
                _ => {
                    return Err(ExecError::ConfigError(format!(
                        "environment '{}' has invalid env entry '{}' (expected NAME=VALUE)",
                        id, entry
                    )));
                }
            }
        }
    }
    Ok(())
}
