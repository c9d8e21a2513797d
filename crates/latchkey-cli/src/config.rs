//! Configuration loading.
//!
//! Sources, highest priority first:
//!
//! 1. Command line arguments
//! 2. Environment variables (`LATCHKEY_*`)
//! 3. Config file (`--config`, TOML)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use latchkey_controller::{ControllerConfig, RepeatPolicy};
use latchkey_core::Credential;
use latchkey_hardware::DeviceBackend;

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub credential: Option<String>,
    pub audit_path: Option<PathBuf>,
    pub attach_timeout_ms: Option<u64>,
    pub channel: Option<u8>,
    pub open_position: Option<f64>,
    pub locked_position: Option<f64>,
    pub repeat_policy: Option<RepeatPolicy>,
    pub backend: Option<DeviceBackend>,
}

/// Read a TOML config file.
pub fn read_file(path: &Path) -> Result<ControllerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Load the file, if any, and apply overrides on top.
pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<ControllerConfig> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => ControllerConfig::default(),
    };

    if let Some(credential) = overrides.credential {
        config.credential =
            Some(Credential::new(&credential).context("invalid --credential value")?);
    }
    if let Some(audit_path) = overrides.audit_path {
        config.audit_path = audit_path;
    }
    if let Some(timeout) = overrides.attach_timeout_ms {
        config.attach_timeout_ms = timeout;
    }
    if let Some(channel) = overrides.channel {
        config.channel = channel;
    }
    if let Some(position) = overrides.open_position {
        config.open_position = position;
    }
    if let Some(position) = overrides.locked_position {
        config.locked_position = position;
    }
    if let Some(policy) = overrides.repeat_policy {
        config.repeat_policy = policy;
    }
    if let Some(backend) = overrides.backend {
        config.reader_backend = backend;
        config.actuator_backend = backend;
    }

    Ok(config)
}
