//! TOML configuration parsing and the per-request view configuration source.
//!
//! The full [`Config`] is loaded once at startup (server bind address and
//! backend endpoints). The `[view]` table is additionally exposed through
//! [`ConfigProvider`], which the view pipeline consults on every request so
//! that viewing mode and field changes apply without a restart.

use anyhow::{bail, Context, Result};
use docview_core::config::{ServerEndpoint, ViewConfig, ViewingMode};
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// ACI content backend that answers GetContent.
    pub content: BackendConfig,
    /// View server that renders documents.
    pub view_server: BackendConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(flatten)]
    pub endpoint: ServerEndpoint,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate_backend("content", &config.content)?;
    validate_backend("view_server", &config.view_server)?;
    validate_view(&config.view)?;

    Ok(config)
}

fn validate_backend(section: &str, backend: &BackendConfig) -> Result<()> {
    validate_endpoint(section, &backend.endpoint)?;
    if backend.timeout_secs == 0 {
        bail!("{}.timeout_secs must be > 0", section);
    }
    Ok(())
}

fn validate_endpoint(section: &str, endpoint: &ServerEndpoint) -> Result<()> {
    if endpoint.host.trim().is_empty() {
        bail!("{}.host must not be empty", section);
    }
    if endpoint.port == 0 {
        bail!("{}.port must be > 0", section);
    }
    Ok(())
}

/// Validate the `[view]` table on its own.
///
/// Also used by [`FileConfigProvider`] when re-reading the file.
pub fn validate_view(view: &ViewConfig) -> Result<()> {
    if view.reference_field.trim().is_empty() {
        bail!("view.reference_field must not be empty");
    }

    match (&view.viewing_mode, &view.connector) {
        (ViewingMode::Connector, None) => {
            bail!("view.connector must be specified when viewing_mode is 'connector'")
        }
        (_, Some(connector)) => validate_endpoint("view.connector", connector)?,
        _ => {}
    }

    Ok(())
}

/// Read-only source of the view configuration.
///
/// Implementations return a fresh snapshot on every call; callers must not
/// cache it across requests.
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> ViewConfig;
}

/// A provider that always returns the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    config: ViewConfig,
}

impl StaticConfigProvider {
    pub fn new(config: ViewConfig) -> Self {
        Self { config }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> ViewConfig {
        self.config.clone()
    }
}

/// A provider that serves the `[view]` table of the config file, reloading
/// it whenever the file changes.
///
/// Each call costs one `stat`; the file is only re-read when its
/// modification time or size differs from the last attempt. If the file
/// becomes unreadable or invalid, the last good configuration is served and
/// a warning is logged once per change.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    state: RwLock<ReloadState>,
}

#[derive(Debug)]
struct ReloadState {
    config: ViewConfig,
    /// Fingerprint of the last file version that was read, good or bad.
    seen: Option<Fingerprint>,
    failing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Deserialize)]
struct ViewSection {
    view: ViewConfig,
}

impl FileConfigProvider {
    /// Create a provider, reading the file once to establish a baseline.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen = Fingerprint::of(&path).ok();
        let initial = read_view_config(&path)?;
        Ok(Self {
            path,
            state: RwLock::new(ReloadState {
                config: initial,
                seen,
                failing: false,
            }),
        })
    }

    /// Create a provider seeded with an already-loaded configuration.
    ///
    /// The file is read again on the first call to [`ConfigProvider::current`].
    pub fn with_initial(path: impl Into<PathBuf>, initial: ViewConfig) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(ReloadState {
                config: initial,
                seen: None,
                failing: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn current(&self) -> ViewConfig {
        let fingerprint = match Fingerprint::of(&self.path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                let mut state = self.state.write();
                if !state.failing {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "view configuration unavailable, using last good"
                    );
                    state.failing = true;
                }
                state.seen = None;
                return state.config.clone();
            }
        };

        {
            let state = self.state.read();
            if state.seen.as_ref() == Some(&fingerprint) {
                return state.config.clone();
            }
        }

        let mut state = self.state.write();
        if state.seen.as_ref() == Some(&fingerprint) {
            return state.config.clone();
        }
        state.seen = Some(fingerprint);

        match read_view_config(&self.path) {
            Ok(config) => {
                if state.failing {
                    tracing::info!(path = %self.path.display(), "view configuration recovered");
                }
                tracing::debug!(path = %self.path.display(), "view configuration reloaded");
                state.failing = false;
                state.config = config;
            }
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "could not reload view configuration, using last good"
                );
                state.failing = true;
            }
        }
        state.config.clone()
    }
}

fn read_view_config(path: &Path) -> Result<ViewConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let section: ViewSection =
        toml::from_str(&content).with_context(|| "Failed to parse [view] section")?;
    validate_view(&section.view)?;
    Ok(section.view)
}
