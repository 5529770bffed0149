use std::path::{Path, PathBuf};

use crate::error::Error;

/// Default location of the change log, relative to the vault root.
const DEFAULT_LOG_PATH: &str = "link-maintainer-changes.md";

/// Vault configuration loaded from `.linkmend.toml`.
/// Include/exclude patterns are path prefixes applied to vault documents.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools, reason = "independent user-facing toggles")]
pub struct Config {
    /// Record change batches and write them to the log.
    pub enable_logging: bool,
    /// Path prefixes never scanned.
    exclude: Vec<String>,
    /// Rewrite block links even when the block still exists at its origin.
    pub force_override: bool,
    /// Path prefixes to scan; empty means everything.
    include: Vec<String>,
    /// Log destination, relative to the vault root.
    pub log_path: PathBuf,
    /// Ask before writing any document.
    pub require_confirmation: bool,
}

/// Raw TOML structure for `.linkmend.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkmendTomlConfig {
    #[serde(default = "enabled")]
    enable_logging: bool,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    force_override: bool,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default = "default_log_path")]
    log_path: PathBuf,
    #[serde(default = "enabled")]
    require_confirmation: bool,
}

impl Default for Config {
    /// Scan everything, log changes, ask before writing.
    fn default() -> Self {
        return Self {
            enable_logging: true,
            exclude: Vec::new(),
            force_override: false,
            include: Vec::new(),
            log_path: default_log_path(),
            require_confirmation: true,
        };
    }
}

impl Config {
    /// Load config from `.linkmend.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; a config the
    /// user wrote is never silently replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".linkmend.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: LinkmendTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            enable_logging: raw.enable_logging,
            exclude: raw.exclude,
            force_override: raw.force_override,
            include: raw.include,
            log_path: raw.log_path,
            require_confirmation: raw.require_confirmation,
        });
    }

    /// Check whether a document path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// The default log path as an owned path.
fn default_log_path() -> PathBuf {
    return PathBuf::from(DEFAULT_LOG_PATH);
}

/// Serde default for toggles that are on unless turned off.
const fn enabled() -> bool {
    return true;
}
