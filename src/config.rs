//! Configuration and data-directory resolution.
//!
//! Resolution order:
//!   1. `--data-dir PATH`          (explicit override)
//!   2. `./apple-client-secret/`   (project-local, if it exists)
//!   3. `~/.apple-client-secret/`  (global default)

use anyhow::{Context, Result};
use apple_client_secret::Audience;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DIR_NAME: &str = "apple-client-secret";
const GLOBAL_DIR_NAME: &str = ".apple-client-secret";
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level config from `config.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Values shared by every profile unless the profile overrides them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub team_id: Option<String>,
    pub key_id: Option<String>,
    pub client_id: Option<String>,
    /// Inline PEM or a path to an `AuthKey_*.p8` file.
    pub private_key: Option<String>,
    pub lifetime: Option<i64>,
    pub audience: Option<Audience>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Profile {
    pub name: String,
    #[serde(flatten)]
    pub settings: Settings,
}

impl Settings {
    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: &Settings) -> Settings {
        Settings {
            team_id: self.team_id.or_else(|| fallback.team_id.clone()),
            key_id: self.key_id.or_else(|| fallback.key_id.clone()),
            client_id: self.client_id.or_else(|| fallback.client_id.clone()),
            private_key: self.private_key.or_else(|| fallback.private_key.clone()),
            lifetime: self.lifetime.or(fallback.lifetime),
            audience: self.audience.or_else(|| fallback.audience.clone()),
        }
    }
}

impl Config {
    /// Load config from a data directory.
    ///
    /// `private_key` values are kept as written; see [`resolve_key`].
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("invalid TOML in {}", path.display()))?;

        let mut seen = std::collections::HashSet::new();
        for profile in &cfg.profiles {
            if !seen.insert(profile.name.as_str()) {
                anyhow::bail!(
                    "duplicate profile '{}' in {}",
                    profile.name,
                    path.display()
                );
            }
        }

        Ok(cfg)
    }

    /// Load the config if the data directory has one.
    pub fn load_optional(data_dir: &Path) -> Result<Option<Self>> {
        if data_dir.join(CONFIG_FILE).exists() {
            Self::load(data_dir).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Effective settings for `profile`, or just `[defaults]` when `None`.
    pub fn settings(&self, profile: Option<&str>) -> Result<Settings> {
        let Some(name) = profile else {
            return Ok(self.defaults.clone());
        };
        let profile = self
            .profiles
            .iter()
            .find(|p| p.name == name)
            .with_context(|| format!("profile '{name}' not found in config"))?;
        Ok(profile.settings.clone().or(&self.defaults))
    }
}

/// Resolve the data directory.
///
/// Priority: explicit `--data-dir` > `./apple-client-secret/` > `~/.apple-client-secret/`
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }

    let local = PathBuf::from(DIR_NAME);
    if local.join(CONFIG_FILE).exists() {
        return Ok(std::fs::canonicalize(&local).unwrap_or(local));
    }

    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(GLOBAL_DIR_NAME))
}

/// Return the path to `init` into: `./apple-client-secret/` or `~/.apple-client-secret/`.
pub fn init_data_dir(global: bool) -> Result<PathBuf> {
    if global {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(home.join(GLOBAL_DIR_NAME))
    } else {
        Ok(PathBuf::from(DIR_NAME))
    }
}

/// Resolve a private key value: inline PEM, a bare base64 body, or a path.
///
/// Base64 never contains `.` or `~`, and a DER body always encodes to a
/// leading `M`, so a value with `.`/`~`, or with `/` but no leading `M`,
/// is a path. Relative paths are taken relative to `relative_to`.
pub fn resolve_key(value: &str, relative_to: &Path) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.contains("-----BEGIN") {
        return Ok(value.to_string());
    }
    if !looks_like_path(trimmed) {
        let path = relative_to.join(trimmed);
        if !path.is_file() {
            return Ok(value.to_string());
        }
    }

    let expanded = shellexpand::tilde(trimmed);
    let path = Path::new(expanded.as_ref());
    let path = if path.is_relative() {
        relative_to.join(path)
    } else {
        path.to_path_buf()
    };

    if path.is_file() {
        std::fs::read_to_string(&path)
            .with_context(|| format!("could not read key file: {}", path.display()))
    } else {
        anyhow::bail!("private key file not found: {}", path.display())
    }
}

fn looks_like_path(value: &str) -> bool {
    value.contains(['.', '~']) || (value.contains('/') && !value.starts_with('M'))
}

/// Template config for `init`.
pub const CONFIG_TEMPLATE: &str = r#"# apple-client-secret configuration
#
# Keys are created under Certificates, Identifiers & Profiles → Keys:
#   https://developer.apple.com/account/resources/authkeys/list

[defaults]
team_id     = "YOUR_TEAM_ID"
key_id      = "YOUR_KEY_ID"
private_key = "AuthKey_XXXXXXXXXX.p8"
# Seconds; at most 15777000 (six months).
lifetime    = 2592000

# One profile per client (Services ID or bundle ID).
# `audience = "none"` omits the aud claim entirely.

[[profiles]]
name      = "web"
client_id = "com.example.app.web"
audience  = "https://appleid.apple.com"
"#;
