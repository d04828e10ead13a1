use std::path::{Path, PathBuf};

use {
    serde::Deserialize,
    tracing::{debug, warn},
};

use ferrybot_telegram::TelegramConfig;

/// Config file name, checked in `./` then the user config dir.
const CONFIG_FILENAME: &str = "ferrybot.toml";

/// Top-level configuration. Every string value supports `${ENV_VAR}`
/// substitution, so the bot token can stay out of the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FerrybotConfig {
    pub telegram: TelegramConfig,
    pub relay: RelaySettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Seconds between registry polls while waiting for a topic-creation ack.
    pub poll_interval_secs: u64,
    /// Give up on a pending topic creation after this many seconds.
    pub max_wait_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            max_wait_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("ferrybot.db"),
        }
    }
}

/// Load config from the given path.
pub fn load_config(path: &Path) -> anyhow::Result<FerrybotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Load the explicit config path, or discover one in standard locations.
///
/// Search order: `./ferrybot.toml`, then `<user config dir>/ferrybot/`.
/// Falls back to defaults (which fail token validation with a clear message)
/// when no file exists.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<FerrybotConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        return load_config(&path);
    }

    warn!("no config file found, using defaults");
    Ok(FerrybotConfig::default())
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "ferrybot") {
        let global = dirs.config_dir().join(CONFIG_FILENAME);
        if global.exists() {
            return Some(global);
        }
    }

    None
}

/// Replace `${ENV_VAR}` placeholders in the raw config text.
///
/// Unresolvable variables are left as-is.
fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if closed && !var_name.is_empty() {
                match lookup(&var_name) {
                    Some(val) => result.push_str(&val),
                    None => {
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    },
                }
            } else {
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = FerrybotConfig::default();
        assert_eq!(cfg.relay.poll_interval_secs, 3);
        assert_eq!(cfg.relay.max_wait_secs, 300);
        assert_eq!(cfg.storage.database_path, PathBuf::from("ferrybot.db"));
        assert!(cfg.telegram.validate().is_err());
    }

    #[test]
    fn loads_a_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [telegram]
            token = "123:ABC"
            group_id = -1001234567890

            [relay]
            poll_interval_secs = 1

            [storage]
            database_path = "/tmp/relay.db"
            "#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.telegram.group_id, -1001234567890);
        assert_eq!(cfg.relay.poll_interval_secs, 1);
        // Unset sections keep their defaults.
        assert_eq!(cfg.relay.max_wait_secs, 300);
        assert_eq!(cfg.storage.database_path, PathBuf::from("/tmp/relay.db"));
    }

    #[test]
    fn substitutes_known_vars_and_keeps_unknown() {
        let lookup = |name: &str| match name {
            "FERRYBOT_TOKEN" => Some("123:ABC".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("token = \"${FERRYBOT_TOKEN}\"", lookup),
            "token = \"123:ABC\""
        );
        assert_eq!(
            substitute_env_with("token = \"${MISSING}\"", lookup),
            "token = \"${MISSING}\""
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        let lookup = |_: &str| None;
        assert_eq!(substitute_env_with("x = \"${OOPS", lookup), "x = \"${OOPS");
    }
}
