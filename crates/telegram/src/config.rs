use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for the relay's bot account and its staff group.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Chat id of the staff supergroup (forum mode enabled). Negative for
    /// supergroups, e.g. `-1001234567890`.
    pub group_id: i64,
}

impl TelegramConfig {
    /// Startup validation; the bot cannot run with placeholder values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token.expose_secret().is_empty() {
            anyhow::bail!("telegram.token is not set");
        }
        if self.group_id == 0 {
            anyhow::bail!("telegram.group_id is not set");
        }
        Ok(())
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("group_id", &self.group_id)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            group_id: 0,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_from_toml() {
        let cfg: TelegramConfig = toml::from_str(
            r#"
            token = "123:ABC"
            group_id = -1001234567890
            "#,
        )
        .unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.group_id, -1001234567890);
        cfg.validate().unwrap();
    }

    #[test]
    fn default_config_fails_validation() {
        assert!(TelegramConfig::default().validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg: TelegramConfig = toml::from_str(r#"token = "123:ABC""#).unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("123:ABC"));
    }
}
