use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_CALLER_ID: &str = "+16812442941";
pub const DEFAULT_VOICE_URL: &str = "https://calling.shopiespot.com/voice.xml";
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";
pub const DEFAULT_CALL_DELAY_SECS: u64 = 3;

/// Runtime configuration for the calling side of the panel.
///
/// Credentials are mandatory; everything else falls back to the defaults
/// above. Values come from the process environment, which `load_dotenv`
/// seeds from a `.env` file when one exists.
#[derive(Clone)]
pub struct Config {
    pub account_sid: String,
    pub auth_token: String,
    pub caller_id: String,
    pub voice_url: String,
    pub api_base: String,
    pub call_delay: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("caller_id", &self.caller_id)
            .field("voice_url", &self.voice_url)
            .field("api_base", &self.api_base)
            .field("call_delay", &self.call_delay)
            .finish()
    }
}

/// Load `.env` from the working directory if present. A missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to parse .env"),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let account_sid = get("TWILIO_ACCOUNT_SID");
        let auth_token = get("TWILIO_AUTH_TOKEN");

        let mut missing = Vec::new();
        if account_sid.is_none() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if auth_token.is_none() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        let (Some(account_sid), Some(auth_token)) = (account_sid, auth_token) else {
            return Err(ConfigError::MissingCredentials { missing });
        };

        let call_delay = match get("CALLBOARD_CALL_DELAY_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        name: "CALLBOARD_CALL_DELAY_SECS",
                        value: raw.clone(),
                        message: e.to_string(),
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CALL_DELAY_SECS),
        };

        let caller_id = get("CALLBOARD_CALLER_ID").unwrap_or_else(|| DEFAULT_CALLER_ID.to_string());
        if !crate::panel::models::is_valid_number(&caller_id) {
            return Err(ConfigError::InvalidValue {
                name: "CALLBOARD_CALLER_ID",
                value: caller_id,
                message: "must start with + and be at least 10 characters".to_string(),
            });
        }

        Ok(Self {
            account_sid,
            auth_token,
            caller_id,
            voice_url: get("CALLBOARD_VOICE_URL").unwrap_or_else(|| DEFAULT_VOICE_URL.to_string()),
            api_base: get("TWILIO_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            call_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults_with_credentials_only() {
        let config = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.account_sid, "AC123");
        assert_eq!(config.caller_id, DEFAULT_CALLER_ID);
        assert_eq!(config.voice_url, DEFAULT_VOICE_URL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.call_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_config_missing_both_credentials() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        match err {
            ConfigError::MissingCredentials { missing } => {
                assert_eq!(missing, vec!["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN"]);
            }
            other => panic!("Expected MissingCredentials, got {:?}", other),
        }
    }

    #[test]
    fn test_config_blank_token_counts_as_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TWILIO_AUTH_TOKEN"));
        assert!(!err.to_string().contains("TWILIO_ACCOUNT_SID"));
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("CALLBOARD_CALLER_ID", "+15550001111"),
            ("CALLBOARD_VOICE_URL", "https://example.com/voice.xml"),
            ("CALLBOARD_CALL_DELAY_SECS", "0"),
            ("TWILIO_API_BASE", "http://127.0.0.1:9999/"),
        ]))
        .unwrap();
        assert_eq!(config.caller_id, "+15550001111");
        assert_eq!(config.voice_url, "https://example.com/voice.xml");
        assert_eq!(config.call_delay, Duration::ZERO);
        assert_eq!(config.api_base, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_config_rejects_bad_delay() {
        let err = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("CALLBOARD_CALL_DELAY_SECS", "three"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "CALLBOARD_CALL_DELAY_SECS", .. }
        ));
    }

    #[test]
    fn test_config_rejects_bad_caller_id() {
        let err = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("CALLBOARD_CALLER_ID", "6812442941"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "CALLBOARD_CALLER_ID", .. }
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "supersecret"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("<redacted>"));
    }
}
