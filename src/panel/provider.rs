use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::models::PhoneNumber;
use crate::config::Config;
use crate::errors::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("callboard/", env!("CARGO_PKG_VERSION"));

/// Parameters for one outbound call.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub to: PhoneNumber,
    /// Caller ID presented to the callee.
    pub from: String,
    /// TwiML document the provider fetches once the callee answers.
    pub url: String,
}

/// Abstraction over the voice-call vendor.
/// Real implementation: `TwilioClient`. Tests use scripted fakes.
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Ask the provider to place a call. Returns the provider's call SID.
    async fn create_call(&self, request: &CallRequest) -> Result<String, ProviderError>;
}

/// Subset of Twilio's Call resource we care about.
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Twilio's error body for non-2xx responses.
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for Twilio's REST `Calls` resource.
pub struct TwilioClient {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Transport)?;
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl CallProvider for TwilioClient {
    async fn create_call(&self, request: &CallRequest) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header("Accept", "application/json")
            .form(&[
                ("To", request.to.as_str()),
                ("From", request.from.as_str()),
                ("Url", request.url.as_str()),
            ])
            .send()
            .await
            .map_err(ProviderError::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(ProviderError::Transport)?;

        if !status.is_success() {
            let parsed: Option<TwilioErrorBody> = serde_json::from_str(&body).ok();
            let code = parsed.as_ref().and_then(|b| b.code);
            let message = parsed
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        body.trim().to_string()
                    }
                });
            return Err(ProviderError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let call: CallResource = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("could not parse call resource: {}", e))
        })?;
        tracing::debug!(
            sid = %call.sid,
            status = call.status.as_deref().unwrap_or("unknown"),
            to = %request.to,
            "provider accepted call"
        );
        Ok(call.sid)
    }
}
