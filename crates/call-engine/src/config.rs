//! Engine configuration
//!
//! All settings come from `SWITCHBOARD_`-prefixed environment variables at
//! startup. Missing required values are collected and reported together so
//! an operator fixes the environment in one pass; any such error is fatal.

use std::time::Duration;

use switchboard_provider_core::{PhoneConfig, PhoneProviderKind, SttConfig, TtsConfig, TtsProviderKind};

use crate::error::{EngineError, EngineResult};

const ENV_PREFIX: &str = "SWITCHBOARD_";

const DEFAULT_WEBHOOK_PORT: u16 = 3333;
const DEFAULT_API_PORT: u16 = 3334;
const DEFAULT_SILENCE_MS: u64 = 2000;
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_DEADLINE: Duration = Duration::from_secs(60);
const DEFAULT_CALL_WATCHDOG: Duration = Duration::from_secs(360);
const DEFAULT_ELABORATION_THRESHOLD: usize = 10;

/// Runtime configuration for the call engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub phone_provider: PhoneProviderKind,
    /// Twilio Account SID or Telnyx Connection ID
    pub phone_account_sid: String,
    /// Twilio Auth Token or Telnyx API key
    pub phone_auth_token: String,
    /// Number calls are placed from
    pub phone_number: String,
    /// Default destination, changeable at runtime through the control API
    pub user_phone_number: String,
    pub telnyx_public_key: Option<String>,

    pub tts_provider: TtsProviderKind,
    pub openai_api_key: String,
    pub elevenlabs_api_key: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_model: Option<String>,
    pub stt_model: Option<String>,

    /// Externally reachable base URL the carrier calls back on
    pub public_url: String,
    pub webhook_port: u16,
    pub api_port: u16,

    /// Inactivity after which a listen is considered complete
    pub silence_threshold: Duration,
    /// Absolute ceiling on one listen
    pub response_timeout: Duration,
    /// How long a dial may take to reach a live media stream
    pub connect_deadline: Duration,
    /// Absolute per-call lifetime, activity-independent
    pub call_watchdog: Duration,
    /// Replies shorter than this many words trigger one elaboration prompt
    pub elaboration_threshold: usize,
}

impl EngineConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let mut missing: Vec<String> = Vec::new();

        let phone_provider = match lookup("PHONE_PROVIDER") {
            Some(value) => value
                .parse::<PhoneProviderKind>()
                .map_err(EngineError::Config)?,
            None => PhoneProviderKind::Telnyx,
        };
        let tts_provider = match lookup("TTS_PROVIDER") {
            Some(value) => value.parse::<TtsProviderKind>().map_err(EngineError::Config)?,
            None => TtsProviderKind::OpenAi,
        };

        // Credential names depend on the carrier; say which one is missing.
        let (sid_desc, token_desc) = match phone_provider {
            PhoneProviderKind::Twilio => ("Twilio Account SID", "Twilio Auth Token"),
            PhoneProviderKind::Telnyx => ("Telnyx Connection ID", "Telnyx API key"),
        };

        let mut required = |name: &str, description: &str| -> String {
            match lookup(name) {
                Some(value) if !value.is_empty() => value,
                _ => {
                    missing.push(format!("{ENV_PREFIX}{name} ({description})"));
                    String::new()
                }
            }
        };

        let phone_account_sid = required("PHONE_ACCOUNT_SID", sid_desc);
        let phone_auth_token = required("PHONE_AUTH_TOKEN", token_desc);
        let phone_number = required("PHONE_NUMBER", "number calls are placed from");
        let user_phone_number = required("USER_PHONE_NUMBER", "default destination number");
        let openai_api_key = required("OPENAI_API_KEY", "required for transcription");
        let public_url = required("PUBLIC_URL", "externally reachable base URL");

        let telnyx_public_key = lookup("TELNYX_PUBLIC_KEY");
        if phone_provider == PhoneProviderKind::Telnyx && telnyx_public_key.is_none() {
            missing.push(format!(
                "{ENV_PREFIX}TELNYX_PUBLIC_KEY (webhook verification key, required for Telnyx)"
            ));
        }

        let elevenlabs_api_key = lookup("ELEVENLABS_API_KEY");
        if tts_provider == TtsProviderKind::ElevenLabs && elevenlabs_api_key.is_none() {
            missing.push(format!(
                "{ENV_PREFIX}ELEVENLABS_API_KEY (required when the TTS provider is elevenlabs)"
            ));
        }

        if !missing.is_empty() {
            return Err(EngineError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let parse_u64 = |name: &str, value: String| -> EngineResult<u64> {
            value
                .parse::<u64>()
                .map_err(|_| EngineError::Config(format!("{ENV_PREFIX}{name} is not a number: {value}")))
        };
        let silence_ms = match lookup("SILENCE_MS") {
            Some(value) => parse_u64("SILENCE_MS", value)?,
            None => DEFAULT_SILENCE_MS,
        };
        let parse_port = |name: &str, value: String| -> EngineResult<u16> {
            value
                .parse::<u16>()
                .map_err(|_| EngineError::Config(format!("{ENV_PREFIX}{name} is not a valid port: {value}")))
        };
        let webhook_port = match lookup("WEBHOOK_PORT") {
            Some(value) => parse_port("WEBHOOK_PORT", value)?,
            None => DEFAULT_WEBHOOK_PORT,
        };
        let api_port = match lookup("API_PORT") {
            Some(value) => parse_port("API_PORT", value)?,
            None => DEFAULT_API_PORT,
        };

        Ok(Self {
            phone_provider,
            phone_account_sid,
            phone_auth_token,
            phone_number,
            user_phone_number,
            telnyx_public_key,
            tts_provider,
            openai_api_key,
            elevenlabs_api_key,
            tts_voice: lookup("TTS_VOICE"),
            tts_model: lookup("TTS_MODEL"),
            stt_model: lookup("STT_MODEL"),
            public_url: public_url.trim_end_matches('/').to_string(),
            webhook_port,
            api_port,
            silence_threshold: Duration::from_millis(silence_ms),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            connect_deadline: DEFAULT_CONNECT_DEADLINE,
            call_watchdog: DEFAULT_CALL_WATCHDOG,
            elaboration_threshold: DEFAULT_ELABORATION_THRESHOLD,
        })
    }

    /// Carrier credentials for the provider factory
    pub fn phone_config(&self) -> PhoneConfig {
        PhoneConfig {
            kind: self.phone_provider,
            account_sid: self.phone_account_sid.clone(),
            auth_token: self.phone_auth_token.clone(),
            telnyx_public_key: self.telnyx_public_key.clone(),
        }
    }

    /// Synthesis settings for the provider factory
    pub fn tts_config(&self) -> TtsConfig {
        TtsConfig {
            kind: self.tts_provider,
            api_key: match self.tts_provider {
                TtsProviderKind::OpenAi => self.openai_api_key.clone(),
                TtsProviderKind::ElevenLabs => {
                    self.elevenlabs_api_key.clone().unwrap_or_default()
                }
            },
            voice: self.tts_voice.clone(),
            model: self.tts_model.clone(),
        }
    }

    /// Recognition settings for the provider factory
    pub fn stt_config(&self) -> SttConfig {
        SttConfig {
            api_key: self.openai_api_key.clone(),
            model: self.stt_model.clone(),
        }
    }

    /// The answer webhook URL the carrier fetches when the call is answered
    pub fn answer_url(&self) -> String {
        format!("{}/voice", self.public_url)
    }

    /// The status callback URL for carrier lifecycle events
    pub fn status_url(&self) -> String {
        format!("{}/status", self.public_url)
    }

    /// The WebSocket URL the carrier opens the media stream against
    pub fn stream_url(&self) -> String {
        let host = self
            .public_url
            .strip_prefix("https://")
            .or_else(|| self.public_url.strip_prefix("http://"))
            .unwrap_or(&self.public_url);
        format!("wss://{host}/media-stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PHONE_PROVIDER", "twilio"),
            ("PHONE_ACCOUNT_SID", "AC1"),
            ("PHONE_AUTH_TOKEN", "tok"),
            ("PHONE_NUMBER", "+15550001111"),
            ("USER_PHONE_NUMBER", "+15550002222"),
            ("OPENAI_API_KEY", "sk-test"),
            ("PUBLIC_URL", "https://example.ngrok.app/"),
        ])
    }

    fn load(vars: &HashMap<&str, &str>) -> EngineResult<EngineConfig> {
        EngineConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.phone_provider, PhoneProviderKind::Twilio);
        assert_eq!(config.tts_provider, TtsProviderKind::OpenAi);
        assert_eq!(config.webhook_port, 3333);
        assert_eq!(config.api_port, 3334);
        assert_eq!(config.silence_threshold, Duration::from_millis(2000));
        assert_eq!(config.response_timeout, Duration::from_secs(60));
        assert_eq!(config.call_watchdog, Duration::from_secs(360));
        assert_eq!(config.elaboration_threshold, 10);
        // Trailing slash is normalized away.
        assert_eq!(config.public_url, "https://example.ngrok.app");
        assert_eq!(config.answer_url(), "https://example.ngrok.app/voice");
        assert_eq!(config.stream_url(), "wss://example.ngrok.app/media-stream");
    }

    #[test]
    fn collects_all_missing_variables() {
        let mut vars = base_vars();
        vars.remove("PHONE_ACCOUNT_SID");
        vars.remove("OPENAI_API_KEY");
        let error = load(&vars).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("SWITCHBOARD_PHONE_ACCOUNT_SID"));
        assert!(message.contains("SWITCHBOARD_OPENAI_API_KEY"));
    }

    #[test]
    fn telnyx_requires_public_key() {
        let mut vars = base_vars();
        vars.insert("PHONE_PROVIDER", "telnyx");
        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("TELNYX_PUBLIC_KEY"));

        vars.insert("TELNYX_PUBLIC_KEY", "a2V5");
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn elevenlabs_requires_its_key() {
        let mut vars = base_vars();
        vars.insert("TTS_PROVIDER", "elevenlabs");
        assert!(load(&vars).is_err());
        vars.insert("ELEVENLABS_API_KEY", "el-key");
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let mut vars = base_vars();
        vars.insert("PHONE_PROVIDER", "vonage");
        assert!(matches!(load(&vars), Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_ports() {
        let mut vars = base_vars();
        vars.insert("WEBHOOK_PORT", "70000");
        assert!(load(&vars).is_err());

        vars.insert("WEBHOOK_PORT", "8080");
        vars.insert("API_PORT", "-1");
        assert!(load(&vars).is_err());

        vars.insert("API_PORT", "8081");
        let config = load(&vars).unwrap();
        assert_eq!(config.webhook_port, 8080);
        assert_eq!(config.api_port, 8081);
    }

    #[test]
    fn silence_override_applies() {
        let mut vars = base_vars();
        vars.insert("SILENCE_MS", "750");
        assert_eq!(load(&vars).unwrap().silence_threshold, Duration::from_millis(750));

        vars.insert("SILENCE_MS", "soon");
        assert!(load(&vars).is_err());
    }
}
