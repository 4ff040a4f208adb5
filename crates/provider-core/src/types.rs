//! Shared provider types and configuration

use std::fmt;
use std::str::FromStr;

/// Which telephony carrier to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneProviderKind {
    Telnyx,
    Twilio,
}

impl FromStr for PhoneProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "telnyx" => Ok(Self::Telnyx),
            "twilio" => Ok(Self::Twilio),
            other => Err(format!("unknown phone provider: {other}")),
        }
    }
}

impl fmt::Display for PhoneProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Telnyx => "telnyx",
            Self::Twilio => "twilio",
        })
    }
}

/// Which speech-synthesis vendor to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProviderKind {
    OpenAi,
    ElevenLabs,
}

impl FromStr for TtsProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(format!("unknown TTS provider: {other}")),
        }
    }
}

impl fmt::Display for TtsProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
        })
    }
}

/// Carrier credentials.
///
/// Field interpretation depends on the carrier: for Twilio `account_sid` is
/// the Account SID and `auth_token` the Auth Token; for Telnyx `account_sid`
/// is the Connection ID and `auth_token` the API key.
#[derive(Debug, Clone)]
pub struct PhoneConfig {
    pub kind: PhoneProviderKind,
    pub account_sid: String,
    pub auth_token: String,
    /// Telnyx webhook public key (base64 Ed25519), required for Telnyx
    pub telnyx_public_key: Option<String>,
}

/// Synthesis vendor credentials and tuning
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub kind: TtsProviderKind,
    pub api_key: String,
    pub voice: Option<String>,
    pub model: Option<String>,
}

/// Recognition vendor credentials and tuning
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub api_key: String,
    pub model: Option<String>,
}

/// Unified call lifecycle status across carriers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierCallStatus {
    Initiated,
    Ringing,
    Answered,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    MachineDetected,
}

/// One carrier status callback, normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Carrier-assigned call identifier the update refers to
    pub carrier_call_id: String,
    pub status: CarrierCallStatus,
}

/// The carrier-specific instruction returned from the answer webhook,
/// telling the carrier to open the bidirectional media connection.
#[derive(Debug, Clone)]
pub struct AnswerResponse {
    pub content_type: &'static str,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kinds_parse_case_insensitively() {
        assert_eq!("Telnyx".parse::<PhoneProviderKind>().unwrap(), PhoneProviderKind::Telnyx);
        assert_eq!("TWILIO".parse::<PhoneProviderKind>().unwrap(), PhoneProviderKind::Twilio);
        assert!("vonage".parse::<PhoneProviderKind>().is_err());

        assert_eq!("openai".parse::<TtsProviderKind>().unwrap(), TtsProviderKind::OpenAi);
        assert_eq!("ElevenLabs".parse::<TtsProviderKind>().unwrap(), TtsProviderKind::ElevenLabs);
        assert!("polly".parse::<TtsProviderKind>().is_err());
    }
}
