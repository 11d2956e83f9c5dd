use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;

pub const MIN_NUMBER_LEN: usize = 10;

/// Format check shared by the store, the edit endpoints and the config loader.
pub fn is_valid_number(s: &str) -> bool {
    s.starts_with('+') && s.chars().count() >= MIN_NUMBER_LEN
}

/// A phone number that passed the format check. No other normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Trim and validate raw operator input.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StoreError::EmptyNumber);
        }
        if !is_valid_number(trimmed) {
            return Err(StoreError::InvalidNumber(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Identifies one run of the calling loop and scopes its status feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BatchId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid batch id '{}': {}", s, e))
    }
}

/// One step of a batch, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Calling { number: PhoneNumber },
    Started { number: PhoneNumber, sid: String },
    Removed { number: PhoneNumber },
    Failed { number: PhoneNumber, error: String },
    Skipped { number: PhoneNumber, reason: SkipReason },
}

/// Why a batch passed over a number from its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another batch is dialing it right now.
    InFlight,
    /// Removed from the list after the snapshot was taken.
    NoLongerListed,
}

impl StatusMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Calling { .. } => "calling",
            Self::Started { .. } => "started",
            Self::Removed { .. } => "removed",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }

    pub fn number(&self) -> &PhoneNumber {
        match self {
            Self::Calling { number }
            | Self::Started { number, .. }
            | Self::Removed { number }
            | Self::Failed { number, .. }
            | Self::Skipped { number, .. } => number,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calling { number } => write!(f, "📞 Calling {}...", number),
            Self::Started { sid, .. } => write!(f, "✅ Call started (SID: {})", sid),
            Self::Removed { number } => write!(f, "🗑️ {} removed from the call list", number),
            Self::Failed { number, error } => write!(f, "❌ Failed to call {}: {}", number, error),
            Self::Skipped {
                number,
                reason: SkipReason::InFlight,
            } => write!(f, "⏭️ {} is already being called by another batch", number),
            Self::Skipped {
                number,
                reason: SkipReason::NoLongerListed,
            } => write!(f, "⏭️ {} is no longer in the call list, skipped", number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A one-shot notice rendered on the next page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_number() {
        assert!(is_valid_number("+15551234567"));
        assert!(is_valid_number("+123456789"));
        assert!(!is_valid_number("+12345678"));
        assert!(!is_valid_number("15551234567"));
        assert!(!is_valid_number(""));
    }

    #[test]
    fn test_phone_number_parse_trims() {
        let n = PhoneNumber::parse("  +15551234567\n").unwrap();
        assert_eq!(n.as_str(), "+15551234567");
    }

    #[test]
    fn test_phone_number_parse_empty() {
        assert!(matches!(PhoneNumber::parse("   "), Err(StoreError::EmptyNumber)));
    }

    #[test]
    fn test_phone_number_parse_rejects_missing_plus() {
        match PhoneNumber::parse("15551234567") {
            Err(StoreError::InvalidNumber(n)) => assert_eq!(n, "15551234567"),
            other => panic!("Expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_phone_number_keeps_formatting_characters() {
        let n: PhoneNumber = "+1 (555) 123-4567".parse().unwrap();
        assert_eq!(n.to_string(), "+1 (555) 123-4567");
    }

    #[test]
    fn test_status_message_text() {
        let number = PhoneNumber::parse("+15551234567").unwrap();
        assert_eq!(
            StatusMessage::Calling { number: number.clone() }.to_string(),
            "📞 Calling +15551234567..."
        );
        assert_eq!(
            StatusMessage::Started {
                number: number.clone(),
                sid: "CA42".into()
            }
            .to_string(),
            "✅ Call started (SID: CA42)"
        );
        let failed = StatusMessage::Failed {
            number: number.clone(),
            error: "boom".into(),
        };
        assert_eq!(failed.to_string(), "❌ Failed to call +15551234567: boom");
        assert_eq!(failed.kind(), "failed");
        assert_eq!(failed.number(), &number);
        assert_eq!(
            StatusMessage::Skipped {
                number,
                reason: SkipReason::NoLongerListed
            }
            .to_string(),
            "⏭️ +15551234567 is no longer in the call list, skipped"
        );
    }

    #[test]
    fn test_batch_id_round_trips_through_str() {
        let id = BatchId::new();
        let parsed: BatchId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<BatchId>().is_err());
    }

    #[test]
    fn test_flash_kind_as_str() {
        assert_eq!(FlashKind::Warning.as_str(), "warning");
        assert_eq!(Flash::new(FlashKind::Error, "x").kind, FlashKind::Error);
    }
}
