use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const MAX_SIGNER_NAME_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceState {
    Draft,
    Shared,
    Accepted,
}

impl AcceptanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Shared => "shared",
            Self::Accepted => "accepted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceMethod {
    TypedName,
    DrawnSignature,
    ClickThrough,
}

impl AcceptanceMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::TypedName => "typed name",
            Self::DrawnSignature => "drawn signature",
            Self::ClickThrough => "click-through",
        }
    }
}

impl std::str::FromStr for AcceptanceMethod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "typed_name" | "typed" => Ok(Self::TypedName),
            "drawn_signature" | "drawn" => Ok(Self::DrawnSignature),
            "click_through" | "click" => Ok(Self::ClickThrough),
            other => Err(DomainError::invalid_input(format!(
                "unsupported acceptance method `{other}` (expected typed_name|drawn_signature|click_through)"
            ))),
        }
    }
}

/// What a client submits when accepting. Any timestamp it carries is kept for
/// display only; the recorded acceptance time is always assigned server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRequest {
    pub signer_name: String,
    #[serde(default)]
    pub signer_title: Option<String>,
    pub method: AcceptanceMethod,
    #[serde(default)]
    pub selected_option: Option<u8>,
    #[serde(default)]
    pub client_reported_date: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl AcceptanceRequest {
    pub fn new(signer_name: impl Into<String>, method: AcceptanceMethod) -> Self {
        Self {
            signer_name: signer_name.into(),
            signer_title: None,
            method,
            selected_option: None,
            client_reported_date: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.signer_name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("signer name is required"));
        }
        if name.chars().count() > MAX_SIGNER_NAME_CHARS {
            return Err(DomainError::invalid_input(format!(
                "signer name must be at most {MAX_SIGNER_NAME_CHARS} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceEvidence {
    pub signer_name: String,
    pub signer_title: Option<String>,
    pub method: AcceptanceMethod,
    pub selected_option: Option<u8>,
    pub client_reported_date: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub accepted_at: DateTime<Utc>,
}

impl AcceptanceEvidence {
    pub fn stamp(request: AcceptanceRequest, accepted_at: DateTime<Utc>) -> Self {
        let trimmed = |value: Option<String>| {
            value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
        };
        Self {
            signer_name: request.signer_name.trim().to_string(),
            signer_title: trimmed(request.signer_title),
            method: request.method,
            selected_option: request.selected_option,
            client_reported_date: trimmed(request.client_reported_date),
            ip_address: trimmed(request.ip_address),
            user_agent: trimmed(request.user_agent).map(|agent| agent.chars().take(200).collect()),
            accepted_at,
        }
    }
}
