#![allow(dead_code)]
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::LoopFormData;

/// Why an inbound text frame could not become a [`SessionMessage`]. Malformed
/// frames are logged and dropped by the channel; they never tear anything down.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no \"type\" discriminant")]
    MissingType,
    #[error("bad \"{kind}\" payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One frame of the strategy session protocol, discriminated by the wire
/// `type` tag. `strategy_select` and `deposit` travel client-to-backend, the
/// rest backend-to-client. Tags nobody recognizes land in `Unknown` so new
/// backend frames never break an older client.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    StrategySelect(StrategySelectData),
    StrategyInit(StrategyInitData),
    Deposit(DepositData),
    DepositComplete(Value),
    MonitorUpdate(MonitorPayload),
    Error(ErrorData),
    Unknown { kind: String, data: Value },
}

impl SessionMessage {
    pub fn kind(&self) -> &str {
        match self {
            SessionMessage::StrategySelect(_) => "strategy_select",
            SessionMessage::StrategyInit(_) => "strategy_init",
            SessionMessage::Deposit(_) => "deposit",
            SessionMessage::DepositComplete(_) => "deposit_complete",
            SessionMessage::MonitorUpdate(_) => "monitor_update",
            SessionMessage::Error(_) => "error",
            SessionMessage::Unknown { kind, .. } => kind,
        }
    }

    /// Decodes one inbound text frame.
    pub fn from_text(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        Self::from_parts(kind, data)
    }

    fn from_parts(kind: String, data: Value) -> Result<Self, FrameError> {
        let message = match kind.as_str() {
            "strategy_select" => SessionMessage::StrategySelect(payload(&kind, data)?),
            "strategy_init" => SessionMessage::StrategyInit(payload(&kind, data)?),
            "deposit" => SessionMessage::Deposit(payload(&kind, data)?),
            "deposit_complete" => SessionMessage::DepositComplete(data),
            "monitor_update" => SessionMessage::MonitorUpdate(payload(&kind, data)?),
            "error" => SessionMessage::Error(payload(&kind, data)?),
            _ => SessionMessage::Unknown { kind, data },
        };
        Ok(message)
    }

    /// Encodes the frame to its wire form, `{"type": ..., "data": ...}`.
    pub fn to_text(&self) -> Result<String, FrameError> {
        let data = match self {
            SessionMessage::StrategySelect(d) => serde_json::to_value(d)?,
            SessionMessage::StrategyInit(d) => serde_json::to_value(d)?,
            SessionMessage::Deposit(d) => serde_json::to_value(d)?,
            SessionMessage::DepositComplete(d) => d.clone(),
            SessionMessage::MonitorUpdate(d) => serde_json::to_value(d)?,
            SessionMessage::Error(d) => serde_json::to_value(d)?,
            SessionMessage::Unknown { data, .. } => data.clone(),
        };
        let frame = serde_json::json!({ "type": self.kind(), "data": data });
        Ok(frame.to_string())
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T, FrameError> {
    serde_json::from_value(data).map_err(|source| FrameError::Payload {
        kind: kind.to_string(),
        source,
    })
}

// Wire payload types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySelectData {
    pub strategy_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_deposit: Decimal,
    pub parameters: LoopFormData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInitData {
    pub vault_id: String,
    pub deposit_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositData {
    pub vault_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// The backend reuses `monitor_update` for both periodic vault metrics and
/// risk alerts; anything else stays structured but unclassified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonitorPayload {
    Metrics(MonitorMetrics),
    Alert(MonitorAlert),
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorMetrics {
    pub vault_id: String,
    pub metrics: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorAlert {
    pub vault_id: String,
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
