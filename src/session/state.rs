#![allow(dead_code)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::channel::{ChannelError, SessionChannel};
use super::message::{
    DepositData, ErrorData, MonitorPayload, SessionMessage, StrategySelectData,
};
use crate::types::LoopFormData;

/// Lifecycle of one strategy session, from nothing selected to a deployed
/// vault contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Initializing,
    AwaitingFunding,
    Deploying,
    Active,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Initializing => "Initializing",
            SessionState::AwaitingFunding => "AwaitingFunding",
            SessionState::Deploying => "Deploying",
            SessionState::Active => "Active",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },
    #[error("no vault captured for this session")]
    NoVault,
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// What [`StrategySession::handle_message`] hands back for the owner to
/// render. At most one update per inbound frame.
#[derive(Debug)]
pub enum SessionUpdate {
    Transitioned {
        from: SessionState,
        to: SessionState,
    },
    Monitor(MonitorPayload),
    Failed {
        error: ErrorData,
        reverted_to: Option<SessionState>,
    },
}

/// Interprets inbound session frames against the state table and drives the
/// two user commands. Owned by exactly one session loop; frames are handled
/// one at a time, in the order the channel delivers them.
pub struct StrategySession {
    state: SessionState,
    state_since: DateTime<Utc>,
    strategy_id: Option<String>,
    vault_id: Option<String>,
    deposit_address: Option<String>,
    contract_deployed: bool,
    last_error: Option<ErrorData>,
}

impl StrategySession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            state_since: Utc::now(),
            strategy_id: None,
            vault_id: None,
            deposit_address: None,
            contract_deployed: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn state_since(&self) -> DateTime<Utc> {
        self.state_since
    }

    pub fn strategy_id(&self) -> Option<&str> {
        self.strategy_id.as_deref()
    }

    pub fn vault_id(&self) -> Option<&str> {
        self.vault_id.as_deref()
    }

    pub fn deposit_address(&self) -> Option<&str> {
        self.deposit_address.as_deref()
    }

    pub fn contract_deployed(&self) -> bool {
        self.contract_deployed
    }

    pub fn last_error(&self) -> Option<&ErrorData> {
        self.last_error.as_ref()
    }

    /// Sends `strategy_select` and moves to Initializing. Only valid from
    /// Idle; if the channel rejects the send, the session stays Idle.
    pub fn select_strategy(
        &mut self,
        channel: &SessionChannel,
        strategy_id: &str,
        form: &LoopFormData,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                action: "select a strategy",
                state: self.state,
            });
        }

        channel.send(&SessionMessage::StrategySelect(StrategySelectData {
            strategy_id: strategy_id.to_string(),
            initial_deposit: form.collateral_amount,
            parameters: form.clone(),
        }))?;

        self.strategy_id = Some(strategy_id.to_string());
        self.transition(SessionState::Initializing);
        Ok(())
    }

    /// Sends `deposit` for the captured vault and moves to Deploying. Only
    /// valid from AwaitingFunding, after the user has funded the deposit
    /// address out of band.
    pub fn confirm_deposit(&mut self, channel: &SessionChannel) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingFunding {
            return Err(SessionError::InvalidState {
                action: "confirm the deposit",
                state: self.state,
            });
        }
        let vault_id = self.vault_id.clone().ok_or(SessionError::NoVault)?;

        channel.send(&SessionMessage::Deposit(DepositData { vault_id }))?;

        self.transition(SessionState::Deploying);
        Ok(())
    }

    /// Applies one inbound frame. Frames that have no row in the state table
    /// for the current state are ignored and return nothing.
    pub fn handle_message(&mut self, message: SessionMessage) -> Option<SessionUpdate> {
        match message {
            SessionMessage::StrategyInit(data) => {
                if self.state != SessionState::Initializing {
                    warn!("Ignoring strategy_init in state {}", self.state);
                    return None;
                }
                info!(
                    "Vault {} ready, deposit address {}",
                    data.vault_id, data.deposit_address
                );
                self.vault_id = Some(data.vault_id);
                self.deposit_address = Some(data.deposit_address);
                Some(self.transition(SessionState::AwaitingFunding))
            }
            SessionMessage::DepositComplete(_) => {
                if self.state != SessionState::Deploying {
                    warn!("Ignoring deposit_complete in state {}", self.state);
                    return None;
                }
                self.contract_deployed = true;
                Some(self.transition(SessionState::Active))
            }
            SessionMessage::MonitorUpdate(payload) => Some(SessionUpdate::Monitor(payload)),
            SessionMessage::Error(data) => {
                warn!("Backend error: {}", data.message);
                self.last_error = Some(data.clone());
                let reverted_to = match self.state {
                    // Selection failed before a vault existed.
                    SessionState::Initializing => Some(SessionState::Idle),
                    // Deposit failed; the vault is still waiting for funds.
                    SessionState::Deploying => Some(SessionState::AwaitingFunding),
                    _ => None,
                };
                if let Some(to) = reverted_to {
                    self.transition(to);
                    if to == SessionState::Idle {
                        self.strategy_id = None;
                    }
                }
                Some(SessionUpdate::Failed {
                    error: data,
                    reverted_to,
                })
            }
            SessionMessage::StrategySelect(_) => {
                warn!("Ignoring outbound-only strategy_select frame from backend");
                None
            }
            SessionMessage::Deposit(_) => {
                warn!("Ignoring outbound-only deposit frame from backend");
                None
            }
            SessionMessage::Unknown { kind, .. } => {
                debug!("Ignoring unrecognized frame type {:?}", kind);
                None
            }
        }
    }

    fn transition(&mut self, to: SessionState) -> SessionUpdate {
        let from = self.state;
        self.state = to;
        self.state_since = Utc::now();
        info!("Session state {} -> {}", from, to);
        SessionUpdate::Transitioned { from, to }
    }
}

impl Default for StrategySession {
    fn default() -> Self {
        Self::new()
    }
}
