//! Error taxonomy of the host-side controller.

use thiserror::Error;

use super::chain::ChainId;

/// EIP-1193 code for a request the user declined in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;
/// Code wallets return when asked to switch to a network they do not know.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// Generic internal wallet error.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Failure reported by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wallet error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "user rejected the request")
    }

    pub fn unrecognized_chain(id: ChainId) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN_CODE,
            format!("unrecognized chain id {}", id),
        )
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN_CODE
    }
}

/// Failure of a contract read or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("rejected by signer")]
    Rejected,
    #[error("reverted: {0}")]
    Reverted(String),
    #[error("transaction {0} is not pending")]
    Dropped(String),
}

/// Why user input was refused before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid amount {0:?}")]
    Amount(String),
    #[error("end date must be in the future")]
    EndDate,
    #[error("unknown token {0:?}")]
    UnknownToken(String),
    #[error("invalid address {0:?}")]
    Address(String),
    #[error("invalid chain id {0:?}")]
    ChainId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("no wallet provider available")]
    WalletUnavailable,
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("network switch failed: {0}")]
    NetworkSwitchFailed(String),
    #[error("unknown network {0}")]
    UnknownNetwork(ChainId),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Maps a failed write; a signer rejection stays distinguishable.
    pub fn from_write(err: CallError) -> Self {
        match err {
            CallError::Rejected => ClientError::UserRejected,
            other => ClientError::TransactionFailed(other.to_string()),
        }
    }

    pub fn from_read(err: CallError) -> Self {
        ClientError::ReadFailed(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
