//! Calling contracts of the three on-chain collaborators, as seen from the
//! host. Writes return the hash of a pending transaction; `Confirm::wait`
//! blocks until it is included.

use core::fmt;

use chrono::{DateTime, Utc};
use odra::casper_types::{U256, U512};
use odra::prelude::Address;

use super::address::to_hex;
use super::error::CallError;
use super::units::format_ether;
use crate::loan_manager::{null_address, UserDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub confirmed: bool,
}

pub trait Confirm {
    /// Blocks until the transaction has one confirmation.
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError>;
}

/// Deposit vault on the vault network.
pub trait VaultApi: Confirm {
    /// Payable: `value` is attached in native base units.
    fn deposit(&mut self, token: Address, duration_secs: u64, value: U512)
        -> Result<TxHash, CallError>;
    fn get_balance(&self) -> Result<U512, CallError>;
    /// Unix timestamp in seconds.
    fn get_expiry_date(&self) -> Result<u64, CallError>;
}

/// Loan manager on the loan network.
pub trait LoanApi: Confirm {
    fn user_details(&self, user: Address) -> Result<LoanRecord, CallError>;
    fn calculate_current_repay_amount(&self) -> Result<U256, CallError>;
    fn repay(&mut self) -> Result<TxHash, CallError>;
}

/// CEP-18 / ERC20-style token.
pub trait TokenApi: Confirm {
    fn allowance(&self, owner: Address, spender: Address) -> Result<U256, CallError>;
    fn approve(&mut self, spender: Address, amount: U256) -> Result<TxHash, CallError>;
}

/// A loan as read from the loan manager. Stale as soon as anything is
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    pub borrower: Address,
    pub collateral_token: Address,
    pub principal_deposited: U256,
    pub interest_rate_bps: u64,
    pub duration_secs: u64,
    pub end_timestamp: u64,
    pub active: bool,
}

impl LoanRecord {
    /// The loan manager reports "no loan" with a zero borrower.
    pub fn is_absent(&self) -> bool {
        self.borrower == null_address()
    }

    /// Principal in ether notation, e.g. `"1.0"`.
    pub fn principal_display(&self) -> String {
        format_ether(self.principal_deposited)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.end_timestamp).ok()?, 0)
    }
}

impl From<UserDetails> for LoanRecord {
    fn from(details: UserDetails) -> Self {
        Self {
            borrower: details.user_address,
            collateral_token: details.token_address,
            principal_deposited: details.eth_deposited,
            interest_rate_bps: details.interest_rate,
            duration_secs: details.duration,
            end_timestamp: details.end_time,
            active: details.is_active,
        }
    }
}
