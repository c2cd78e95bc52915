//! Deposit Vault Contract
//!
//! Users lock native currency for a chosen loan token and lock duration.
//! The deposit is what a loan on the loan network is later opened against.
//!
//! ## Units
//! - Native value: U512 base units, 18 decimals on the vault network
//! - Durations and expiry: seconds (block time is converted from ms)

use odra::casper_types::U512;
use odra::prelude::*;
use alloc::vec::Vec;

const MILLIS_PER_SECOND: u64 = 1_000;

// ==========================================
// Events
// ==========================================

pub mod events {
    use odra::casper_types::U512;
    use odra::prelude::*;

    #[odra::event]
    pub struct Deposited {
        pub user: Address,
        pub token: Address,
        pub amount: U512,
        pub duration_secs: u64,
        pub expiry_secs: u64,
        pub new_balance: U512,
    }
}

// ==========================================
// Errors
// ==========================================

#[odra::odra_error]
pub enum VaultError {
    ZeroAmount = 1,
    ZeroDuration = 2,
    UnsupportedToken = 3,
    Overflow = 4,
}

// ==========================================
// Contract
// ==========================================

#[odra::module(events = [events::Deposited], errors = VaultError)]
pub struct Vault {
    // Loan tokens a deposit may be made for
    accepted_tokens: Mapping<Address, bool>,

    // Per-user deposit state
    balances: Mapping<Address, U512>,
    expiry: Mapping<Address, u64>,
    loan_token: Mapping<Address, Address>,

    total_deposits: Var<U512>,
}

#[odra::module]
impl Vault {
    /// Initialize the vault with the loan tokens it accepts
    pub fn init(&mut self, tokens: Vec<Address>) {
        for token in tokens.iter() {
            self.accepted_tokens.set(token, true);
        }
        self.total_deposits.set(U512::zero());
    }

    /// Lock the attached value for `duration_secs` against `token`.
    /// A repeated deposit adds to the balance and moves the expiry.
    #[odra(payable)]
    pub fn deposit(&mut self, token: Address, duration_secs: u64) {
        let caller = self.env().caller();
        let amount = self.env().attached_value();

        if amount == U512::zero() {
            self.env().revert(VaultError::ZeroAmount);
        }
        if duration_secs == 0 {
            self.env().revert(VaultError::ZeroDuration);
        }
        if !self.accepted_tokens.get(&token).unwrap_or_default() {
            self.env().revert(VaultError::UnsupportedToken);
        }

        let expiry_secs = self
            .now_secs()
            .checked_add(duration_secs)
            .unwrap_or_else(|| self.env().revert(VaultError::Overflow));

        let new_balance = self
            .balances
            .get(&caller)
            .unwrap_or_default()
            .checked_add(amount)
            .unwrap_or_else(|| self.env().revert(VaultError::Overflow));
        let total = self
            .total_deposits
            .get_or_default()
            .checked_add(amount)
            .unwrap_or_else(|| self.env().revert(VaultError::Overflow));

        self.balances.set(&caller, new_balance);
        self.expiry.set(&caller, expiry_secs);
        self.loan_token.set(&caller, token);
        self.total_deposits.set(total);

        self.env().emit_event(events::Deposited {
            user: caller,
            token,
            amount,
            duration_secs,
            expiry_secs,
            new_balance,
        });
    }

    // ==========================================
    // View Functions
    // ==========================================

    /// Caller's locked balance
    pub fn get_balance(&self) -> U512 {
        self.balance_of(self.env().caller())
    }

    /// Caller's expiry as a unix timestamp (0 when nothing is locked)
    pub fn get_expiry_date(&self) -> u64 {
        self.expiry_of(self.env().caller())
    }

    pub fn balance_of(&self, user: Address) -> U512 {
        self.balances.get(&user).unwrap_or_default()
    }

    pub fn expiry_of(&self, user: Address) -> u64 {
        self.expiry.get(&user).unwrap_or_default()
    }

    /// Loan token chosen with the user's latest deposit
    pub fn token_of(&self, user: Address) -> Option<Address> {
        self.loan_token.get(&user)
    }

    pub fn is_accepted_token(&self, token: Address) -> bool {
        self.accepted_tokens.get(&token).unwrap_or_default()
    }

    pub fn total_deposits(&self) -> U512 {
        self.total_deposits.get_or_default()
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / MILLIS_PER_SECOND
    }
}
