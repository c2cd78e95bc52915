//! Loan Manager Contract
//!
//! Tracks one loan per borrower on the loan network. Loans are opened by the
//! owner (the relayer that observes vault deposits) and repaid by the
//! borrower in the loan token.
//!
//! ## Interest
//! Simple interest, linear in elapsed time and not capped at the end time:
//! `repay = principal + principal * rate_bps * elapsed / (10_000 * duration)`
//! so the repay amount grows monotonically until the loan is repaid.

use odra::casper_types::account::AccountHash;
use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;
use crate::tokens::LoanTokenContractRef;

/// Basis points divisor
pub const BPS_DIVISOR: u64 = 10_000;

const MILLIS_PER_SECOND: u64 = 1_000;

/// Sentinel borrower reported by `user_details` for addresses without a loan
pub fn null_address() -> Address {
    Address::Account(AccountHash::new([0u8; 32]))
}

// ==========================================
// Events
// ==========================================

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct LoanOpened {
        pub borrower: Address,
        pub token: Address,
        pub eth_deposited: U256,
        pub interest_rate: u64,
        pub end_time: u64,
    }

    #[odra::event]
    pub struct LoanRepaid {
        pub borrower: Address,
        pub token: Address,
        pub amount: U256,
    }
}

// ==========================================
// Types
// ==========================================

/// Loan as returned by `user_details`
#[odra::odra_type]
pub struct UserDetails {
    pub user_address: Address,
    pub token_address: Address,
    pub eth_deposited: U256,
    /// Interest over the full duration, in basis points
    pub interest_rate: u64,
    pub duration: u64,
    pub end_time: u64,
    pub is_active: bool,
}

impl UserDetails {
    fn empty() -> Self {
        Self {
            user_address: null_address(),
            token_address: null_address(),
            eth_deposited: U256::zero(),
            interest_rate: 0,
            duration: 0,
            end_time: 0,
            is_active: false,
        }
    }
}

// ==========================================
// Errors
// ==========================================

#[odra::odra_error]
pub enum LoanError {
    NoActiveLoan = 1,
    LoanAlreadyActive = 2,
    ZeroAmount = 3,
    ZeroDuration = 4,
    InsufficientAllowance = 5,
    Unauthorized = 6,
    Overflow = 7,
}

// ==========================================
// Contract
// ==========================================

#[odra::module(events = [events::LoanOpened, events::LoanRepaid], errors = LoanError)]
pub struct LoanManager {
    loans: Mapping<Address, UserDetails>,
    total_repaid: Var<U256>,
    owner: Var<Address>,
}

#[odra::module]
impl LoanManager {
    pub fn init(&mut self) {
        self.owner.set(self.env().caller());
        self.total_repaid.set(U256::zero());
    }

    /// Open a loan for `borrower` (owner only).
    pub fn open_loan(
        &mut self,
        borrower: Address,
        token: Address,
        eth_deposited: U256,
        interest_rate: u64,
        duration: u64,
    ) {
        self.require_owner();
        if eth_deposited.is_zero() {
            self.env().revert(LoanError::ZeroAmount);
        }
        if duration == 0 {
            self.env().revert(LoanError::ZeroDuration);
        }
        if self.loans.get(&borrower).map(|l| l.is_active).unwrap_or_default() {
            self.env().revert(LoanError::LoanAlreadyActive);
        }

        let end_time = self
            .now_secs()
            .checked_add(duration)
            .unwrap_or_else(|| self.env().revert(LoanError::Overflow));
        self.loans.set(
            &borrower,
            UserDetails {
                user_address: borrower,
                token_address: token,
                eth_deposited,
                interest_rate,
                duration,
                end_time,
                is_active: true,
            },
        );

        self.env().emit_event(events::LoanOpened {
            borrower,
            token,
            eth_deposited,
            interest_rate,
            end_time,
        });
    }

    /// Repay the caller's loan in full.
    /// Pulls the current repay amount with `transfer_from` (requires prior approve).
    pub fn repay(&mut self) {
        let caller = self.env().caller();
        let mut loan = self.active_loan(caller);
        let amount = self.repay_amount(&loan);

        let mut token = LoanTokenContractRef::new(self.env().clone(), loan.token_address);
        let self_address = self.env().self_address();

        let allowance = token.allowance(caller, self_address);
        if allowance < amount {
            self.env().revert(LoanError::InsufficientAllowance);
        }
        token.transfer_from(caller, self_address, amount);

        let token_address = loan.token_address;
        loan.is_active = false;
        self.loans.set(&caller, loan);
        let total = self
            .total_repaid
            .get_or_default()
            .checked_add(amount)
            .unwrap_or_else(|| self.env().revert(LoanError::Overflow));
        self.total_repaid.set(total);

        self.env().emit_event(events::LoanRepaid {
            borrower: caller,
            token: token_address,
            amount,
        });
    }

    // ==========================================
    // View Functions
    // ==========================================

    /// Loan of `user`; the zero-address record when there is none
    pub fn user_details(&self, user: Address) -> UserDetails {
        self.loans.get(&user).unwrap_or_else(UserDetails::empty)
    }

    /// Amount the caller would have to repay right now
    pub fn calculate_current_repay_amount(&self) -> U256 {
        let loan = self.active_loan(self.env().caller());
        self.repay_amount(&loan)
    }

    pub fn total_repaid(&self) -> U256 {
        self.total_repaid.get_or_default()
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner.get()
    }

    // ==========================================
    // Internal Functions
    // ==========================================

    fn require_owner(&self) {
        if self.owner.get() != Some(self.env().caller()) {
            self.env().revert(LoanError::Unauthorized);
        }
    }

    fn active_loan(&self, user: Address) -> UserDetails {
        match self.loans.get(&user) {
            Some(loan) if loan.is_active => loan,
            _ => self.env().revert(LoanError::NoActiveLoan),
        }
    }

    fn repay_amount(&self, loan: &UserDetails) -> U256 {
        let start = loan.end_time.saturating_sub(loan.duration);
        let elapsed = self.now_secs().saturating_sub(start);

        let interest = loan
            .eth_deposited
            .checked_mul(U256::from(loan.interest_rate))
            .and_then(|x| x.checked_mul(U256::from(elapsed)))
            .map(|x| x / (U256::from(BPS_DIVISOR) * U256::from(loan.duration)))
            .unwrap_or_else(|| self.env().revert(LoanError::Overflow));

        loan.eth_deposited
            .checked_add(interest)
            .unwrap_or_else(|| self.env().revert(LoanError::Overflow))
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / MILLIS_PER_SECOND
    }
}
