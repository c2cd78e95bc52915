//! CEP-18 loan token
//!
//! The token a loan is denominated in. Borrowers approve the LoanManager for
//! the current repay amount and the manager pulls it with `transfer_from`.
//! Test deployments hand tokens out through `faucet_mint`.

use alloc::string::String;
use odra::casper_types::U256;
use odra::prelude::*;
use odra_modules::cep18::events::{
    Burn, DecreaseAllowance, IncreaseAllowance, Mint, SetAllowance, Transfer, TransferFrom,
};
use odra_modules::cep18_token::Cep18;

/// Loan tokens use the same 18 decimals as the native deposit.
pub const LOAN_TOKEN_DECIMALS: u8 = 18;

/// Errors raised by the token itself; transfers and allowances revert with
/// the CEP-18 module's own errors.
#[odra::odra_error]
pub enum TokenError {
    ZeroAmount = 60004,
}

/// Loan token with an open faucet for test networks
#[odra::module(
    events = [
        Mint,
        Burn,
        SetAllowance,
        IncreaseAllowance,
        DecreaseAllowance,
        Transfer,
        TransferFrom
    ],
    errors = TokenError
)]
pub struct LoanToken {
    token: SubModule<Cep18>,
}

#[odra::module]
impl LoanToken {
    /// Initialize the token with an empty supply
    pub fn init(&mut self, name: String, symbol: String) {
        self.token.init(symbol, name, LOAN_TOKEN_DECIMALS, U256::zero());
    }

    /// Token name
    pub fn name(&self) -> String {
        self.token.name()
    }

    /// Token symbol
    pub fn symbol(&self) -> String {
        self.token.symbol()
    }

    /// Token decimals
    pub fn decimals(&self) -> u8 {
        self.token.decimals()
    }

    /// Total supply
    pub fn total_supply(&self) -> U256 {
        self.token.total_supply()
    }

    /// Balance of an address
    pub fn balance_of(&self, owner: Address) -> U256 {
        self.token.balance_of(&owner)
    }

    /// Allowance from owner to spender
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.token.allowance(&owner, &spender)
    }

    /// Transfer tokens
    pub fn transfer(&mut self, recipient: Address, amount: U256) {
        self.token.transfer(&recipient, &amount);
    }

    /// Approve spender for exactly `amount`
    pub fn approve(&mut self, spender: Address, amount: U256) {
        self.token.approve(&spender, &amount);
    }

    /// Transfer from (with allowance)
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        self.token.transfer_from(&owner, &recipient, &amount);
    }

    /// Faucet mint, open to anyone on test networks
    pub fn faucet_mint(&mut self, to: Address, amount: U256) {
        if amount.is_zero() {
            self.env().revert(TokenError::ZeroAmount);
        }
        self.token.raw_mint(&to, &amount);
    }
}
