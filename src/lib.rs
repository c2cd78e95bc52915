//! Loanyelo: deposit vault and loan repayment across two networks (Odra)
//!
//! On-chain modules:
//! - Vault: native-currency deposits locked for a loan token and a duration
//! - LoanManager: per-borrower loans with time-proportional interest
//! - LoanToken: CEP-18 token loans are repaid in
//!
//! Host side (`client`): wallet session, network negotiation, signer-bound
//! contract handles and the deposit / approve / repay workflows.

#![cfg_attr(target_arch = "wasm32", no_std)]

extern crate alloc;

pub mod tokens;
pub mod vault;
pub mod loan_manager;

#[cfg(not(target_arch = "wasm32"))]
pub mod client;
