//! Build contract binary for Odra WASM generation
//!
//! Compiled to WASM; carries the entry points of the vault, the loan manager
//! and the loan token.

#![cfg_attr(target_arch = "wasm32", no_std)]
#![cfg_attr(target_arch = "wasm32", no_main)]

#[cfg(target_arch = "wasm32")]
extern crate odra_casper_wasm_env;

#[cfg(target_arch = "wasm32")]
use loanyelo::loan_manager::LoanManager;
#[cfg(target_arch = "wasm32")]
use loanyelo::tokens::LoanToken;
#[cfg(target_arch = "wasm32")]
use loanyelo::vault::Vault;
#[cfg(target_arch = "wasm32")]
use odra_casper_wasm_env as _;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    panic!("loanyelo_build_contract is intended to be built for wasm32-unknown-unknown only");
}
