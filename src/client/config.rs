//! Environment configuration.
//!
//! - `LOANYELO_VAULT_CONTRACT`  vault address (64-hex or `hash-...`)
//! - `LOANYELO_LOAN_CONTRACT`   loan manager address
//! - `LOANYELO_TOKENS`          `name:rate_bps:address`, comma separated
//! - `LOANYELO_VAULT_CHAIN_ID`  default Sepolia
//! - `LOANYELO_LOAN_CHAIN_ID`   default Reactive Kopli
//! - `LOANYELO_SEPOLIA_RPC`, `LOANYELO_KOPLI_RPC`  RPC overrides

use odra::prelude::Address;

use super::address::parse_address;
use super::chain::{ChainId, ChainRegistry, KOPLI, SEPOLIA};
use super::error::{ClientError, ClientResult};
use super::vault_flow::TokenChoice;

pub const VAULT_CONTRACT_VAR: &str = "LOANYELO_VAULT_CONTRACT";
pub const LOAN_CONTRACT_VAR: &str = "LOANYELO_LOAN_CONTRACT";
pub const TOKENS_VAR: &str = "LOANYELO_TOKENS";
pub const VAULT_CHAIN_VAR: &str = "LOANYELO_VAULT_CHAIN_ID";
pub const LOAN_CHAIN_VAR: &str = "LOANYELO_LOAN_CHAIN_ID";
pub const SEPOLIA_RPC_VAR: &str = "LOANYELO_SEPOLIA_RPC";
pub const KOPLI_RPC_VAR: &str = "LOANYELO_KOPLI_RPC";

/// Interest rates of the two tokens offered by default.
pub const IVAN_RATE_BPS: u64 = 500;
pub const CONTASTINE_RATE_BPS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vault_contract: Address,
    pub loan_contract: Address,
    pub tokens: Vec<TokenChoice>,
    pub vault_chain: ChainId,
    pub loan_chain: ChainId,
    pub sepolia_rpc: Option<String>,
    pub kopli_rpc: Option<String>,
}

impl Config {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ClientError::Config(format!("{} must be set", name)))
        };
        let address = |name: &str| -> ClientResult<Address> {
            parse_address(&required(name)?)
                .map_err(|err| ClientError::Config(format!("{}: {}", name, err)))
        };
        let chain = |name: &str, default: ChainId| -> ClientResult<ChainId> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(raw) => ChainId::parse(&raw)
                    .map_err(|err| ClientError::Config(format!("{}: {}", name, err))),
                None => Ok(default),
            }
        };

        Ok(Self {
            vault_contract: address(VAULT_CONTRACT_VAR)?,
            loan_contract: address(LOAN_CONTRACT_VAR)?,
            tokens: parse_token_list(&required(TOKENS_VAR)?)?,
            vault_chain: chain(VAULT_CHAIN_VAR, SEPOLIA)?,
            loan_chain: chain(LOAN_CHAIN_VAR, KOPLI)?,
            sepolia_rpc: lookup(SEPOLIA_RPC_VAR).filter(|v| !v.trim().is_empty()),
            kopli_rpc: lookup(KOPLI_RPC_VAR).filter(|v| !v.trim().is_empty()),
        })
    }

    /// Default registry with the configured RPC overrides applied.
    pub fn registry(&self) -> ClientResult<ChainRegistry> {
        let mut registry = ChainRegistry::testnets();
        if let Some(url) = &self.sepolia_rpc {
            registry = registry.with_rpc_override(SEPOLIA, url)?;
        }
        if let Some(url) = &self.kopli_rpc {
            registry = registry.with_rpc_override(KOPLI, url)?;
        }
        for id in [self.vault_chain, self.loan_chain] {
            if !registry.is_supported(id) {
                return Err(ClientError::UnknownNetwork(id));
            }
        }
        Ok(registry)
    }
}

/// Parses `Ivan:500:hash-...,Contastine:1000:hash-...`.
pub fn parse_token_list(raw: &str) -> ClientResult<Vec<TokenChoice>> {
    let mut tokens = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || ClientError::Config(format!("invalid token entry {:?}", entry));
        let mut parts = entry.splitn(3, ':');
        let (Some(name), Some(rate), Some(address)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let interest_rate_bps = rate.trim().parse::<u64>().map_err(|_| invalid())?;
        let address = parse_address(address).map_err(|_| invalid())?;
        let name = name.trim().to_string();
        if name.is_empty() || tokens.iter().any(|t: &TokenChoice| t.name == name) {
            return Err(invalid());
        }
        tokens.push(TokenChoice {
            address,
            name,
            interest_rate_bps,
        });
    }
    if tokens.is_empty() {
        return Err(ClientError::Config(format!("{} lists no tokens", TOKENS_VAR)));
    }
    Ok(tokens)
}

/// The token list offered by the deposit form.
pub fn default_tokens(ivan: Address, contastine: Address) -> Vec<TokenChoice> {
    vec![
        TokenChoice {
            address: ivan,
            name: "Ivan".to_string(),
            interest_rate_bps: IVAN_RATE_BPS,
        },
        TokenChoice {
            address: contastine,
            name: "Contastine".to_string(),
            interest_rate_bps: CONTASTINE_RATE_BPS,
        },
    ]
}

/// Reads an integer variable, accepting `_` separators; falls back to
/// `default` when unset or malformed.
pub fn read_u64_env(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().replace('_', "").parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("{}={:?} is not a number, using {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
