//! Supported networks and their descriptors.

use core::fmt;

use odra::prelude::Address;

use super::address::address_hex;
use super::error::{ClientError, ClientResult, InputError};

/// Sepolia, where the vault lives.
pub const SEPOLIA: ChainId = ChainId::new(11_155_111);
/// Reactive Kopli, where loans are managed.
pub const KOPLI: ChainId = ChainId::new(5_318_008);

/// Network identifier; canonical text form is `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Accepts `0x`-prefixed hex or decimal.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|_| InputError::ChainId(trimmed.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub id: ChainId,
    pub display_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_endpoints: Vec<String>,
    pub block_explorer_url: Option<String>,
}

impl NetworkDescriptor {
    pub fn sepolia() -> Self {
        Self {
            id: SEPOLIA,
            display_name: "Sepolia".to_string(),
            native_currency: NativeCurrency {
                name: "Sepolia ETH".to_string(),
                symbol: "SEP".to_string(),
                decimals: 18,
            },
            rpc_endpoints: vec!["https://rpc.sepolia.org".to_string()],
            block_explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        }
    }

    pub fn kopli() -> Self {
        Self {
            id: KOPLI,
            display_name: "Reactive Kopli".to_string(),
            native_currency: NativeCurrency {
                name: "REACT".to_string(),
                symbol: "REACT".to_string(),
                decimals: 18,
            },
            rpc_endpoints: vec!["https://kopli-rpc.reactive.network/".to_string()],
            block_explorer_url: Some("https://kopli.reactscan.net".to_string()),
        }
    }

    /// Explorer page of a transaction, if the network has an explorer.
    pub fn tx_url(&self, hash: &str) -> Option<String> {
        self.explorer().map(|base| format!("{}/tx/{}", base, hash))
    }

    /// Explorer page of an account or contract.
    pub fn address_url(&self, address: &Address) -> Option<String> {
        self.explorer()
            .map(|base| format!("{}/address/{}", base, address_hex(address)))
    }

    fn explorer(&self) -> Option<&str> {
        self.block_explorer_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
    }
}

/// The fixed set of networks the dApp talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    networks: Vec<NetworkDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::testnets()
    }
}

impl ChainRegistry {
    /// Sepolia (vault) followed by Reactive Kopli (loans).
    pub fn testnets() -> Self {
        Self {
            networks: vec![NetworkDescriptor::sepolia(), NetworkDescriptor::kopli()],
        }
    }

    pub fn describe(&self, id: ChainId) -> ClientResult<&NetworkDescriptor> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or(ClientError::UnknownNetwork(id))
    }

    pub fn list_supported(&self) -> &[NetworkDescriptor] {
        &self.networks
    }

    pub fn is_supported(&self, id: ChainId) -> bool {
        self.networks.iter().any(|n| n.id == id)
    }

    /// Puts `url` first in the endpoint list of network `id`.
    pub fn with_rpc_override(mut self, id: ChainId, url: &str) -> ClientResult<Self> {
        let network = self
            .networks
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(ClientError::UnknownNetwork(id))?;
        network.rpc_endpoints.retain(|u| u != url);
        network.rpc_endpoints.insert(0, url.to_string());
        Ok(self)
    }
}
