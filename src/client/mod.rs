//! Host-side controller: wallet session, network negotiation, signer-bound
//! contract handles and the vault / loan workflows.

pub mod address;
pub mod app;
pub mod binder;
pub mod chain;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod error;
pub mod host;
pub mod loan_flow;
pub mod negotiator;
pub mod notice;
pub mod state;
pub mod units;
pub mod vault_flow;
pub mod wallet;

pub use app::{Dapp, Panel};
pub use binder::{ContractBinder, ContractHandle, SignerBinding};
pub use chain::{ChainId, ChainRegistry, NetworkDescriptor, KOPLI, SEPOLIA};
pub use error::{CallError, ClientError, ClientResult, InputError, ProviderError};
pub use loan_flow::{LoanWorkflow, PendingAmount};
pub use negotiator::ChainNegotiator;
pub use notice::{Level, Notice, Notices};
pub use state::{LoanTxState, Reading, TxState};
pub use vault_flow::{TokenChoice, VaultWorkflow};
pub use wallet::{Session, WalletProvider, WalletSession};
