//! Signer-bound contract handles.
//!
//! A handle remembers the `(account, network)` it was bound for. Workflows
//! compare that binding with the current session before every call and bind
//! a fresh handle when they differ, so a handle is never reused across an
//! account or network change.

use std::rc::Rc;

use odra::prelude::Address;

use super::chain::ChainId;
use super::error::{ClientError, ClientResult};
use super::wallet::Session;

/// Names a contract interface a backend can connect to.
pub trait Interface {
    const NAME: &'static str;
}

pub struct VaultInterface;
pub struct LoanInterface;
pub struct TokenInterface;

impl Interface for VaultInterface {
    const NAME: &'static str = "vault";
}

impl Interface for LoanInterface {
    const NAME: &'static str = "loan manager";
}

impl Interface for TokenInterface {
    const NAME: &'static str = "token";
}

/// Builds a callable contract for interface `I`. Must not touch the network.
pub trait Connect<I: Interface> {
    type Contract;

    fn connect(&self, address: Address, binding: SignerBinding) -> Self::Contract;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerBinding {
    pub account: Address,
    pub network: ChainId,
}

impl SignerBinding {
    pub fn of(session: &Session) -> Option<Self> {
        session.active_account.map(|account| Self {
            account,
            network: session.active_network,
        })
    }
}

pub struct ContractHandle<C> {
    address: Address,
    binding: SignerBinding,
    contract: C,
}

impl<C> ContractHandle<C> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Address {
        self.binding.account
    }

    pub fn network(&self) -> ChainId {
        self.binding.network
    }

    pub fn binding(&self) -> SignerBinding {
        self.binding
    }

    /// True while the session still has the account and network this handle
    /// was bound for.
    pub fn is_bound_to(&self, session: &Session) -> bool {
        SignerBinding::of(session) == Some(self.binding)
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn contract_mut(&mut self) -> &mut C {
        &mut self.contract
    }
}

pub struct ContractBinder<B> {
    backend: Rc<B>,
}

impl<B> Clone for ContractBinder<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B> ContractBinder<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub fn bind<I>(
        &self,
        _interface: I,
        address: Address,
        session: &Session,
    ) -> ClientResult<ContractHandle<<B as Connect<I>>::Contract>>
    where
        I: Interface,
        B: Connect<I>,
    {
        let binding = SignerBinding::of(session)
            .ok_or(ClientError::PreconditionFailed("wallet not connected"))?;
        log::debug!(
            "binding {} at {:?} for {:?} on {}",
            I::NAME,
            address,
            binding.account,
            binding.network
        );
        Ok(ContractHandle {
            address,
            binding,
            contract: self.backend.connect(address, binding),
        })
    }
}
