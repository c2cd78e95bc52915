//! Wallet provider boundary and the in-memory session built on top of it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use odra::prelude::Address;

use super::chain::{ChainId, NetworkDescriptor};
use super::error::{ClientError, ClientResult, ProviderError};

/// Callback invoked with the wallet's new account list.
pub type AccountsListener = Rc<dyn Fn(&[Address])>;

/// Handle of a registered listener; the only way to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Injected wallet: account access, network switching and account-change
/// notifications.
pub trait WalletProvider {
    /// Asks the user for account access; first entry is the active account.
    fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    fn chain_id(&self) -> ChainId;

    fn switch_chain(&self, id: ChainId) -> Result<(), ProviderError>;

    /// Registers a network with the wallet. Wallets usually switch to it too.
    fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError>;

    fn on_accounts_changed(&self, listener: AccountsListener) -> SubscriptionId;

    /// Returns false when `id` was not subscribed.
    fn remove_listener(&self, id: SubscriptionId) -> bool;
}

/// Who is signing, on which network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub active_account: Option<Address>,
    pub active_network: ChainId,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.active_account.is_some()
    }
}

pub struct WalletSession<W: WalletProvider> {
    provider: Option<Rc<W>>,
    state: Rc<RefCell<Option<Session>>>,
    subscription: Option<SubscriptionId>,
}

impl<W: WalletProvider> WalletSession<W> {
    /// `None` models a browser without an injected wallet.
    pub fn new(provider: Option<Rc<W>>) -> Self {
        Self {
            provider,
            state: Rc::new(RefCell::new(None)),
            subscription: None,
        }
    }

    pub fn provider(&self) -> Option<&Rc<W>> {
        self.provider.as_ref()
    }

    /// Requests account access once and, the first time, subscribes to
    /// account changes for the rest of the session.
    pub fn connect(&mut self) -> ClientResult<Session> {
        let provider = self.provider.clone().ok_or(ClientError::WalletUnavailable)?;

        let accounts = provider.request_accounts().map_err(|err| {
            if err.is_user_rejection() {
                ClientError::UserRejected
            } else {
                ClientError::ReadFailed(err.to_string())
            }
        })?;

        let session = Session {
            active_account: accounts.first().copied(),
            active_network: provider.chain_id(),
        };
        *self.state.borrow_mut() = Some(session);

        if self.subscription.is_none() {
            let state: Weak<RefCell<Option<Session>>> = Rc::downgrade(&self.state);
            let listener: AccountsListener = Rc::new(move |accounts: &[Address]| {
                if let Some(state) = state.upgrade() {
                    if let Some(session) = state.borrow_mut().as_mut() {
                        session.active_account = accounts.first().copied();
                        log::info!("active account changed to {:?}", session.active_account);
                    }
                }
            });
            self.subscription = Some(provider.on_accounts_changed(listener));
        }

        log::info!(
            "wallet connected: account={:?} network={}",
            session.active_account,
            session.active_network
        );
        Ok(session)
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().map(|s| s.is_connected()).unwrap_or(false)
    }

    /// Current session, `None` before the first successful connect.
    pub fn snapshot(&self) -> Option<Session> {
        *self.state.borrow()
    }

    pub fn current_network_id(&self) -> ClientResult<ChainId> {
        self.provider
            .as_ref()
            .map(|p| p.chain_id())
            .ok_or(ClientError::WalletUnavailable)
    }

    /// Re-reads the wallet's network after a switch.
    pub fn sync_network(&mut self) -> ClientResult<ChainId> {
        let id = self.current_network_id()?;
        if let Some(session) = self.state.borrow_mut().as_mut() {
            session.active_network = id;
        }
        Ok(id)
    }

    /// Drops the session and removes the listener registered by `connect`.
    pub fn disconnect(&mut self) {
        if let (Some(provider), Some(id)) = (self.provider.as_ref(), self.subscription.take()) {
            if !provider.remove_listener(id) {
                log::warn!("account listener {:?} was already removed", id);
            }
        }
        *self.state.borrow_mut() = None;
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }
}

impl<W: WalletProvider> Drop for WalletSession<W> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
