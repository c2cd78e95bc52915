//! Wallet and contract backends over Odra host environments.
//!
//! Every network is one `HostEnv` (an OdraVM in tests, a livenet node in
//! the binary). Writes are queued when submitted and executed when the
//! caller waits for them, which is what lets workflows observe
//! `AwaitingConfirmation` before the transaction lands.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use odra::casper_types::{U256, U512};
use odra::host::{HostEnv, HostRef};
use odra::prelude::Address;

use super::binder::{Connect, LoanInterface, SignerBinding, TokenInterface, VaultInterface};
use super::chain::{ChainId, NetworkDescriptor};
use super::contracts::{
    Confirm, LoanApi, LoanRecord, TokenApi, TransactionReceipt, TxHash, VaultApi,
};
use super::error::{CallError, ProviderError, INTERNAL_ERROR_CODE};
use super::wallet::{AccountsListener, SubscriptionId, WalletProvider};
use crate::loan_manager::LoanManagerHostRef;
use crate::tokens::LoanTokenHostRef;
use crate::vault::VaultHostRef;

// ==========================================
// Wallet
// ==========================================

/// Wallet over a set of host environments, one per chain id. Only chains
/// added to the wallet (or given at construction) can be switched to.
pub struct HostWallet {
    backends: RefCell<BTreeMap<ChainId, HostEnv>>,
    known: RefCell<BTreeSet<ChainId>>,
    active: Cell<ChainId>,
    account_index: Cell<usize>,
    listeners: RefCell<BTreeMap<SubscriptionId, AccountsListener>>,
    next_subscription: Cell<u64>,
    switch_requests: Cell<usize>,
    rejecting: Cell<bool>,
}

impl HostWallet {
    /// Wallet that knows only `active`.
    pub fn new(active: ChainId, env: HostEnv) -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(active, env);
        Self {
            backends: RefCell::new(backends),
            known: RefCell::new(BTreeSet::from([active])),
            active: Cell::new(active),
            account_index: Cell::new(0),
            listeners: RefCell::new(BTreeMap::new()),
            next_subscription: Cell::new(0),
            switch_requests: Cell::new(0),
            rejecting: Cell::new(false),
        }
    }

    /// Makes a chain reachable without registering it with the wallet;
    /// switching to it fails with 4902 until it is added.
    pub fn attach(&self, id: ChainId, env: HostEnv) {
        self.backends.borrow_mut().insert(id, env);
    }

    /// Makes a chain reachable and already known to the wallet.
    pub fn register(&self, id: ChainId, env: HostEnv) {
        self.attach(id, env);
        self.known.borrow_mut().insert(id);
    }

    pub fn env(&self, id: ChainId) -> Option<HostEnv> {
        self.backends.borrow().get(&id).cloned()
    }

    pub fn active_account(&self) -> Option<Address> {
        self.account_on(self.active.get())
    }

    /// Selects another account, notifying subscribers like a wallet UI would.
    pub fn select_account(&self, index: usize) {
        let before = self.active_account();
        self.account_index.set(index);
        if before != self.active_account() {
            self.notify();
        }
    }

    /// Makes the user decline every following request.
    pub fn reject_requests(&self, reject: bool) {
        self.rejecting.set(reject);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of `switch_chain` requests received.
    pub fn switch_requests(&self) -> usize {
        self.switch_requests.get()
    }

    pub fn is_known(&self, id: ChainId) -> bool {
        self.known.borrow().contains(&id)
    }

    fn account_on(&self, id: ChainId) -> Option<Address> {
        self.backends
            .borrow()
            .get(&id)
            .map(|env| env.get_account(self.account_index.get()))
    }

    fn notify(&self) {
        let accounts: Vec<Address> = self.active_account().into_iter().collect();
        // Cloned out so listeners may (un)subscribe while being called.
        let listeners: Vec<AccountsListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&accounts);
        }
    }

    fn activate(&self, id: ChainId) {
        let before = self.active_account();
        self.active.set(id);
        log::debug!("wallet switched to {}", id);
        if before != self.active_account() {
            self.notify();
        }
    }
}

impl WalletProvider for HostWallet {
    fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        if self.rejecting.get() {
            return Err(ProviderError::user_rejected());
        }
        self.active_account()
            .map(|account| vec![account])
            .ok_or_else(|| ProviderError::new(INTERNAL_ERROR_CODE, "no backend for active chain"))
    }

    fn chain_id(&self) -> ChainId {
        self.active.get()
    }

    fn switch_chain(&self, id: ChainId) -> Result<(), ProviderError> {
        self.switch_requests.set(self.switch_requests.get() + 1);
        if self.rejecting.get() {
            return Err(ProviderError::user_rejected());
        }
        if !self.is_known(id) {
            return Err(ProviderError::unrecognized_chain(id));
        }
        self.activate(id);
        Ok(())
    }

    fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        if self.rejecting.get() {
            return Err(ProviderError::user_rejected());
        }
        if !self.backends.borrow().contains_key(&network.id) {
            return Err(ProviderError::new(
                INTERNAL_ERROR_CODE,
                format!("no rpc reachable for {}", network.display_name),
            ));
        }
        self.known.borrow_mut().insert(network.id);
        self.activate(network.id);
        Ok(())
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }
}

// ==========================================
// Transaction pool
// ==========================================

type PendingCall = Box<dyn FnOnce() -> Result<(), String>>;

/// Submitted but not yet executed writes of one chain.
pub struct TxPool {
    chain: ChainId,
    nonce: Cell<u64>,
    pending: RefCell<BTreeMap<TxHash, PendingCall>>,
}

impl TxPool {
    pub fn new(chain: ChainId) -> Self {
        Self {
            chain,
            nonce: Cell::new(0),
            pending: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn submit(&self, call: PendingCall) -> TxHash {
        let nonce = self.nonce.get() + 1;
        self.nonce.set(nonce);

        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&self.chain.value().to_be_bytes());
        hash[24..].copy_from_slice(&nonce.to_be_bytes());
        let hash = TxHash(hash);

        self.pending.borrow_mut().insert(hash, call);
        hash
    }

    /// Executes the queued call. A hash that is not pending was dropped or
    /// already confirmed.
    pub fn confirm(&self, hash: &TxHash) -> Result<TransactionReceipt, CallError> {
        let call = self
            .pending
            .borrow_mut()
            .remove(hash)
            .ok_or_else(|| CallError::Dropped(hash.to_string()))?;
        call().map_err(CallError::Reverted)?;
        Ok(TransactionReceipt {
            hash: *hash,
            confirmed: true,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

// ==========================================
// Contract backend
// ==========================================

/// Contract backend of one chain.
#[derive(Clone)]
pub struct HostChain {
    id: ChainId,
    env: HostEnv,
    pool: Rc<TxPool>,
    gas: Option<u64>,
}

impl HostChain {
    pub fn new(id: ChainId, env: HostEnv) -> Self {
        Self {
            id,
            env,
            pool: Rc::new(TxPool::new(id)),
            gas: None,
        }
    }

    /// Gas limit applied before each write (required on livenet).
    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    pub fn pool(&self) -> &TxPool {
        &self.pool
    }

    fn session(&self, address: Address, binding: SignerBinding) -> HostSession {
        if binding.network != self.id {
            log::warn!(
                "contract at {:?} bound for {} on backend {}",
                address,
                binding.network,
                self.id
            );
        }
        HostSession {
            env: self.env.clone(),
            pool: Rc::clone(&self.pool),
            address,
            signer: binding.account,
            gas: self.gas,
        }
    }
}

/// What every adapter needs: the chain, the contract and who signs.
struct HostSession {
    env: HostEnv,
    pool: Rc<TxPool>,
    address: Address,
    signer: Address,
    gas: Option<u64>,
}

impl HostSession {
    fn read<T>(&self, f: impl FnOnce(&HostEnv, Address) -> Result<T, String>) -> Result<T, CallError> {
        self.env.set_caller(self.signer);
        f(&self.env, self.address).map_err(CallError::Reverted)
    }

    fn queue(&self, f: impl FnOnce(&HostEnv, Address) -> Result<(), String> + 'static) -> TxHash {
        let env = self.env.clone();
        let address = self.address;
        let signer = self.signer;
        let gas = self.gas;
        self.pool.submit(Box::new(move || {
            env.set_caller(signer);
            if let Some(gas) = gas {
                env.set_gas(gas);
            }
            f(&env, address)
        }))
    }

    fn wait(&self, hash: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.pool.confirm(hash)
    }
}

fn reverted<E: core::fmt::Debug>(err: E) -> String {
    format!("{:?}", err)
}

pub struct HostVault(HostSession);
pub struct HostLoans(HostSession);
pub struct HostToken(HostSession);

impl Connect<VaultInterface> for HostChain {
    type Contract = HostVault;

    fn connect(&self, address: Address, binding: SignerBinding) -> HostVault {
        HostVault(self.session(address, binding))
    }
}

impl Connect<LoanInterface> for HostChain {
    type Contract = HostLoans;

    fn connect(&self, address: Address, binding: SignerBinding) -> HostLoans {
        HostLoans(self.session(address, binding))
    }
}

impl Connect<TokenInterface> for HostChain {
    type Contract = HostToken;

    fn connect(&self, address: Address, binding: SignerBinding) -> HostToken {
        HostToken(self.session(address, binding))
    }
}

impl Confirm for HostVault {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.0.wait(tx)
    }
}

impl VaultApi for HostVault {
    fn deposit(
        &mut self,
        token: Address,
        duration_secs: u64,
        value: U512,
    ) -> Result<TxHash, CallError> {
        Ok(self.0.queue(move |env, address| {
            let mut vault = VaultHostRef::new(address, env.clone()).with_tokens(value);
            vault.try_deposit(token, duration_secs).map_err(reverted)
        }))
    }

    fn get_balance(&self) -> Result<U512, CallError> {
        self.0.read(|env, address| {
            VaultHostRef::new(address, env.clone())
                .try_get_balance()
                .map_err(reverted)
        })
    }

    fn get_expiry_date(&self) -> Result<u64, CallError> {
        self.0.read(|env, address| {
            VaultHostRef::new(address, env.clone())
                .try_get_expiry_date()
                .map_err(reverted)
        })
    }
}

impl Confirm for HostLoans {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.0.wait(tx)
    }
}

impl LoanApi for HostLoans {
    fn user_details(&self, user: Address) -> Result<LoanRecord, CallError> {
        self.0.read(|env, address| {
            LoanManagerHostRef::new(address, env.clone())
                .try_user_details(user)
                .map(LoanRecord::from)
                .map_err(reverted)
        })
    }

    fn calculate_current_repay_amount(&self) -> Result<U256, CallError> {
        self.0.read(|env, address| {
            LoanManagerHostRef::new(address, env.clone())
                .try_calculate_current_repay_amount()
                .map_err(reverted)
        })
    }

    fn repay(&mut self) -> Result<TxHash, CallError> {
        Ok(self.0.queue(|env, address| {
            let mut loans = LoanManagerHostRef::new(address, env.clone());
            loans.try_repay().map_err(reverted)
        }))
    }
}

impl Confirm for HostToken {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.0.wait(tx)
    }
}

impl TokenApi for HostToken {
    fn allowance(&self, owner: Address, spender: Address) -> Result<U256, CallError> {
        self.0.read(|env, address| {
            LoanTokenHostRef::new(address, env.clone())
                .try_allowance(owner, spender)
                .map_err(reverted)
        })
    }

    fn approve(&mut self, spender: Address, amount: U256) -> Result<TxHash, CallError> {
        Ok(self.0.queue(move |env, address| {
            let mut token = LoanTokenHostRef::new(address, env.clone());
            token.try_approve(spender, amount).map_err(reverted)
        }))
    }
}
