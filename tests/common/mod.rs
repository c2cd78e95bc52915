//! Scripted wallet and in-memory contract doubles shared by the workflow
//! tests. The Odra-backed flows live in `dapp_test.rs`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use odra::casper_types::account::AccountHash;
use odra::casper_types::contracts::ContractPackageHash;
use odra::casper_types::{U256, U512};
use odra::prelude::Address;

use loanyelo::client::binder::{
    Connect, LoanInterface, SignerBinding, TokenInterface, VaultInterface,
};
use loanyelo::client::chain::{ChainId, NetworkDescriptor};
use loanyelo::client::contracts::{
    Confirm, LoanApi, LoanRecord, TokenApi, TransactionReceipt, TxHash, VaultApi,
};
use loanyelo::client::error::{CallError, ProviderError};
use loanyelo::client::wallet::{AccountsListener, Session, SubscriptionId, WalletProvider};
use loanyelo::loan_manager::null_address;

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

pub fn account(n: u8) -> Address {
    Address::Account(AccountHash::new([n; 32]))
}

pub fn contract(n: u8) -> Address {
    Address::Contract(ContractPackageHash::new([n; 32]))
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(WEI_PER_ETHER)
}

/// 2026-01-01T00:00:00Z
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn session(account: Address, network: ChainId) -> Session {
    Session {
        active_account: Some(account),
        active_network: network,
    }
}

// ==========================================
// Wallet
// ==========================================

pub struct ScriptedWallet {
    accounts: RefCell<Vec<Address>>,
    chain: Cell<ChainId>,
    known: RefCell<BTreeSet<ChainId>>,
    request_error: RefCell<Option<ProviderError>>,
    switch_error: RefCell<Option<ProviderError>>,
    add_error: RefCell<Option<ProviderError>>,
    switch_on_add: Cell<bool>,
    account_requests: Cell<usize>,
    switch_requests: Cell<usize>,
    add_requests: Cell<usize>,
    listeners: RefCell<BTreeMap<SubscriptionId, AccountsListener>>,
    next_id: Cell<u64>,
}

impl ScriptedWallet {
    pub fn new(chain: ChainId, accounts: Vec<Address>) -> Self {
        Self {
            accounts: RefCell::new(accounts),
            chain: Cell::new(chain),
            known: RefCell::new(BTreeSet::from([chain])),
            request_error: RefCell::new(None),
            switch_error: RefCell::new(None),
            add_error: RefCell::new(None),
            switch_on_add: Cell::new(true),
            account_requests: Cell::new(0),
            switch_requests: Cell::new(0),
            add_requests: Cell::new(0),
            listeners: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    pub fn knowing(self, chain: ChainId) -> Self {
        self.known.borrow_mut().insert(chain);
        self
    }

    pub fn fail_requests(&self, err: ProviderError) {
        *self.request_error.borrow_mut() = Some(err);
    }

    pub fn fail_switch(&self, err: ProviderError) {
        *self.switch_error.borrow_mut() = Some(err);
    }

    pub fn fail_add(&self, err: ProviderError) {
        *self.add_error.borrow_mut() = Some(err);
    }

    pub fn stay_on_add(&self) {
        self.switch_on_add.set(false);
    }

    pub fn knows(&self, chain: ChainId) -> bool {
        self.known.borrow().contains(&chain)
    }

    /// The user picks other accounts in the wallet UI.
    pub fn change_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.borrow_mut() = accounts.clone();
        let listeners: Vec<AccountsListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&accounts);
        }
    }

    pub fn account_requests(&self) -> usize {
        self.account_requests.get()
    }

    pub fn switch_requests(&self) -> usize {
        self.switch_requests.get()
    }

    pub fn add_requests(&self) -> usize {
        self.add_requests.get()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl WalletProvider for ScriptedWallet {
    fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.account_requests.set(self.account_requests.get() + 1);
        if let Some(err) = self.request_error.borrow().clone() {
            return Err(err);
        }
        Ok(self.accounts.borrow().clone())
    }

    fn chain_id(&self) -> ChainId {
        self.chain.get()
    }

    fn switch_chain(&self, id: ChainId) -> Result<(), ProviderError> {
        self.switch_requests.set(self.switch_requests.get() + 1);
        if let Some(err) = self.switch_error.borrow().clone() {
            return Err(err);
        }
        if !self.knows(id) {
            return Err(ProviderError::unrecognized_chain(id));
        }
        self.chain.set(id);
        Ok(())
    }

    fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        self.add_requests.set(self.add_requests.get() + 1);
        if let Some(err) = self.add_error.borrow().clone() {
            return Err(err);
        }
        self.known.borrow_mut().insert(network.id);
        if self.switch_on_add.get() {
            self.chain.set(network.id);
        }
        Ok(())
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }
}

// ==========================================
// Contracts
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositCall {
    pub signer: Address,
    pub token: Address,
    pub duration_secs: u64,
    pub value: U512,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Deposit { duration_secs: u64, value: U512 },
    Approve { amount: U256 },
    Repay,
}

/// State behind every mock contract of one test. Writes take effect when
/// they are confirmed.
#[derive(Default)]
pub struct Ledger {
    pub now_secs: Cell<u64>,

    pub balance: Cell<U512>,
    pub expiry: Cell<u64>,
    pub deposits: RefCell<Vec<DepositCall>>,

    pub loan: RefCell<Option<LoanRecord>>,
    pub repay_amount: Cell<U256>,
    pub repays: RefCell<Vec<Address>>,
    pub repay_amount_reads: Cell<usize>,

    pub allowance: Cell<U256>,
    pub approvals: RefCell<Vec<(Address, Address, U256)>>,
    pub allowance_reads: Cell<usize>,

    pub fail_reads: Cell<bool>,
    pub fail_allowance_reads: Cell<bool>,
    pub reject_writes: Cell<bool>,
    pub revert_on_confirm: Cell<bool>,

    pub binds: RefCell<Vec<(&'static str, Address, SignerBinding)>>,
    nonce: Cell<u64>,
    pending: RefCell<BTreeMap<TxHash, Effect>>,
}

impl Ledger {
    pub fn active_loan(&self, borrower: Address, token: Address, principal: U256) {
        *self.loan.borrow_mut() = Some(LoanRecord {
            borrower,
            collateral_token: token,
            principal_deposited: principal,
            interest_rate_bps: 10,
            duration_secs: 3_600,
            end_timestamp: 1_767_229_200,
            active: true,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn bind_count(&self, interface: &str) -> usize {
        self.binds
            .borrow()
            .iter()
            .filter(|(name, _, _)| *name == interface)
            .count()
    }

    fn read<T>(&self, value: T) -> Result<T, CallError> {
        if self.fail_reads.get() {
            return Err(CallError::Reverted("node unavailable".to_string()));
        }
        Ok(value)
    }

    fn submit(&self, effect: Effect) -> Result<TxHash, CallError> {
        if self.reject_writes.get() {
            return Err(CallError::Rejected);
        }
        let nonce = self.nonce.get() + 1;
        self.nonce.set(nonce);
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&nonce.to_be_bytes());
        let hash = TxHash(hash);
        self.pending.borrow_mut().insert(hash, effect);
        Ok(hash)
    }

    fn confirm(&self, hash: &TxHash) -> Result<TransactionReceipt, CallError> {
        let effect = self
            .pending
            .borrow_mut()
            .remove(hash)
            .ok_or_else(|| CallError::Dropped(hash.to_string()))?;
        if self.revert_on_confirm.get() {
            return Err(CallError::Reverted("execution reverted".to_string()));
        }
        match effect {
            Effect::Deposit {
                duration_secs,
                value,
            } => {
                self.balance.set(self.balance.get() + value);
                self.expiry.set(self.now_secs.get() + duration_secs);
            }
            Effect::Approve { amount } => self.allowance.set(amount),
            Effect::Repay => {
                if self.allowance.get() < self.repay_amount.get() {
                    return Err(CallError::Reverted("InsufficientAllowance".to_string()));
                }
                if let Some(loan) = self.loan.borrow_mut().as_mut() {
                    loan.active = false;
                }
            }
        }
        Ok(TransactionReceipt {
            hash: *hash,
            confirmed: true,
        })
    }
}

#[derive(Clone, Default)]
pub struct MockChain {
    pub ledger: Rc<Ledger>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MockVault {
    ledger: Rc<Ledger>,
    signer: Address,
}

pub struct MockLoans {
    ledger: Rc<Ledger>,
    signer: Address,
}

pub struct MockToken {
    ledger: Rc<Ledger>,
    signer: Address,
}

impl Connect<VaultInterface> for MockChain {
    type Contract = MockVault;

    fn connect(&self, address: Address, binding: SignerBinding) -> MockVault {
        self.ledger.binds.borrow_mut().push(("vault", address, binding));
        MockVault {
            ledger: Rc::clone(&self.ledger),
            signer: binding.account,
        }
    }
}

impl Connect<LoanInterface> for MockChain {
    type Contract = MockLoans;

    fn connect(&self, address: Address, binding: SignerBinding) -> MockLoans {
        self.ledger.binds.borrow_mut().push(("loans", address, binding));
        MockLoans {
            ledger: Rc::clone(&self.ledger),
            signer: binding.account,
        }
    }
}

impl Connect<TokenInterface> for MockChain {
    type Contract = MockToken;

    fn connect(&self, address: Address, binding: SignerBinding) -> MockToken {
        self.ledger.binds.borrow_mut().push(("token", address, binding));
        MockToken {
            ledger: Rc::clone(&self.ledger),
            signer: binding.account,
        }
    }
}

impl Confirm for MockVault {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.ledger.confirm(tx)
    }
}

impl VaultApi for MockVault {
    fn deposit(
        &mut self,
        token: Address,
        duration_secs: u64,
        value: U512,
    ) -> Result<TxHash, CallError> {
        let hash = self.ledger.submit(Effect::Deposit {
            duration_secs,
            value,
        })?;
        self.ledger.deposits.borrow_mut().push(DepositCall {
            signer: self.signer,
            token,
            duration_secs,
            value,
        });
        Ok(hash)
    }

    fn get_balance(&self) -> Result<U512, CallError> {
        self.ledger.read(self.ledger.balance.get())
    }

    fn get_expiry_date(&self) -> Result<u64, CallError> {
        self.ledger.read(self.ledger.expiry.get())
    }
}

impl Confirm for MockLoans {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.ledger.confirm(tx)
    }
}

impl LoanApi for MockLoans {
    fn user_details(&self, user: Address) -> Result<LoanRecord, CallError> {
        let record = match self.ledger.loan.borrow().as_ref() {
            Some(loan) if loan.borrower == user => loan.clone(),
            _ => LoanRecord {
                borrower: null_address(),
                collateral_token: null_address(),
                principal_deposited: U256::zero(),
                interest_rate_bps: 0,
                duration_secs: 0,
                end_timestamp: 0,
                active: false,
            },
        };
        self.ledger.read(record)
    }

    fn calculate_current_repay_amount(&self) -> Result<U256, CallError> {
        self.ledger
            .repay_amount_reads
            .set(self.ledger.repay_amount_reads.get() + 1);
        self.ledger.read(self.ledger.repay_amount.get())
    }

    fn repay(&mut self) -> Result<TxHash, CallError> {
        let hash = self.ledger.submit(Effect::Repay)?;
        self.ledger.repays.borrow_mut().push(self.signer);
        Ok(hash)
    }
}

impl Confirm for MockToken {
    fn wait(&self, tx: &TxHash) -> Result<TransactionReceipt, CallError> {
        self.ledger.confirm(tx)
    }
}

impl TokenApi for MockToken {
    fn allowance(&self, _owner: Address, _spender: Address) -> Result<U256, CallError> {
        self.ledger
            .allowance_reads
            .set(self.ledger.allowance_reads.get() + 1);
        if self.ledger.fail_allowance_reads.get() {
            return Err(CallError::Reverted("node unavailable".to_string()));
        }
        self.ledger.read(self.ledger.allowance.get())
    }

    fn approve(&mut self, spender: Address, amount: U256) -> Result<TxHash, CallError> {
        let hash = self.ledger.submit(Effect::Approve { amount })?;
        self.ledger
            .approvals
            .borrow_mut()
            .push((self.signer, spender, amount));
        Ok(hash)
    }
}
