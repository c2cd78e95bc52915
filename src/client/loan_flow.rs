//! Loan lifecycle on the loan network: load the loan, compute what is owed,
//! raise the token allowance and repay.
//!
//! The repay amount grows with time, so it is re-read on every explicit
//! refresh and once more (with the allowance) right before `repay` is
//! submitted. Approve and repay are never in flight together.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use odra::casper_types::U256;
use odra::prelude::Address;

use super::binder::{
    Connect, ContractBinder, ContractHandle, LoanInterface, SignerBinding, TokenInterface,
};
use super::chain::{ChainId, ChainRegistry};
use super::clock::Clock;
use super::contracts::{Confirm, LoanApi, LoanRecord, TokenApi, TransactionReceipt, TxHash};
use super::error::{ClientError, ClientResult, InputError};
use super::notice::Notices;
use super::state::{LoanTxState, Reading};
use super::wallet::Session;

/// Repay amount due at `fetched_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAmount {
    pub amount: U256,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingWrite {
    Approve { token: Address, amount: U256 },
    Repay,
}

type LoanHandle<B> = ContractHandle<<B as Connect<LoanInterface>>::Contract>;
type TokenHandle<B> = ContractHandle<<B as Connect<TokenInterface>>::Contract>;

pub struct LoanWorkflow<B>
where
    B: Connect<LoanInterface> + Connect<TokenInterface>,
{
    binder: ContractBinder<B>,
    loan_address: Address,
    network: ChainId,
    clock: Rc<dyn Clock>,
    notices: Notices,

    bound: Option<SignerBinding>,
    loans: Option<LoanHandle<B>>,
    token: Option<TokenHandle<B>>,

    record: Reading<Option<LoanRecord>>,
    pending_amount: Reading<PendingAmount>,
    allowance: Reading<U256>,
    allowance_sufficient: bool,

    state: LoanTxState,
    history: Vec<LoanTxState>,
    pending_tx: Option<(TxHash, PendingWrite)>,
    receipt: Option<TransactionReceipt>,
    last_error: Option<ClientError>,
}

impl<B> LoanWorkflow<B>
where
    B: Connect<LoanInterface> + Connect<TokenInterface>,
    <B as Connect<LoanInterface>>::Contract: LoanApi,
    <B as Connect<TokenInterface>>::Contract: TokenApi,
{
    pub fn new(
        binder: ContractBinder<B>,
        loan_address: Address,
        network: ChainId,
        clock: Rc<dyn Clock>,
        notices: Notices,
    ) -> Self {
        Self {
            binder,
            loan_address,
            network,
            clock,
            notices,
            bound: None,
            loans: None,
            token: None,
            record: Reading::Unknown,
            pending_amount: Reading::Unknown,
            allowance: Reading::Unknown,
            allowance_sufficient: false,
            state: LoanTxState::Idle,
            history: vec![LoanTxState::Idle],
            pending_tx: None,
            receipt: None,
            last_error: None,
        }
    }

    pub fn network(&self) -> ChainId {
        self.network
    }

    pub fn loan_address(&self) -> Address {
        self.loan_address
    }

    /// `Fresh(None)` means the account has no loan.
    pub fn record(&self) -> &Reading<Option<LoanRecord>> {
        &self.record
    }

    pub fn pending_amount(&self) -> &Reading<PendingAmount> {
        &self.pending_amount
    }

    pub fn allowance(&self) -> &Reading<U256> {
        &self.allowance
    }

    pub fn allowance_sufficient(&self) -> bool {
        self.allowance_sufficient
    }

    pub fn state(&self) -> LoanTxState {
        self.state
    }

    pub fn history(&self) -> &[LoanTxState] {
        &self.history
    }

    pub fn pending_tx(&self) -> Option<TxHash> {
        self.pending_tx.map(|(hash, _)| hash)
    }

    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        self.receipt.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn receipt_url(&self, registry: &ChainRegistry) -> Option<String> {
        let receipt = self.receipt.as_ref()?;
        registry
            .describe(self.network)
            .ok()?
            .tx_url(&receipt.hash.to_string())
    }

    /// Approve is offered only for an active loan with a fresh repay amount
    /// that the current allowance does not cover.
    pub fn can_approve(&self) -> bool {
        !self.state.is_busy()
            && self.active_loan().is_some()
            && self.pending_amount.is_fresh()
            && !self.allowance_sufficient
    }

    pub fn can_repay(&self) -> bool {
        !self.state.is_busy() && self.active_loan().is_some() && self.allowance_sufficient
    }

    pub fn load_loan(&mut self, session: &Session) -> ClientResult<Option<LoanRecord>> {
        let read = self.loans(session).and_then(|(account, handle)| {
            handle
                .contract()
                .user_details(account)
                .map_err(ClientError::from_read)
        });
        match read {
            Ok(record) if record.is_absent() => {
                self.record = Reading::Fresh(None);
                self.clear_derived();
                self.notices.info("No active loan found");
                Ok(None)
            }
            Ok(record) => {
                log::info!(
                    "loan of {:?}: {} deposited, active={}",
                    record.borrower,
                    record.principal_display(),
                    record.active
                );
                // Amount and allowance belong to the record they were read for.
                let unchanged = matches!(self.record.last_known(), Some(Some(known)) if *known == record);
                if !record.active || !unchanged {
                    self.clear_derived();
                }
                self.record = Reading::Fresh(Some(record.clone()));
                Ok(Some(record))
            }
            Err(err) => {
                self.record.mark_stale();
                self.reject(err, "Failed to fetch loan details")
            }
        }
    }

    /// Always asks the contract; the amount grows with time.
    pub fn compute_pending_amount(&mut self, session: &Session) -> ClientResult<U256> {
        if self.active_loan().is_none() {
            return self.reject(
                ClientError::PreconditionFailed("no active loan"),
                "No active loan found",
            );
        }
        let read = self.loans(session).and_then(|(_, handle)| {
            handle
                .contract()
                .calculate_current_repay_amount()
                .map_err(ClientError::from_read)
        });
        match read {
            Ok(amount) => {
                self.pending_amount = Reading::Fresh(PendingAmount {
                    amount,
                    fetched_at: self.clock.now(),
                });
                self.allowance_sufficient =
                    matches!(self.allowance.fresh(), Some(allowance) if *allowance >= amount);
                Ok(amount)
            }
            Err(err) => {
                self.pending_amount.mark_stale();
                self.reject(err, "Failed to calculate repay amount")
            }
        }
    }

    /// Compares `allowance(borrower, loan manager)` with the fresh repay
    /// amount, in base units.
    pub fn check_allowance(&mut self, session: &Session) -> ClientResult<bool> {
        let Some(token) = self.active_loan().map(|r| r.collateral_token) else {
            return self.reject(
                ClientError::PreconditionFailed("no active loan"),
                "No active loan found",
            );
        };
        let Some(pending) = self.pending_amount.fresh().map(|p| p.amount) else {
            return self.reject(
                ClientError::PreconditionFailed("repay amount not computed"),
                "Please refresh the repay amount first.",
            );
        };
        let spender = self.loan_address;
        let read = self.token(session, token).and_then(|(owner, handle)| {
            handle
                .contract()
                .allowance(owner, spender)
                .map_err(ClientError::from_read)
        });
        match read {
            Ok(allowance) => {
                self.allowance = Reading::Fresh(allowance);
                self.allowance_sufficient = allowance >= pending;
                log::debug!(
                    "allowance {} against repay amount {}: sufficient={}",
                    allowance,
                    pending,
                    self.allowance_sufficient
                );
                Ok(self.allowance_sufficient)
            }
            Err(err) => {
                self.allowance.mark_stale();
                self.reject(err, "Failed to check token allowance")
            }
        }
    }

    /// Submits `approve(loan manager, amount)` for exactly `amount`.
    pub fn submit_approve(&mut self, session: &Session, amount: U256) -> ClientResult<TxHash> {
        self.ensure_ready(session)?;
        let Some(token) = self.active_loan().map(|r| r.collateral_token) else {
            return self.reject(
                ClientError::PreconditionFailed("no active loan"),
                "No active loan found",
            );
        };
        if self.allowance_sufficient {
            return self.reject(
                ClientError::PreconditionFailed("allowance already sufficient"),
                "Allowance already covers the repay amount.",
            );
        }
        if amount.is_zero() {
            return self.reject(
                InputError::Amount(amount.to_string()).into(),
                "Please enter a valid approval amount.",
            );
        }

        self.receipt = None;
        self.enter(LoanTxState::Approving);
        self.notices.info("Initiating approval transaction...");

        let spender = self.loan_address;
        let submitted = self.token(session, token).and_then(|(_, handle)| {
            handle
                .contract_mut()
                .approve(spender, amount)
                .map_err(ClientError::from_write)
        });
        match submitted {
            Ok(hash) => {
                self.pending_tx = Some((hash, PendingWrite::Approve { token, amount }));
                self.notices
                    .info("Approval transaction sent. Waiting for confirmation...");
                Ok(hash)
            }
            Err(err) => self.fail(err, PendingWrite::Approve { token, amount }),
        }
    }

    /// Submits `repay()` after re-reading the repay amount and allowance.
    pub fn submit_repay(&mut self, session: &Session) -> ClientResult<TxHash> {
        self.ensure_ready(session)?;
        if self.active_loan().is_none() {
            return self.reject(
                ClientError::PreconditionFailed("no active loan"),
                "No active loan found",
            );
        }
        if !self.allowance_sufficient {
            return self.reject(
                ClientError::PreconditionFailed("token allowance is insufficient"),
                "Please approve tokens before repaying.",
            );
        }

        // The amount may have grown past the approval since it was checked.
        self.compute_pending_amount(session)?;
        if !self.check_allowance(session)? {
            return self.reject(
                ClientError::PreconditionFailed("repay amount exceeds the approved allowance"),
                "Repay amount increased since approval. Please approve again.",
            );
        }

        self.receipt = None;
        self.enter(LoanTxState::Repaying);
        self.notices.info("Initiating repayment transaction...");

        let submitted = self.loans(session).and_then(|(_, handle)| {
            handle
                .contract_mut()
                .repay()
                .map_err(ClientError::from_write)
        });
        match submitted {
            Ok(hash) => {
                self.pending_tx = Some((hash, PendingWrite::Repay));
                self.notices
                    .info("Transaction sent. Waiting for confirmation...");
                Ok(hash)
            }
            Err(err) => self.fail(err, PendingWrite::Repay),
        }
    }

    /// Waits for the pending approve or repay and refreshes what it changed.
    pub fn confirm_pending(&mut self, session: &Session) -> ClientResult<TransactionReceipt> {
        let Some((hash, write)) = self.pending_tx else {
            return self.reject(
                ClientError::PreconditionFailed("no transaction awaiting confirmation"),
                "No transaction is awaiting confirmation.",
            );
        };

        let waited = match write {
            PendingWrite::Approve { token, .. } => self
                .token(session, token)
                .and_then(|(_, handle)| wait(handle.contract(), &hash)),
            PendingWrite::Repay => self
                .loans(session)
                .and_then(|(_, handle)| wait(handle.contract(), &hash)),
        };
        let receipt = match waited {
            Ok(receipt) => receipt,
            Err(ClientError::PreconditionFailed(reason)) => {
                return self.reject(
                    ClientError::PreconditionFailed(reason),
                    "Switch back to the loan network to follow the transaction.",
                );
            }
            Err(err) => return self.fail(err, write),
        };

        self.pending_tx = None;
        self.receipt = Some(receipt);
        self.enter(LoanTxState::Confirmed);

        match write {
            PendingWrite::Approve { amount, .. } => {
                self.notices.success("Token approval successful!");
                self.allowance_sufficient = true;
                if self.check_allowance(session).is_err() {
                    self.allowance_sufficient = matches!(
                        self.pending_amount.last_known(),
                        Some(pending) if amount >= pending.amount
                    );
                }
            }
            PendingWrite::Repay => {
                self.notices.success("Loan repaid successfully!");
                self.record.mark_stale();
                self.clear_derived();
                let _ = self.load_loan(session);
            }
        }

        self.enter(LoanTxState::Idle);
        Ok(receipt)
    }

    pub fn approve(&mut self, session: &Session, amount: U256) -> ClientResult<TransactionReceipt> {
        self.submit_approve(session, amount)?;
        self.confirm_pending(session)
    }

    pub fn repay(&mut self, session: &Session) -> ClientResult<TransactionReceipt> {
        self.submit_repay(session)?;
        self.confirm_pending(session)
    }

    fn active_loan(&self) -> Option<&LoanRecord> {
        self.record
            .last_known()
            .and_then(|r| r.as_ref())
            .filter(|r| r.active)
    }

    /// Checks that a write may start: nothing in flight, wallet connected
    /// and on the loan network.
    fn ensure_ready(&mut self, session: &Session) -> ClientResult<()> {
        if self.state.is_busy() {
            return self.reject(
                ClientError::PreconditionFailed("a transaction is already in progress"),
                "A transaction is already in progress.",
            );
        }
        if !session.is_connected() {
            return self.reject(
                ClientError::PreconditionFailed("wallet not connected"),
                "Please connect your wallet first.",
            );
        }
        if session.active_network != self.network {
            return self.reject(
                ClientError::PreconditionFailed("wallet is on another network"),
                "Please switch to the loan network first.",
            );
        }
        Ok(())
    }

    /// Drops handles and everything read for a previous account or network.
    fn sync_session(&mut self, session: &Session) -> ClientResult<SignerBinding> {
        if session.active_network != self.network {
            return Err(ClientError::PreconditionFailed("wallet is on another network"));
        }
        let binding = SignerBinding::of(session)
            .ok_or(ClientError::PreconditionFailed("wallet not connected"))?;
        if self.bound != Some(binding) {
            if self.bound.is_some() {
                log::info!("session changed, dropping loan state of {:?}", self.bound);
                self.record = Reading::Unknown;
                self.clear_derived();
                self.receipt = None;
            }
            self.loans = None;
            self.token = None;
            self.bound = Some(binding);
        }
        Ok(binding)
    }

    fn loans(&mut self, session: &Session) -> ClientResult<(Address, &mut LoanHandle<B>)> {
        let binding = self.sync_session(session)?;
        let handle = match self.loans.take() {
            Some(handle) if handle.is_bound_to(session) => handle,
            _ => self
                .binder
                .bind(LoanInterface, self.loan_address, session)?,
        };
        Ok((binding.account, self.loans.insert(handle)))
    }

    fn token(
        &mut self,
        session: &Session,
        token: Address,
    ) -> ClientResult<(Address, &mut TokenHandle<B>)> {
        let binding = self.sync_session(session)?;
        let handle = match self.token.take() {
            Some(handle) if handle.is_bound_to(session) && handle.address() == token => handle,
            _ => self.binder.bind(TokenInterface, token, session)?,
        };
        Ok((binding.account, self.token.insert(handle)))
    }

    fn clear_derived(&mut self) {
        self.pending_amount = Reading::Unknown;
        self.allowance = Reading::Unknown;
        self.allowance_sufficient = false;
    }

    fn enter(&mut self, state: LoanTxState) {
        self.state = state;
        self.history.push(state);
    }

    fn fail<T>(&mut self, err: ClientError, write: PendingWrite) -> ClientResult<T> {
        self.pending_tx = None;
        self.enter(LoanTxState::Failed);
        let notice = match (write, &err) {
            (_, ClientError::UserRejected) => "Transaction rejected in wallet.",
            (PendingWrite::Approve { .. }, _) => "Approval failed. Please try again.",
            (PendingWrite::Repay, _) => "Repayment failed. Please try again.",
        };
        self.reject(err, notice)
    }

    fn reject<T>(&mut self, err: ClientError, notice: &str) -> ClientResult<T> {
        self.notices.error(notice);
        match err {
            ClientError::ReadFailed(_) => log::warn!("loans: {}", err),
            _ => log::error!("loans: {}", err),
        }
        self.last_error = Some(err.clone());
        Err(err)
    }
}

fn wait<C: Confirm>(contract: &C, hash: &TxHash) -> ClientResult<TransactionReceipt> {
    match contract.wait(hash) {
        Ok(receipt) if receipt.confirmed => Ok(receipt),
        Ok(_) => Err(ClientError::TransactionFailed(format!(
            "transaction {} was not confirmed",
            hash
        ))),
        Err(err) => Err(ClientError::from_write(err)),
    }
}
