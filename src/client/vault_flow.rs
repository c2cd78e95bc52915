//! Deposit workflow on the vault network.
//!
//! `Idle -> Submitting -> AwaitingConfirmation -> Confirmed -> Idle`, or
//! `Failed` on any submission/confirmation error. Balance and expiry are
//! re-read after every confirmed deposit before returning to `Idle`.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use odra::casper_types::U512;
use odra::prelude::Address;

use super::binder::{Connect, ContractBinder, ContractHandle, VaultInterface};
use super::chain::{ChainId, ChainRegistry};
use super::clock::Clock;
use super::contracts::{Confirm, TransactionReceipt, TxHash, VaultApi};
use super::error::{ClientError, ClientResult, InputError};
use super::notice::Notices;
use super::state::{Reading, TxState};
use super::units::parse_ether;
use super::wallet::Session;

/// A loan token offered in the deposit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChoice {
    pub address: Address,
    pub name: String,
    pub interest_rate_bps: u64,
}

/// Validated arguments of a `deposit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub token: Address,
    pub duration_secs: u64,
    pub value: U512,
}

type VaultHandle<B> = ContractHandle<<B as Connect<VaultInterface>>::Contract>;

pub struct VaultWorkflow<B: Connect<VaultInterface>> {
    binder: ContractBinder<B>,
    contract_address: Address,
    network: ChainId,
    tokens: Vec<TokenChoice>,
    clock: Rc<dyn Clock>,
    notices: Notices,

    handle: Option<VaultHandle<B>>,
    state: TxState,
    history: Vec<TxState>,
    pending: Option<TxHash>,
    receipt: Option<TransactionReceipt>,
    balance: Reading<U512>,
    expiry: Reading<Option<DateTime<Utc>>>,
    last_error: Option<ClientError>,
}

impl<B> VaultWorkflow<B>
where
    B: Connect<VaultInterface>,
    B::Contract: VaultApi,
{
    pub fn new(
        binder: ContractBinder<B>,
        contract_address: Address,
        network: ChainId,
        tokens: Vec<TokenChoice>,
        clock: Rc<dyn Clock>,
        notices: Notices,
    ) -> Self {
        Self {
            binder,
            contract_address,
            network,
            tokens,
            clock,
            notices,
            handle: None,
            state: TxState::Idle,
            history: vec![TxState::Idle],
            pending: None,
            receipt: None,
            balance: Reading::Unknown,
            expiry: Reading::Unknown,
            last_error: None,
        }
    }

    pub fn network(&self) -> ChainId {
        self.network
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn tokens(&self) -> &[TokenChoice] {
        &self.tokens
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Every state entered so far, oldest first.
    pub fn history(&self) -> &[TxState] {
        &self.history
    }

    pub fn can_deposit(&self) -> bool {
        !self.state.is_busy()
    }

    pub fn pending_tx(&self) -> Option<TxHash> {
        self.pending
    }

    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        self.receipt.as_ref()
    }

    pub fn balance(&self) -> &Reading<U512> {
        &self.balance
    }

    pub fn expiry(&self) -> &Reading<Option<DateTime<Utc>>> {
        &self.expiry
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Explorer link of the last confirmed deposit.
    pub fn receipt_url(&self, registry: &ChainRegistry) -> Option<String> {
        let receipt = self.receipt.as_ref()?;
        registry
            .describe(self.network)
            .ok()?
            .tx_url(&receipt.hash.to_string())
    }

    pub fn find_token(&self, name: &str) -> Result<&TokenChoice, InputError> {
        self.tokens
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| InputError::UnknownToken(name.to_string()))
    }

    /// Validates the form and converts it into contract arguments.
    pub fn prepare_deposit(
        &self,
        token_name: &str,
        amount_eth: &str,
        end: DateTime<Utc>,
    ) -> Result<DepositRequest, InputError> {
        let token = self.find_token(token_name)?.address;
        let value = parse_ether(amount_eth)?;

        let duration = end.timestamp() - self.clock.now().timestamp();
        if duration <= 0 {
            return Err(InputError::EndDate);
        }
        let duration_secs = u64::try_from(duration).map_err(|_| InputError::EndDate)?;

        Ok(DepositRequest {
            token,
            duration_secs,
            value,
        })
    }

    /// Reads balance and expiry when the vault view is shown.
    pub fn mount(&mut self, session: &Session) -> ClientResult<()> {
        let balance = self.refresh_balance(session).map(|_| ());
        let expiry = self.refresh_expiry(session).map(|_| ());
        balance.and(expiry)
    }

    /// Validates and submits a deposit, leaving the workflow in
    /// `AwaitingConfirmation`.
    pub fn submit_deposit(
        &mut self,
        session: &Session,
        token_name: &str,
        amount_eth: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<TxHash> {
        if self.state.is_busy() {
            return self.reject(
                ClientError::PreconditionFailed("deposit already in progress"),
                "A deposit is already in progress.",
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
                "Please switch to the vault network first.",
            );
        }
        let request = match self.prepare_deposit(token_name, amount_eth, end) {
            Ok(request) => request,
            Err(err) => {
                let notice = input_notice(&err);
                return self.reject(err.into(), notice);
            }
        };

        self.receipt = None;
        self.enter(TxState::Submitting);
        self.notices.info("Initiating deposit transaction...");
        log::info!(
            "deposit {} wei for {} seconds against {:?}",
            request.value,
            request.duration_secs,
            request.token
        );

        let submitted = self.contract(session).and_then(|handle| {
            handle
                .contract_mut()
                .deposit(request.token, request.duration_secs, request.value)
                .map_err(ClientError::from_write)
        });
        match submitted {
            Ok(hash) => {
                self.pending = Some(hash);
                self.enter(TxState::AwaitingConfirmation);
                self.notices.info("Transaction sent. Waiting for confirmation...");
                Ok(hash)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Waits for the pending deposit, then refreshes balance and expiry.
    pub fn confirm_deposit(&mut self, session: &Session) -> ClientResult<TransactionReceipt> {
        let hash = match (self.state, self.pending) {
            (TxState::AwaitingConfirmation, Some(hash)) => hash,
            _ => {
                return self.reject(
                    ClientError::PreconditionFailed("no deposit awaiting confirmation"),
                    "No deposit is awaiting confirmation.",
                )
            }
        };

        let waited = self.contract(session).and_then(|handle| {
            handle
                .contract()
                .wait(&hash)
                .map_err(ClientError::from_write)
        });
        let receipt = match waited {
            Ok(receipt) if receipt.confirmed => receipt,
            Ok(_) => {
                return self.fail(ClientError::TransactionFailed(format!(
                    "transaction {} was not confirmed",
                    hash
                )))
            }
            Err(ClientError::PreconditionFailed(reason)) => {
                // Still pending; the wait can be retried once the session is back.
                return self.reject(
                    ClientError::PreconditionFailed(reason),
                    "Switch back to the vault network to follow the deposit.",
                );
            }
            Err(err) => return self.fail(err),
        };

        self.pending = None;
        self.receipt = Some(receipt);
        self.enter(TxState::Confirmed);
        self.notices.success("Deposit successful!");

        // Read failures are reported by the refreshes; the deposit stands.
        let _ = self.refresh_balance(session);
        let _ = self.refresh_expiry(session);

        self.enter(TxState::Idle);
        Ok(receipt)
    }

    /// Submits and waits for a deposit in one go.
    pub fn deposit(
        &mut self,
        session: &Session,
        token_name: &str,
        amount_eth: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<TransactionReceipt> {
        self.submit_deposit(session, token_name, amount_eth, end)?;
        self.confirm_deposit(session)
    }

    pub fn refresh_balance(&mut self, session: &Session) -> ClientResult<U512> {
        let read = self.contract(session).and_then(|handle| {
            handle
                .contract()
                .get_balance()
                .map_err(ClientError::from_read)
        });
        match read {
            Ok(balance) => {
                self.balance = Reading::Fresh(balance);
                Ok(balance)
            }
            Err(err) => {
                self.balance.mark_stale();
                self.reject(err, "Failed to fetch balance. Please try again.")
            }
        }
    }

    /// Expiry of the caller's deposit; `None` when nothing is locked.
    pub fn refresh_expiry(&mut self, session: &Session) -> ClientResult<Option<DateTime<Utc>>> {
        let read = self.contract(session).and_then(|handle| {
            handle
                .contract()
                .get_expiry_date()
                .map_err(ClientError::from_read)
        });
        match read {
            Ok(secs) => {
                let expiry = match secs {
                    0 => None,
                    secs => i64::try_from(secs)
                        .ok()
                        .and_then(|s| DateTime::from_timestamp(s, 0)),
                };
                self.expiry = Reading::Fresh(expiry);
                Ok(expiry)
            }
            Err(err) => {
                self.expiry.mark_stale();
                self.reject(err, "Failed to fetch expiry date. Please try again.")
            }
        }
    }

    /// Handle bound to the current session; rebinds (and forgets state read
    /// for another signer) whenever the account or network changed.
    fn contract(&mut self, session: &Session) -> ClientResult<&mut VaultHandle<B>> {
        if session.active_network != self.network {
            return Err(ClientError::PreconditionFailed("wallet is on another network"));
        }
        let handle = match self.handle.take() {
            Some(handle) if handle.is_bound_to(session) => handle,
            previous => {
                if previous.is_some() {
                    log::info!("session changed, rebinding vault contract");
                    self.balance = Reading::Unknown;
                    self.expiry = Reading::Unknown;
                    self.receipt = None;
                }
                self.binder
                    .bind(VaultInterface, self.contract_address, session)?
            }
        };
        Ok(self.handle.insert(handle))
    }

    fn enter(&mut self, state: TxState) {
        self.state = state;
        self.history.push(state);
    }

    /// Terminal failure of the current attempt.
    fn fail<T>(&mut self, err: ClientError) -> ClientResult<T> {
        self.pending = None;
        self.enter(TxState::Failed);
        let notice = match err {
            ClientError::UserRejected => "Deposit rejected in wallet.",
            _ => "Deposit failed. Please try again.",
        };
        self.reject(err, notice)
    }

    /// Reports an error without touching the transaction state.
    fn reject<T>(&mut self, err: ClientError, notice: &str) -> ClientResult<T> {
        self.notices.error(notice);
        match err {
            ClientError::ReadFailed(_) => log::warn!("vault: {}", err),
            _ => log::error!("vault: {}", err),
        }
        self.last_error = Some(err.clone());
        Err(err)
    }
}

fn input_notice(err: &InputError) -> &'static str {
    match err {
        InputError::UnknownToken(_) => "Please select a token.",
        InputError::EndDate => "End date must be in the future.",
        InputError::Amount(_) => "Please enter a valid deposit amount.",
        _ => "Invalid input.",
    }
}
