//! Top-level controller: one wallet session, one negotiator and the two
//! workflows, each living on its own network.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use odra::casper_types::U256;

use super::binder::{Connect, LoanInterface, TokenInterface, VaultInterface};
use super::chain::{ChainId, ChainRegistry};
use super::contracts::{LoanApi, TokenApi, TransactionReceipt, VaultApi};
use super::error::{ClientError, ClientResult};
use super::loan_flow::LoanWorkflow;
use super::negotiator::ChainNegotiator;
use super::notice::Notices;
use super::vault_flow::VaultWorkflow;
use super::wallet::{Session, WalletProvider, WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Vault,
    Loans,
}

pub struct Dapp<W, V, L>
where
    W: WalletProvider,
    V: Connect<VaultInterface>,
    L: Connect<LoanInterface> + Connect<TokenInterface>,
{
    registry: Rc<ChainRegistry>,
    notices: Notices,
    session: WalletSession<W>,
    negotiator: Option<ChainNegotiator<W>>,
    vault: VaultWorkflow<V>,
    loans: LoanWorkflow<L>,
    panel: Option<Panel>,
}

impl<W, V, L> Dapp<W, V, L>
where
    W: WalletProvider,
    V: Connect<VaultInterface>,
    V::Contract: VaultApi,
    L: Connect<LoanInterface> + Connect<TokenInterface>,
    <L as Connect<LoanInterface>>::Contract: LoanApi,
    <L as Connect<TokenInterface>>::Contract: TokenApi,
{
    /// `provider` is `None` when no wallet is installed.
    pub fn new(
        provider: Option<Rc<W>>,
        registry: Rc<ChainRegistry>,
        vault: VaultWorkflow<V>,
        loans: LoanWorkflow<L>,
        notices: Notices,
    ) -> Self {
        let negotiator = provider
            .clone()
            .map(|p| ChainNegotiator::new(p, Rc::clone(&registry), notices.clone()));
        Self {
            registry,
            notices,
            session: WalletSession::new(provider),
            negotiator,
            vault,
            loans,
            panel: None,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn wallet(&self) -> &WalletSession<W> {
        &self.session
    }

    pub fn vault(&self) -> &VaultWorkflow<V> {
        &self.vault
    }

    pub fn loans(&self) -> &LoanWorkflow<L> {
        &self.loans
    }

    pub fn panel(&self) -> Option<Panel> {
        self.panel
    }

    pub fn negotiator(&self) -> Option<&ChainNegotiator<W>> {
        self.negotiator.as_ref()
    }

    pub fn network_of(&self, panel: Panel) -> ChainId {
        match panel {
            Panel::Vault => self.vault.network(),
            Panel::Loans => self.loans.network(),
        }
    }

    pub fn connect(&mut self) -> ClientResult<Session> {
        self.session.connect().map_err(|err| {
            let notice = match err {
                ClientError::WalletUnavailable => "Please install a wallet to use this dApp!",
                _ => "Failed to connect to wallet. Please try again.",
            };
            self.notices.error(notice);
            err
        })
    }

    /// Moves the wallet to the panel's network and loads what the panel
    /// shows. Returns false when the network could not be reached.
    pub fn switch_to(&mut self, panel: Panel) -> bool {
        let target = self.network_of(panel);
        let Some(negotiator) = self.negotiator.as_mut() else {
            self.notices.error("Please install a wallet to use this dApp!");
            return false;
        };
        if !negotiator.ensure_network(target) {
            return false;
        }

        if !self.session.is_connected() && self.connect().is_err() {
            return false;
        }
        if let Err(err) = self.session.sync_network() {
            log::error!("could not read the wallet network: {}", err);
            return false;
        }
        if let Ok(network) = self.registry.describe(target) {
            self.notices
                .success(format!("Switched to {} network", network.display_name));
        }
        self.panel = Some(panel);
        self.mount(panel);
        true
    }

    /// Workflows report their own failures; mounting never fails the switch.
    fn mount(&mut self, panel: Panel) {
        let Some(session) = self.session.snapshot() else {
            return;
        };
        match panel {
            Panel::Vault => {
                let _ = self.vault.mount(&session);
            }
            Panel::Loans => {
                if let Ok(Some(record)) = self.loans.load_loan(&session) {
                    if record.active {
                        let _ = self.refresh_repay_amount();
                    }
                }
            }
        }
    }

    pub fn deposit(
        &mut self,
        token_name: &str,
        amount_eth: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<TransactionReceipt> {
        let session = self.current_session()?;
        self.vault.deposit(&session, token_name, amount_eth, end)
    }

    /// Re-reads the repay amount and whether the allowance covers it.
    pub fn refresh_repay_amount(&mut self) -> ClientResult<(U256, bool)> {
        let session = self.current_session()?;
        let amount = self.loans.compute_pending_amount(&session)?;
        let sufficient = self.loans.check_allowance(&session)?;
        Ok((amount, sufficient))
    }

    /// Approves exactly the current repay amount.
    pub fn approve(&mut self) -> ClientResult<TransactionReceipt> {
        let session = self.current_session()?;
        let amount = match self.loans.pending_amount().fresh() {
            Some(pending) => pending.amount,
            None => self.loans.compute_pending_amount(&session)?,
        };
        self.loans.approve(&session, amount)
    }

    pub fn repay(&mut self) -> ClientResult<TransactionReceipt> {
        let session = self.current_session()?;
        self.loans.repay(&session)
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.panel = None;
    }

    fn current_session(&self) -> ClientResult<Session> {
        match self.session.snapshot() {
            Some(session) if session.is_connected() => Ok(session),
            _ => {
                self.notices.error("Please connect your wallet first.");
                Err(ClientError::PreconditionFailed("wallet not connected"))
            }
        }
    }
}
