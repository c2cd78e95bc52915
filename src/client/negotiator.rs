//! Moves the wallet onto a target network, registering it first when the
//! wallet does not know it.

use std::rc::Rc;

use super::chain::{ChainId, ChainRegistry};
use super::error::{ClientError, ProviderError};
use super::notice::Notices;
use super::wallet::WalletProvider;

pub struct ChainNegotiator<W: WalletProvider> {
    provider: Rc<W>,
    registry: Rc<ChainRegistry>,
    notices: Notices,
    last_error: Option<ClientError>,
}

impl<W: WalletProvider> ChainNegotiator<W> {
    pub fn new(provider: Rc<W>, registry: Rc<ChainRegistry>, notices: Notices) -> Self {
        Self {
            provider,
            registry,
            notices,
            last_error: None,
        }
    }

    /// Returns whether the wallet ends up on `target`. Failures are reported
    /// through the notices and `last_error`, never returned.
    pub fn ensure_network(&mut self, target: ChainId) -> bool {
        match self.negotiate(target) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(Failure { error, notice }) => {
                self.notices.error(notice);
                log::error!("switching to {} failed: {}", target, error);
                self.last_error = Some(error);
                false
            }
        }
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    fn negotiate(&self, target: ChainId) -> Result<(), Failure> {
        if self.provider.chain_id() == target {
            return Ok(());
        }
        let network = self.registry.describe(target).map_err(|error| Failure {
            error,
            notice: "Unsupported network",
        })?;

        match self.provider.switch_chain(target) {
            Ok(()) => Ok(()),
            Err(err) if err.is_unrecognized_chain() => {
                log::info!("wallet does not know {}, adding {}", target, network.display_name);
                self.provider.add_chain(network).map_err(|err| Failure {
                    error: switch_error(err),
                    notice: "Failed to add network to wallet",
                })?;
                // Most wallets switch on add; the rest get one explicit switch.
                if self.provider.chain_id() != target {
                    self.provider.switch_chain(target).map_err(Failure::switch)?;
                }
                Ok(())
            }
            Err(err) => Err(Failure::switch(err)),
        }
    }
}

struct Failure {
    error: ClientError,
    notice: &'static str,
}

impl Failure {
    fn switch(err: ProviderError) -> Self {
        Self {
            error: switch_error(err),
            notice: "Failed to switch network. Please try again.",
        }
    }
}

fn switch_error(err: ProviderError) -> ClientError {
    if err.is_user_rejection() {
        ClientError::UserRejected
    } else {
        ClientError::NetworkSwitchFailed(err.to_string())
    }
}
