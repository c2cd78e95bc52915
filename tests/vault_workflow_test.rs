//! Deposit workflow against in-memory contracts.

mod common;

use std::rc::Rc;

use chrono::{Duration, TimeZone, Utc};
use odra::casper_types::U512;

use common::{account, contract, session, start_time, DepositCall, MockChain};
use loanyelo::client::binder::ContractBinder;
use loanyelo::client::chain::{ChainRegistry, KOPLI, SEPOLIA};
use loanyelo::client::clock::FixedClock;
use loanyelo::client::config::default_tokens;
use loanyelo::client::error::{ClientError, InputError};
use loanyelo::client::notice::{Level, Notices};
use loanyelo::client::state::{Reading, TxState};
use loanyelo::client::vault_flow::VaultWorkflow;
use loanyelo::client::wallet::Session;

const IVAN: u8 = 1;
const CONTASTINE: u8 = 2;

struct Fixture {
    chain: MockChain,
    clock: Rc<FixedClock>,
    notices: Notices,
    flow: VaultWorkflow<MockChain>,
    user: Session,
}

fn fixture() -> Fixture {
    let chain = MockChain::new();
    chain.ledger.now_secs.set(start_time().timestamp() as u64);
    let clock = Rc::new(FixedClock::new(start_time()));
    let notices = Notices::new();
    let flow = VaultWorkflow::new(
        ContractBinder::new(Rc::new(chain.clone())),
        contract(0x10),
        SEPOLIA,
        default_tokens(contract(IVAN), contract(CONTASTINE)),
        clock.clone(),
        notices.clone(),
    );
    Fixture {
        chain,
        clock,
        notices,
        flow,
        user: session(account(1), SEPOLIA),
    }
}

fn wei(raw: &str) -> U512 {
    U512::from_dec_str(raw).unwrap()
}

// ==========================================
// Validation
// ==========================================

#[test]
fn test_deposit_passes_exact_value_and_duration() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(2);

    f.flow.deposit(&f.user, "Ivan", "1.5", end).unwrap();

    assert_eq!(
        f.chain.ledger.deposits.borrow().as_slice(),
        &[DepositCall {
            signer: account(1),
            token: contract(IVAN),
            duration_secs: 7_200,
            value: wei("1500000000000000000"),
        }]
    );
}

#[test]
fn test_duration_and_amount_for_many_inputs() {
    let cases = [
        ("0.000000000000000001", Duration::seconds(1), "1", 1u64),
        ("42", Duration::days(30), "42000000000000000000", 2_592_000),
        ("0.1", Duration::milliseconds(1_500), "100000000000000000", 1),
        ("3.141592653589793238", Duration::minutes(5), "3141592653589793238", 300),
    ];

    for (amount, ahead, expected_wei, expected_secs) in cases {
        let f = fixture();
        let request = f
            .flow
            .prepare_deposit("Contastine", amount, start_time() + ahead)
            .unwrap();

        assert_eq!(request.value, wei(expected_wei), "amount {}", amount);
        assert_eq!(request.duration_secs, expected_secs, "amount {}", amount);
        assert_eq!(request.token, contract(CONTASTINE));
    }
}

#[test]
fn test_end_date_not_in_future_is_rejected_without_call() {
    for end in [start_time(), start_time() - Duration::seconds(1), start_time() + Duration::milliseconds(999)] {
        let mut f = fixture();

        let result = f.flow.deposit(&f.user, "Ivan", "1", end);

        assert_eq!(result, Err(ClientError::InvalidInput(InputError::EndDate)));
        assert!(f.chain.ledger.deposits.borrow().is_empty());
        assert_eq!(f.chain.ledger.pending_count(), 0);
        assert_eq!(f.flow.state(), TxState::Idle);
        assert_eq!(f.flow.history(), &[TxState::Idle]);
        assert!(f.notices.contains(Level::Error, "End date must be in the future."));
    }
}

#[test]
fn test_unknown_token_is_rejected() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);

    let result = f.flow.deposit(&f.user, "Dogecoin", "1", end);

    assert!(matches!(
        result,
        Err(ClientError::InvalidInput(InputError::UnknownToken(_)))
    ));
    assert!(f.notices.contains(Level::Error, "Please select a token."));
    assert!(f.chain.ledger.deposits.borrow().is_empty());
}

#[test]
fn test_invalid_amount_is_rejected() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);

    for amount in ["0", "-1", "one", ""] {
        let result = f.flow.deposit(&f.user, "Ivan", amount, end);
        assert!(matches!(
            result,
            Err(ClientError::InvalidInput(InputError::Amount(_)))
        ));
    }
    assert!(f.chain.ledger.deposits.borrow().is_empty());
}

#[test]
fn test_deposit_requires_connected_wallet_on_vault_network() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);
    let disconnected = Session {
        active_account: None,
        active_network: SEPOLIA,
    };

    assert_eq!(
        f.flow.deposit(&disconnected, "Ivan", "1", end),
        Err(ClientError::PreconditionFailed("wallet not connected"))
    );
    assert!(matches!(
        f.flow.deposit(&session(account(1), KOPLI), "Ivan", "1", end),
        Err(ClientError::PreconditionFailed(_))
    ));
    assert!(f.chain.ledger.deposits.borrow().is_empty());
    assert_eq!(f.flow.state(), TxState::Idle);
}

// ==========================================
// State machine
// ==========================================

#[test]
fn test_intermediate_states_are_observable() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(2);

    let hash = f.flow.submit_deposit(&f.user, "Ivan", "1.5", end).unwrap();

    assert_eq!(f.flow.state(), TxState::AwaitingConfirmation);
    assert_eq!(f.flow.pending_tx(), Some(hash));
    assert!(!f.flow.can_deposit());
    assert_eq!(
        f.flow.history(),
        &[TxState::Idle, TxState::Submitting, TxState::AwaitingConfirmation]
    );
    assert!(f.notices.contains(Level::Info, "Initiating deposit transaction..."));
    assert!(f.notices.contains(Level::Info, "Transaction sent. Waiting for confirmation..."));

    let receipt = f.flow.confirm_deposit(&f.user).unwrap();

    assert_eq!(receipt.hash, hash);
    assert!(receipt.confirmed);
    assert_eq!(
        f.flow.history(),
        &[
            TxState::Idle,
            TxState::Submitting,
            TxState::AwaitingConfirmation,
            TxState::Confirmed,
            TxState::Idle
        ]
    );
    assert!(f.notices.contains(Level::Success, "Deposit successful!"));
}

#[test]
fn test_confirmed_deposit_refreshes_balance_and_expiry() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(2);

    f.flow.deposit(&f.user, "Ivan", "1.5", end).unwrap();

    assert_eq!(f.flow.balance(), &Reading::Fresh(wei("1500000000000000000")));
    assert_eq!(
        f.flow.expiry(),
        &Reading::Fresh(Some(Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap()))
    );
    assert_eq!(f.flow.state(), TxState::Idle);
}

#[test]
fn test_double_submit_is_refused_while_busy() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);

    f.flow.submit_deposit(&f.user, "Ivan", "1", end).unwrap();
    let second = f.flow.submit_deposit(&f.user, "Ivan", "1", end);

    assert!(matches!(second, Err(ClientError::PreconditionFailed(_))));
    assert_eq!(f.chain.ledger.deposits.borrow().len(), 1);
    assert_eq!(f.flow.state(), TxState::AwaitingConfirmation);
}

#[test]
fn test_wallet_rejection_fails_the_attempt() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);
    f.chain.ledger.reject_writes.set(true);

    let result = f.flow.deposit(&f.user, "Ivan", "1", end);

    assert_eq!(result, Err(ClientError::UserRejected));
    assert_eq!(f.flow.state(), TxState::Failed);
    assert_eq!(f.flow.pending_tx(), None);
    assert_eq!(f.flow.last_error(), Some(&ClientError::UserRejected));

    // Failed is terminal for the attempt, not for the workflow
    f.chain.ledger.reject_writes.set(false);
    assert!(f.flow.can_deposit());
    f.flow.deposit(&f.user, "Ivan", "1", end).unwrap();
    assert_eq!(f.flow.state(), TxState::Idle);
}

#[test]
fn test_revert_on_confirmation_fails_without_retry() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);
    f.chain.ledger.revert_on_confirm.set(true);

    let result = f.flow.deposit(&f.user, "Ivan", "1", end);

    assert!(matches!(result, Err(ClientError::TransactionFailed(_))));
    assert_eq!(f.flow.state(), TxState::Failed);
    assert_eq!(*f.flow.history().last().unwrap(), TxState::Failed);
    assert_eq!(f.chain.ledger.deposits.borrow().len(), 1);
    assert!(f.notices.contains(Level::Error, "Deposit failed. Please try again."));
    assert_eq!(f.flow.balance(), &Reading::Unknown);
}

#[test]
fn test_confirm_without_pending_deposit() {
    let mut f = fixture();

    assert!(matches!(
        f.flow.confirm_deposit(&f.user),
        Err(ClientError::PreconditionFailed(_))
    ));
    assert_eq!(f.flow.state(), TxState::Idle);
}

#[test]
fn test_receipt_links_to_explorer() {
    let mut f = fixture();
    let registry = ChainRegistry::testnets();
    assert_eq!(f.flow.receipt_url(&registry), None);

    let receipt = f
        .flow
        .deposit(&f.user, "Ivan", "1", start_time() + Duration::hours(1))
        .unwrap();

    assert_eq!(
        f.flow.receipt_url(&registry),
        Some(format!("https://sepolia.etherscan.io/tx/{}", receipt.hash))
    );
}

// ==========================================
// Reads
// ==========================================

#[test]
fn test_failed_refresh_marks_values_stale() {
    let mut f = fixture();
    f.chain.ledger.balance.set(wei("7"));
    f.chain.ledger.expiry.set(1_767_229_200);
    f.flow.mount(&f.user).unwrap();
    assert_eq!(f.flow.balance(), &Reading::Fresh(wei("7")));

    f.chain.ledger.fail_reads.set(true);
    f.chain.ledger.balance.set(wei("9"));

    assert!(matches!(
        f.flow.refresh_balance(&f.user),
        Err(ClientError::ReadFailed(_))
    ));
    assert_eq!(f.flow.balance(), &Reading::Stale(wei("7")));
    assert!(f.flow.balance().fresh().is_none());
    assert!(f.notices.contains(Level::Error, "Failed to fetch balance. Please try again."));

    assert!(f.flow.refresh_expiry(&f.user).is_err());
    assert!(f.flow.expiry().is_stale());
    assert!(f.notices.contains(Level::Error, "Failed to fetch expiry date. Please try again."));
    assert_eq!(f.flow.state(), TxState::Idle);
}

#[test]
fn test_no_deposit_means_no_expiry() {
    let mut f = fixture();

    assert_eq!(f.flow.refresh_expiry(&f.user), Ok(None));
    assert_eq!(f.flow.expiry(), &Reading::Fresh(None));
}

#[test]
fn test_account_change_rebinds_the_vault() {
    let mut f = fixture();
    f.flow.refresh_balance(&f.user).unwrap();
    f.flow.refresh_balance(&f.user).unwrap();
    assert_eq!(f.chain.ledger.bind_count("vault"), 1);

    let other = session(account(2), SEPOLIA);
    f.flow
        .deposit(&other, "Ivan", "1", start_time() + Duration::hours(1))
        .unwrap();

    assert_eq!(f.chain.ledger.bind_count("vault"), 2);
    let binds = f.chain.ledger.binds.borrow();
    assert_eq!(binds[1].2.account, account(2));
    assert_eq!(f.chain.ledger.deposits.borrow()[0].signer, account(2));
}

#[test]
fn test_clock_drives_duration() {
    let mut f = fixture();
    let end = start_time() + Duration::hours(1);
    f.clock.advance(Duration::minutes(30));

    f.flow.deposit(&f.user, "Ivan", "1", end).unwrap();

    assert_eq!(f.chain.ledger.deposits.borrow()[0].duration_secs, 1_800);
}
