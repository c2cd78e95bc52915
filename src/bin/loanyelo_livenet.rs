//! Livenet deploy and demo binary for the Loanyelo vault and loan manager.
//!
//! Both "networks" of the dApp are served by the same Casper node here; the
//! wallet still negotiates between the vault and loan chain ids.
//!
//! Run with:
//! - Deploy only:       LOANYELO_LIVENET_MODE=deploy cargo run --bin loanyelo_livenet --features=livenet
//! - Deploy + demo:     LOANYELO_LIVENET_MODE=deploy_and_demo cargo run --bin loanyelo_livenet --features=livenet
//! - Demo on existing:  LOANYELO_LIVENET_MODE=demo LOANYELO_VAULT_CONTRACT=... LOANYELO_LOAN_CONTRACT=... LOANYELO_TOKENS=... cargo run ...
//!
//! Required environment variables (Odra livenet):
//! - ODRA_CASPER_LIVENET_SECRET_KEY_PATH
//! - ODRA_CASPER_LIVENET_NODE_ADDRESS
//! - ODRA_CASPER_LIVENET_EVENTS_URL
//! - ODRA_CASPER_LIVENET_CHAIN_NAME
//!
//! Optional:
//! - ODRA_CASPER_LIVENET_DEPLOY_GAS          (motes)
//! - ODRA_CASPER_LIVENET_CALL_GAS            (motes)
//! - LOANYELO_DEMO_DEPOSIT                   (default: 0.00000001, 18 decimals)
//! - LOANYELO_DEMO_LOCK_SECS                 (default: 3600)
//! - LOANYELO_DEMO_LOAN_SECS                 (default: 3600)

use std::rc::Rc;

use odra::casper_types::U256;
use odra::host::{Deployer, HostEnv, HostRef, NoArgs};
use odra::prelude::*;

use loanyelo::client::address::format_address;
use loanyelo::client::binder::ContractBinder;
use loanyelo::client::clock::SystemClock;
use loanyelo::client::config::{default_tokens, read_u64_env, Config};
use loanyelo::client::host::{HostChain, HostWallet};
use loanyelo::client::units::{format_ether, parse_token_amount};
use loanyelo::client::{
    Dapp, LoanWorkflow, Notices, Panel, VaultWorkflow, KOPLI, SEPOLIA,
};
use loanyelo::loan_manager::{LoanManager, LoanManagerHostRef};
use loanyelo::tokens::{LoanToken, LoanTokenHostRef, LoanTokenInitArgs};
use loanyelo::vault::{Vault, VaultInitArgs};

const MOTES_PER_CSPR: u64 = 1_000_000_000;

const DEFAULT_DEPLOY_GAS_MOTES: u64 = 450_000_000_000; // 450 CSPR
const DEFAULT_CALL_GAS_MOTES: u64 = 50_000_000_000; // 50 CSPR
const DEFAULT_DEMO_DEPOSIT: &str = "0.00000001";

fn main() {
    println!("============================================");
    println!("  Loanyelo Vault & Loans - Livenet");
    println!("============================================\n");

    let env = odra_casper_livenet_env::env();

    let mode = std::env::var("LOANYELO_LIVENET_MODE").unwrap_or_else(|_| "deploy".to_string());
    let should_deploy = mode == "deploy" || mode == "deploy_and_demo";
    let should_demo = mode == "demo" || mode == "deploy_and_demo";

    let deploy_gas = read_u64_env("ODRA_CASPER_LIVENET_DEPLOY_GAS", DEFAULT_DEPLOY_GAS_MOTES);
    let call_gas = read_u64_env("ODRA_CASPER_LIVENET_CALL_GAS", DEFAULT_CALL_GAS_MOTES);
    let deposit = std::env::var("LOANYELO_DEMO_DEPOSIT")
        .unwrap_or_else(|_| DEFAULT_DEMO_DEPOSIT.to_string());
    let lock_secs = read_u64_env("LOANYELO_DEMO_LOCK_SECS", 3_600);
    let loan_secs = read_u64_env("LOANYELO_DEMO_LOAN_SECS", 3_600);

    println!("[INFO] Mode: {}", mode);
    println!("[INFO] Caller: {:?}", env.caller());
    println!(
        "[INFO] Gas (motes): deploy={} ({} CSPR), calls={} ({} CSPR)",
        deploy_gas,
        deploy_gas / MOTES_PER_CSPR,
        call_gas,
        call_gas / MOTES_PER_CSPR
    );
    println!(
        "[INFO] Demo params: deposit={}, lock={}s, loan={}s",
        deposit, lock_secs, loan_secs
    );
    println!();

    let config = if should_deploy {
        deploy(&env, deploy_gas)
    } else {
        println!("[STEP 1] Loading existing contracts from the environment...");
        match Config::from_env() {
            Ok(config) => config,
            Err(err) => panic!("[FATAL] {}", err),
        }
    };
    println!("[OK] Vault:        {}", format_address(&config.vault_contract));
    println!("[OK] LoanManager:  {}", format_address(&config.loan_contract));
    for token in &config.tokens {
        println!(
            "[OK] Token {:<10} {} ({} bps)",
            token.name,
            format_address(&token.address),
            token.interest_rate_bps
        );
    }
    println!();

    if should_demo {
        demo(&env, &config, call_gas, &deposit, lock_secs, loan_secs);
    }

    output_deploy_json(&config);
}

/// Deploys two loan tokens, the vault accepting them and the loan manager.
fn deploy(env: &HostEnv, deploy_gas: u64) -> Config {
    println!("[STEP 1] Deploying loan tokens...");
    env.set_gas(deploy_gas);
    let ivan = LoanToken::deploy(
        env,
        LoanTokenInitArgs {
            name: "Ivan".to_string(),
            symbol: "IVAN".to_string(),
        },
    );
    env.set_gas(deploy_gas);
    let contastine = LoanToken::deploy(
        env,
        LoanTokenInitArgs {
            name: "Contastine".to_string(),
            symbol: "CSTN".to_string(),
        },
    );
    println!("[OK] Ivan: {:?}", ivan.address());
    println!("[OK] Contastine: {:?}", contastine.address());
    println!();

    println!("[STEP 2] Deploying Vault...");
    env.set_gas(deploy_gas);
    let vault = Vault::deploy(
        env,
        VaultInitArgs {
            tokens: vec![ivan.address(), contastine.address()],
        },
    );
    println!("[OK] Vault deployed at: {:?}", vault.address());
    println!();

    println!("[STEP 3] Deploying LoanManager...");
    env.set_gas(deploy_gas);
    let loans = LoanManager::deploy(env, NoArgs);
    println!("[OK] LoanManager deployed at: {:?}", loans.address());
    println!("     Owner: {:?}", loans.owner());
    println!();

    Config {
        vault_contract: vault.address(),
        loan_contract: loans.address(),
        tokens: default_tokens(ivan.address(), contastine.address()),
        vault_chain: SEPOLIA,
        loan_chain: KOPLI,
        sepolia_rpc: None,
        kopli_rpc: None,
    }
}

/// Deposit through the vault panel, then approve and repay a loan through
/// the loans panel.
fn demo(
    env: &HostEnv,
    config: &Config,
    call_gas: u64,
    deposit: &str,
    lock_secs: u64,
    loan_secs: u64,
) {
    let caller = env.caller();
    let Some(token) = config.tokens.first().cloned() else {
        panic!("[FATAL] no loan token configured");
    };
    let principal = match parse_token_amount(deposit) {
        Ok(value) => value,
        Err(err) => panic!("[FATAL] LOANYELO_DEMO_DEPOSIT: {}", err),
    };
    let Some(minted) = principal.checked_mul(U256::from(2u64)) else {
        panic!("[FATAL] LOANYELO_DEMO_DEPOSIT is too large: {}", deposit);
    };

    println!("[DEMO 1] Opening a loan of {} for the caller...", format_ether(principal));
    env.set_gas(call_gas);
    let mut manager = LoanManagerHostRef::new(config.loan_contract, env.clone());
    if manager.user_details(caller).is_active {
        println!("[SKIP] Caller already has an active loan.");
    } else {
        manager.open_loan(caller, token.address, principal, token.interest_rate_bps, loan_secs);
        println!("[OK] Loan opened.");
    }
    env.set_gas(call_gas);
    let mut faucet = LoanTokenHostRef::new(token.address, env.clone());
    faucet.faucet_mint(caller, minted);
    println!("[OK] Minted {} {} for interest.", format_ether(minted), token.name);
    println!();

    let registry = match config.registry() {
        Ok(registry) => Rc::new(registry),
        Err(err) => panic!("[FATAL] {}", err),
    };
    let wallet = Rc::new(HostWallet::new(config.vault_chain, env.clone()));
    wallet.register(config.loan_chain, env.clone());
    let vault_chain = Rc::new(HostChain::new(config.vault_chain, env.clone()).with_gas(call_gas));
    let loan_chain = Rc::new(HostChain::new(config.loan_chain, env.clone()).with_gas(call_gas));

    let notices = Notices::new();
    let clock = Rc::new(SystemClock);
    let vault = VaultWorkflow::new(
        ContractBinder::new(vault_chain),
        config.vault_contract,
        config.vault_chain,
        config.tokens.clone(),
        clock.clone(),
        notices.clone(),
    );
    let loans = LoanWorkflow::new(
        ContractBinder::new(loan_chain),
        config.loan_contract,
        config.loan_chain,
        clock,
        notices.clone(),
    );
    let mut dapp = Dapp::new(Some(wallet), Rc::clone(&registry), vault, loans, notices.clone());

    println!("[DEMO 2] Depositing {} against {} for {}s...", deposit, token.name, lock_secs);
    if !dapp.switch_to(Panel::Vault) {
        print_notices(&notices);
        panic!("[FATAL] could not reach the vault network");
    }
    let end = chrono::Utc::now() + chrono::Duration::seconds(lock_secs as i64);
    match dapp.deposit(&token.name, deposit, end) {
        Ok(receipt) => {
            println!("[OK] Deposit confirmed: {}", receipt.hash);
            if let Some(url) = dapp.vault().receipt_url(&registry) {
                println!("     {}", url);
            }
        }
        Err(err) => println!("[WARN] Deposit failed: {}", err),
    }
    println!("     balance: {:?}", dapp.vault().balance().last_known().map(format_ether));
    println!("     expiry:  {:?}", dapp.vault().expiry().last_known());
    println!();

    println!("[DEMO 3] Switching to the loans panel...");
    if !dapp.switch_to(Panel::Loans) {
        print_notices(&notices);
        panic!("[FATAL] could not reach the loan network");
    }
    if let Some(pending) = dapp.loans().pending_amount().fresh() {
        println!("[OK] Repay amount: {}", format_ether(pending.amount));
    }
    println!("     allowance sufficient: {}", dapp.loans().allowance_sufficient());
    println!();

    if dapp.loans().can_approve() {
        println!("[DEMO 4] Approving the repay amount...");
        match dapp.approve() {
            Ok(receipt) => println!("[OK] Approval confirmed: {}", receipt.hash),
            Err(err) => println!("[WARN] Approval failed: {}", err),
        }
        println!();
    }

    println!("[DEMO 5] Repaying...");
    match dapp.repay() {
        Ok(receipt) => println!("[OK] Repayment confirmed: {}", receipt.hash),
        Err(err) => println!("[WARN] Repayment failed: {}", err),
    }
    let active = dapp
        .loans()
        .record()
        .last_known()
        .and_then(|r| r.as_ref())
        .map(|r| r.active);
    println!("     loan active: {:?}", active);
    println!("     total repaid: {}", format_ether(manager.total_repaid()));
    println!();

    print_notices(&notices);
}

fn print_notices(notices: &Notices) {
    for notice in notices.drain() {
        println!("     [{:?}] {}", notice.level, notice.message);
    }
}

fn output_deploy_json(config: &Config) {
    let chain_name = std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME")
        .unwrap_or_else(|_| "casper-test".to_string());
    let node_url = std::env::var("ODRA_CASPER_LIVENET_NODE_ADDRESS")
        .unwrap_or_else(|_| "https://node.testnet.casper.network".to_string());

    let tokens: Vec<String> = config
        .tokens
        .iter()
        .map(|t| format!("{}:{}:{}", t.name, t.interest_rate_bps, format_address(&t.address)))
        .collect();

    println!(
        r#"LOANYELO_DEPLOY_JSON={{"chain_name":"{}","node_url":"{}","vault_contract":"{}","loan_contract":"{}","tokens":"{}","deployed_at":"{}"}}"#,
        chain_name,
        node_url,
        format_address(&config.vault_contract),
        format_address(&config.loan_contract),
        tokens.join(","),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
}
