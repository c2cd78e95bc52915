//! Textual address handling for config, explorer links and logs.

use odra::casper_types::account::AccountHash;
use odra::casper_types::contracts::ContractPackageHash;
use odra::prelude::Address;

use super::error::InputError;

/// Parses `account-hash-<hex>`, `hash-<hex>`, `contract-package-<hex>`,
/// `package-<hex>` or a bare 64-hex contract package hash.
pub fn parse_address(raw: &str) -> Result<Address, InputError> {
    let trimmed = raw.trim();
    let invalid = || InputError::Address(trimmed.to_string());

    if let Some(hex) = trimmed.strip_prefix("account-hash-") {
        let bytes = decode_hex_32(hex).ok_or_else(invalid)?;
        return Ok(Address::Account(AccountHash::new(bytes)));
    }
    let package_hex = trimmed
        .strip_prefix("contract-package-")
        .or_else(|| trimmed.strip_prefix("package-"))
        .or_else(|| trimmed.strip_prefix("hash-"))
        .unwrap_or(trimmed);
    let bytes = decode_hex_32(package_hex).ok_or_else(invalid)?;
    Ok(Address::Contract(ContractPackageHash::new(bytes)))
}

/// Lowercase hex of the 32-byte hash behind an address.
pub fn address_hex(address: &Address) -> String {
    if let Address::Account(hash) = address {
        return to_hex(&hash.value());
    }
    match address.as_contract_package_hash() {
        Some(hash) => to_hex(&hash.value()),
        None => format!("{:?}", address),
    }
}

/// Prefixed form accepted back by [`parse_address`].
pub fn format_address(address: &Address) -> String {
    match address {
        Address::Account(_) => format!("account-hash-{}", address_hex(address)),
        _ => format!("hash-{}", address_hex(address)),
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex_32(s: &str) -> Option<[u8; 32]> {
    if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}
