use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::error::{Result, WalletError};

/// Exponent of the native token (1 SOL = 10^9 lamports).
pub const NATIVE_DECIMALS: u32 = 9;

/// Convert a Decimal to a scaled u64 value.
///
/// # Errors
///
/// Returns `WalletError::Overflow` if the scaled value does not fit in a `u64`.
pub fn to_scaled_u64(x: Decimal, decimals: u32) -> Result<u64> {
    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| WalletError::Overflow(format!("to_scaled_u64: 10^{decimals}")))?;
    let scaled = x
        .checked_mul(scale)
        .ok_or_else(|| WalletError::Overflow(format!("to_scaled_u64: {x} * 10^{decimals}")))?;
    scaled
        .to_u64()
        .ok_or_else(|| WalletError::Overflow(format!("to_scaled_u64: {x} * 10^{decimals}")))
}

/// Convert a user-facing amount to the chain's smallest unit, refusing to
/// silently drop precision the asset cannot represent.
///
/// # Errors
///
/// Returns `WalletError::InvalidAmount` if `x` has more fractional digits than
/// `decimals`, or `WalletError::Overflow` if it does not fit in a `u64`.
pub fn to_base_units(x: Decimal, decimals: u32) -> Result<u64> {
    if x.normalize().scale() > decimals {
        return Err(WalletError::InvalidAmount(format!(
            "{x} has more than {decimals} decimal places"
        )));
    }
    to_scaled_u64(x, decimals)
}

/// Convert a raw smallest-unit amount back to a decimal value.
///
/// # Errors
///
/// Returns `WalletError::Overflow` when `decimals` exceeds the 28 digits a
/// `Decimal` can carry.
pub fn from_base_units(raw: u64, decimals: u32) -> Result<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(raw), decimals)
        .map(|d| d.normalize())
        .map_err(|e| WalletError::Overflow(format!("{raw} at {decimals} decimals: {e}")))
}

/// Parse a user-entered amount. Must be a finite, strictly positive decimal.
pub fn parse_amount(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidAmount("amount is required".into()));
    }
    let amount = Decimal::from_str(trimmed)
        .map_err(|e| WalletError::InvalidAmount(format!("{trimmed:?}: {e}")))?;
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "{trimmed} must be greater than zero"
        )));
    }
    Ok(amount)
}

/// Parse and validate a base58 account address.
///
/// # Errors
///
/// Returns `WalletError::InvalidAddress` for empty input, invalid base58, or
/// a decoded length other than 32 bytes.
pub fn parse_address(value: &str) -> Result<Pubkey> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidAddress("recipient address is required".into()));
    }
    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| WalletError::InvalidAddress(format!("{trimmed}: {e}")))?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        WalletError::InvalidAddress(format!("{trimmed}: expected 32 bytes, got {}", b.len()))
    })?;
    Ok(Pubkey::new_from_array(bytes))
}

/// Shorten an address for display: `abcd...wxyz`.
pub fn shorten_address(address: &str) -> String {
    if address.chars().count() <= 8 {
        return address.to_string();
    }
    let head: String = address.chars().take(4).collect();
    let tail: String = address
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}...{tail}")
}
