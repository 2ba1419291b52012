//! Decoding of comma-delimited list arguments.
//!
//! Empty input is the empty list. Items are trimmed; an item that is empty
//! after trimming is an error.

use std::collections::BTreeSet;

use crate::types::{Amount, CoverageError, Result, WalletId};

fn split_items(raw: &str) -> Vec<&str> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::trim).collect()
}

/// Decode a wallet list into canonical identifiers.
pub fn decode_wallets(raw: &str) -> Result<Vec<WalletId>> {
    split_items(raw).into_iter().map(WalletId::parse).collect()
}

/// Decode a list of strictly positive amounts.
pub fn decode_amounts(raw: &str) -> Result<Vec<Amount>> {
    split_items(raw)
        .into_iter()
        .map(|item| {
            let amount: Amount = item
                .parse()
                .map_err(|_| CoverageError::InvalidArgument(format!("invalid amount '{}'", item)))?;
            if amount == 0 {
                return Err(CoverageError::InvalidArgument(
                    "amount must be positive".to_string(),
                ));
            }
            Ok(amount)
        })
        .collect()
}

/// Decode a free-form tag list, dropping blanks and duplicates.
pub fn decode_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
