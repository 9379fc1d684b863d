//! Contract address extraction from free-form text

use regex::Regex;

const EVM_PATTERN: &str = r"0x[a-fA-F0-9]{40}";
const SOLANA_PATTERN: &str = r"[1-9A-HJ-NP-Za-km-z]{32,44}";

/// Finds candidate contract addresses in message text.
pub struct AddressExtractor {
    evm: Regex,
    solana: Regex,
}

impl AddressExtractor {
    pub fn new() -> Self {
        Self {
            // Hard-coded patterns, compile cannot fail
            evm: Regex::new(EVM_PATTERN).expect("valid EVM address pattern"),
            solana: Regex::new(SOLANA_PATTERN).expect("valid Solana address pattern"),
        }
    }

    /// All EVM addresses in the text, deduplicated preserving
    /// first-seen order.
    pub fn evm_addresses(&self, text: &str) -> Vec<String> {
        dedup_preserving_order(self.evm.find_iter(text).map(|m| m.as_str().to_string()))
    }

    /// All Solana addresses in the text: base58 matches that decode to
    /// exactly 32 bytes, deduplicated preserving first-seen order.
    pub fn solana_addresses(&self, text: &str) -> Vec<String> {
        dedup_preserving_order(
            self.solana
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .filter(|candidate| is_solana_address(candidate)),
        )
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the string is a well-formed Solana public key.
pub fn is_solana_address(candidate: &str) -> bool {
    bs58::decode(candidate)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

fn dedup_preserving_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}
