//! Core domain types shared across the bot

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// EVM chains the bot knows about. Variants carry their canonical
/// numeric chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Optimism,
    Bsc,
    Polygon,
    ZkSync,
    Base,
    Arbitrum,
    Avalanche,
}

impl Chain {
    /// Numeric chain id (EIP-155).
    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Bsc => 56,
            Chain::Polygon => 137,
            Chain::ZkSync => 324,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
            Chain::Avalanche => 43114,
        }
    }

    /// Lowercase chain slug used by provider APIs.
    pub fn slug(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Optimism => "optimism",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::ZkSync => "zksync",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Avalanche => "avalanche",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Chain::Ethereum),
            10 => Some(Chain::Optimism),
            56 => Some(Chain::Bsc),
            137 => Some(Chain::Polygon),
            324 => Some(Chain::ZkSync),
            8453 => Some(Chain::Base),
            42161 => Some(Chain::Arbitrum),
            43114 => Some(Chain::Avalanche),
            _ => None,
        }
    }

    /// Parse a decimal chain id string ("56" -> Bsc).
    pub fn from_id_str(id: &str) -> Option<Self> {
        id.parse::<u64>().ok().and_then(Self::from_id)
    }

    /// Block explorer base URL for address pages.
    pub fn explorer_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://etherscan.io",
            Chain::Optimism => "https://optimistic.etherscan.io",
            Chain::Bsc => "https://bscscan.com",
            Chain::Polygon => "https://polygonscan.com",
            Chain::ZkSync => "https://explorer.zksync.io",
            Chain::Base => "https://basescan.org",
            Chain::Arbitrum => "https://arbiscan.io",
            Chain::Avalanche => "https://snowtrace.io",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// A token as seen on an exchange pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeToken {
    /// Contract address (0x-prefixed, lowercase)
    pub address: String,
    /// Token symbol
    pub symbol: String,
    /// ERC-20 decimals
    pub decimals: u8,
    /// Chain the token lives on
    pub chain: Chain,
}

/// A decoded swap, normalized to input/output sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    /// Address that initiated the swap
    pub sender: String,
    /// Address that received the output
    pub recipient: String,
    /// Token paid into the pair
    pub token_in: ExchangeToken,
    /// Token paid out of the pair
    pub token_out: ExchangeToken,
    /// Absolute input amount in base units
    pub amount_in: U256,
    /// Absolute output amount in base units
    pub amount_out: U256,
    /// Pair contract that emitted the log
    pub pair_address: String,
    /// Transaction hash
    pub transaction_hash: String,
    /// Chain the swap happened on
    pub chain: Chain,
}

/// Peer a Telegram message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerKind {
    Channel,
    Group,
    Private,
}

/// Parsed Telegram message relevant to detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramMessageData {
    /// Message text
    pub text: String,
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Message id within the chat
    pub message_id: i64,
    /// Unix timestamp of the message
    pub timestamp: i64,
    /// Peer discrimination
    pub peer: PeerKind,
}

impl TelegramMessageData {
    pub fn is_channel(&self) -> bool {
        self.peer == PeerKind::Channel
    }
}

/// A token row from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: i64,
    pub address: String,
    pub chain: Chain,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Social links a provider may expose for a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.twitter.is_none() && self.telegram.is_none() && self.website.is_none()
    }
}

/// A single entry of a token's top-holder list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolder {
    pub address: String,
    /// Share of total supply, 0.0..=1.0
    pub percentage: f64,
    pub is_creator: bool,
    pub is_pool: bool,
}

/// Security facts derived from provider data. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFlags {
    /// Ownership renounced (owner is the zero/dead address)
    pub renounced: Option<bool>,
    /// Liquidity tokens sent to a burn address
    pub lp_burned: Option<bool>,
    /// Flagged as a honeypot
    pub honeypot: Option<bool>,
}
