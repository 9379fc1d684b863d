//! Alert message composition
//!
//! Builds the HTML caption for a token alert: header, quick-link row,
//! top-holder tree, and basic security checks. Every section degrades
//! gracefully when its data is missing.

use crate::providers::RawTokenData;
use crate::types::{Chain, SecurityFlags, TokenHolder};

/// Everything the formatter needs, gathered once from the aggregator.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub address: String,
    pub chain: Chain,
    pub symbol: Option<String>,
    pub market_cap: Option<f64>,
    pub liquidity: Option<f64>,
    pub logo_url: Option<String>,
    pub holders: Vec<TokenHolder>,
    pub security: Option<SecurityFlags>,
}

impl AlertContext {
    /// Gather the context out of aggregated provider data.
    pub async fn build(raw: &RawTokenData) -> Self {
        let created_by = raw.created_by().await.map(|a| a.to_lowercase());
        let mut holders = raw.top_holders().await.unwrap_or_default();
        for holder in &mut holders {
            if let Some(creator) = created_by.as_deref() {
                if holder.address.to_lowercase() == creator {
                    holder.is_creator = true;
                }
            }
        }

        Self {
            address: raw.address().to_string(),
            chain: raw.chain(),
            symbol: raw.symbol().await,
            market_cap: raw.market_cap().await,
            liquidity: raw.liquidity().await,
            logo_url: raw.logo_url().await,
            holders,
            security: raw.security().await,
        }
    }
}

/// Renders an [`AlertContext`] into Telegram HTML.
pub struct AlertFormatter<'a> {
    ctx: &'a AlertContext,
}

impl<'a> AlertFormatter<'a> {
    pub fn new(ctx: &'a AlertContext) -> Self {
        Self { ctx }
    }

    /// The full alert caption.
    pub fn caption(&self) -> String {
        let mut sections = vec![self.header(), format!("<code>{}</code>", self.ctx.address), self.links_row()];
        if let Some(holders) = self.holders_section() {
            sections.push(holders);
        }
        if let Some(checks) = self.checks_section() {
            sections.push(checks);
        }
        sections.join("\n\n")
    }

    /// `$SYMBOL: $1.2M 🚨`
    fn header(&self) -> String {
        let symbol = match &self.ctx.symbol {
            Some(symbol) => normalize_symbol(symbol),
            None => shorten_address(&self.ctx.address),
        };
        let mcap = self
            .ctx
            .market_cap
            .map(format_compact_usd)
            .unwrap_or_else(|| "N/A".to_string());
        format!("<b>${}: {} 🚨</b>", symbol, mcap)
    }

    /// `PH · BD · GM · EX` quick links.
    fn links_row(&self) -> String {
        let address = &self.ctx.address;
        let slug = self.ctx.chain.slug();
        [
            link("PH", &format!("https://photon.tinyastro.io/en/lp/{}", address)),
            link("BD", &format!("https://birdeye.so/token/{}?chain={}", address, slug)),
            link("GM", &format!("https://gmgn.ai/{}/token/{}", slug, address)),
            link("EX", &format!("{}/token/{}", self.ctx.chain.explorer_url(), address)),
        ]
        .join(" · ")
    }

    fn holders_section(&self) -> Option<String> {
        if self.ctx.holders.is_empty() {
            return None;
        }
        let lines = self
            .ctx
            .holders
            .iter()
            .map(|holder| {
                format!(
                    "{} {} ({})",
                    holder_emoji(holder),
                    shorten_address(&holder.address),
                    format_percentage(holder.percentage)
                )
            })
            .collect::<Vec<_>>();
        Some(format!("👑 <b>Top Holders:</b>\n{}", tree_list(&lines)))
    }

    fn checks_section(&self) -> Option<String> {
        let security = self.ctx.security?;
        let mut lines = Vec::new();
        if let Some(renounced) = security.renounced {
            lines.push(format!("Renounced: {}", check_mark(renounced)));
        }
        if let Some(lp_burned) = security.lp_burned {
            lines.push(format!("LP Burned: {}", check_mark(lp_burned)));
        }
        if let Some(honeypot) = security.honeypot {
            // A honeypot is the bad case
            lines.push(format!("Honeypot: {}", check_mark(!honeypot)));
        }
        if lines.is_empty() {
            return None;
        }
        Some(format!("🔒 <b>Basic Checks:</b>\n{}", tree_list(&lines)))
    }
}

fn holder_emoji(holder: &TokenHolder) -> &'static str {
    if holder.is_creator {
        "🧑‍💻"
    } else if holder.is_pool {
        "💧"
    } else if holder.percentage >= 0.02 {
        "🐳"
    } else {
        "🦐"
    }
}

fn check_mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

fn link(label: &str, url: &str) -> String {
    format!("<a href=\"{}\">{}</a>", url, label)
}

/// `├` for every line but the last, `└` for the last.
pub fn tree_list(lines: &[String]) -> String {
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let branch = if i == last { "└" } else { "├" };
            format!("{} {}", branch, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Uppercased symbol without a leading `$`.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().trim_start_matches('$').to_uppercase()
}

/// `0x1234…5678`
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

/// `$1.2M` style compact USD amounts.
pub fn format_compact_usd(value: f64) -> String {
    let (scaled, suffix) = if value >= 1e12 {
        (value / 1e12, "T")
    } else if value >= 1e9 {
        (value / 1e9, "B")
    } else if value >= 1e6 {
        (value / 1e6, "M")
    } else if value >= 1e3 {
        (value / 1e3, "K")
    } else {
        return format!("${:.2}", value);
    };
    format!("${:.1}{}", scaled, suffix)
}

/// `12.3%` from a 0.0..=1.0 share.
pub fn format_percentage(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}
