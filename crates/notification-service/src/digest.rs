use briefing_core::Asset;
use chrono::{DateTime, Utc};

/// Analysis text for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSummary {
    pub asset: Asset,
    pub summary: String,
}

impl AssetSummary {
    pub fn new(asset: Asset, summary: impl Into<String>) -> Self {
        Self {
            asset,
            summary: summary.into(),
        }
    }
}

/// A composed briefing ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
}

impl Digest {
    pub fn new(summaries: &[AssetSummary], at: DateTime<Utc>) -> Self {
        Self {
            subject: subject_for(at),
            body: compose(summaries),
        }
    }
}

pub fn subject_for(at: DateTime<Utc>) -> String {
    format!("Crypto Update - {}", at.format("%Y-%m-%d"))
}

/// One block per asset, in the order given, separated by a blank line.
pub fn compose(summaries: &[AssetSummary]) -> String {
    summaries
        .iter()
        .map(|s| {
            format!(
                "**{} ({}) Summary:**\n{}",
                s.asset.name(),
                s.asset.symbol(),
                s.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_compose_two_assets() {
        let body = compose(&[
            AssetSummary::new(Asset::Btc, "BTC is up."),
            AssetSummary::new(Asset::Eth, "ETH is flat."),
        ]);
        assert_eq!(
            body,
            "**Bitcoin (BTC) Summary:**\nBTC is up.\n\n**Ethereum (ETH) Summary:**\nETH is flat."
        );
    }

    #[test]
    fn test_compose_keeps_given_order() {
        let body = compose(&[
            AssetSummary::new(Asset::Eth, "e"),
            AssetSummary::new(Asset::Btc, "b"),
        ]);
        assert!(body.starts_with("**Ethereum (ETH) Summary:**"));
        assert!(compose(&[]).is_empty());
    }

    #[test]
    fn test_subject_uses_utc_date() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 0).unwrap();
        assert_eq!(subject_for(at), "Crypto Update - 2026-10-16");
        assert_eq!(Digest::new(&[], at).subject, "Crypto Update - 2026-10-16");
    }
}
