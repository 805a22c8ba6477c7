//! Global marketplace parameters

use crate::{Amount, MarketError, MarketResult};
use serde::{Deserialize, Serialize};

/// Highest fee rate the marketplace accepts (10%).
pub const MAX_FEE_RATE_BPS: u32 = 1_000;

/// Parameters read by the core on every invocation.
///
/// Every field has a default so partial configuration files load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Fee taken on escrow release, in basis points
    pub fee_rate_bps: u32,
    /// Blocks after the deadline during which a dispute may be opened
    pub dispute_window: u64,
    /// Collateral each contributor locks per submission
    pub min_stake_amount: Amount,
    /// Smallest reward a bounty may carry
    pub min_bounty_amount: Amount,
    /// Furthest a deadline may lie from the current height
    pub max_bounty_duration: u64,
    /// Global halt flag; mutating operations reject while set
    pub paused: bool,
    /// Reputation awarded for a completed bounty
    pub award_points: u64,
    /// Reputation removed when a dispute is lost
    pub penalty_points: u64,
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_content_ref_len: usize,
    pub max_note_len: usize,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            fee_rate_bps: 250,
            dispute_window: 144,
            min_stake_amount: Amount::new(10_000),
            min_bounty_amount: Amount::new(100_000),
            max_bounty_duration: 52_560,
            paused: false,
            award_points: 10,
            penalty_points: 5,
            max_title_len: 100,
            max_description_len: 500,
            max_content_ref_len: 256,
            max_note_len: 500,
        }
    }
}

impl MarketParams {
    /// Check the parameters are internally consistent
    pub fn validate(&self) -> MarketResult<()> {
        if self.fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(MarketError::Config(format!(
                "fee_rate_bps {} exceeds maximum {}",
                self.fee_rate_bps, MAX_FEE_RATE_BPS
            )));
        }
        if self.min_stake_amount.is_zero() {
            return Err(MarketError::Config("min_stake_amount must be positive".into()));
        }
        if self.min_bounty_amount.is_zero() {
            return Err(MarketError::Config("min_bounty_amount must be positive".into()));
        }
        if self.max_bounty_duration == 0 {
            return Err(MarketError::Config("max_bounty_duration must be positive".into()));
        }
        if self.max_title_len == 0
            || self.max_description_len == 0
            || self.max_content_ref_len == 0
            || self.max_note_len == 0
        {
            return Err(MarketError::Config("length ceilings must be positive".into()));
        }
        Ok(())
    }

    pub fn with_fee_rate(mut self, fee_rate_bps: u32) -> Self {
        self.fee_rate_bps = fee_rate_bps;
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Fail with `SystemPaused` while the halt flag is set
    pub fn ensure_running(&self) -> MarketResult<()> {
        if self.paused {
            return Err(MarketError::SystemPaused);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = MarketParams::default();
        params.validate().unwrap();
        assert_eq!(params.fee_rate_bps, 250);
        assert!(!params.paused);
    }

    #[test]
    fn fee_rate_is_capped() {
        let params = MarketParams::default().with_fee_rate(1_001);
        assert!(matches!(params.validate(), Err(MarketError::Config(_))));
        MarketParams::default().with_fee_rate(1_000).validate().unwrap();
    }

    #[test]
    fn zero_length_ceilings_rejected() {
        let mut params = MarketParams::default();
        params.max_note_len = 0;
        assert!(matches!(params.validate(), Err(MarketError::Config(_))));

        let mut params = MarketParams::default();
        params.max_content_ref_len = 0;
        assert!(matches!(params.validate(), Err(MarketError::Config(_))));
    }

    #[test]
    fn paused_rejects() {
        let params = MarketParams::default().with_paused(true);
        assert_eq!(params.ensure_running(), Err(MarketError::SystemPaused));
    }

    #[test]
    fn partial_document_uses_defaults() {
        let params: MarketParams =
            serde_json::from_str(r#"{"fee_rate_bps": 100, "paused": true}"#).unwrap();
        assert_eq!(params.fee_rate_bps, 100);
        assert!(params.paused);
        assert_eq!(params.dispute_window, MarketParams::default().dispute_window);
    }
}
