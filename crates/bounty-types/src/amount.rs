//! Value units moved between accounts

use serde::{Deserialize, Serialize};

/// Denominator of basis-point rates.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A non-negative quantity of the marketplace's value unit
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Fee owed at `rate_bps` basis points, rounded down.
    pub fn fee_at(self, rate_bps: u32) -> Self {
        let fee = u128::from(self.0) * u128::from(rate_bps) / u128::from(BPS_DENOMINATOR);
        // rate_bps <= 10_000 keeps the fee within the amount; clamp anyway
        Self(u64::try_from(fee).unwrap_or(self.0).min(self.0))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::zero(), Amount::saturating_add)
    }
}
