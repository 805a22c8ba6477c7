use bounty_types::{BlockHeight, LogicalClock, MarketError, MarketResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Logical clock advanced explicitly by the host (or a test)
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(start: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(start.0),
        }
    }

    /// Move the clock forward by `blocks`
    pub fn advance(&self, blocks: u64) -> BlockHeight {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        let now = BlockHeight::new(previous.saturating_add(blocks));
        debug!(height = now.0, "Logical clock advanced");
        now
    }

    /// Jump to `height`; the clock never moves backwards
    pub fn set(&self, height: BlockHeight) -> MarketResult<()> {
        let current = self.height.load(Ordering::SeqCst);
        if height.0 < current {
            return Err(MarketError::InvalidParams(format!(
                "clock cannot move back from {} to {}",
                BlockHeight::new(current),
                height
            )));
        }
        self.height.store(height.0, Ordering::SeqCst);
        Ok(())
    }
}

impl LogicalClock for ManualClock {
    fn now(&self) -> BlockHeight {
        BlockHeight::new(self.height.load(Ordering::SeqCst))
    }
}
