use bounty_types::{AccountId, AdminAuthority, MarketError, MarketParams, MarketResult, ParameterProvider};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Admin-writable parameter storage read by the core on every invocation
pub struct ParameterStore {
    params: RwLock<MarketParams>,
    authority: Arc<dyn AdminAuthority>,
}

impl ParameterStore {
    pub fn new(params: MarketParams, authority: Arc<dyn AdminAuthority>) -> MarketResult<Self> {
        params.validate()?;
        Ok(Self {
            params: RwLock::new(params),
            authority,
        })
    }

    /// Raise or clear the global halt flag
    pub fn set_paused(&self, caller: &AccountId, paused: bool) -> MarketResult<()> {
        self.modify(caller, "pause the marketplace", |p| p.paused = paused)?;
        info!(caller = %caller, paused, "Pause flag updated");
        Ok(())
    }

    pub fn set_fee_rate(&self, caller: &AccountId, fee_rate_bps: u32) -> MarketResult<()> {
        self.modify(caller, "change the fee rate", |p| p.fee_rate_bps = fee_rate_bps)?;
        info!(caller = %caller, fee_rate_bps, "Fee rate updated");
        Ok(())
    }

    /// Swap in a whole new parameter set
    pub fn replace(&self, caller: &AccountId, params: MarketParams) -> MarketResult<()> {
        self.modify(caller, "replace parameters", |p| *p = params)?;
        info!(caller = %caller, "Parameters replaced");
        Ok(())
    }

    fn modify(
        &self,
        caller: &AccountId,
        action: &'static str,
        f: impl FnOnce(&mut MarketParams),
    ) -> MarketResult<()> {
        if !self.authority.is_admin(caller) {
            warn!(caller = %caller, action, "Parameter change rejected");
            return Err(MarketError::unauthorized(caller, action));
        }
        let mut guard = self.params.write().unwrap_or_else(|e| e.into_inner());
        let mut staged = guard.clone();
        f(&mut staged);
        staged.validate()?;
        *guard = staged;
        Ok(())
    }
}

impl ParameterProvider for ParameterStore {
    fn current(&self) -> MarketParams {
        self.params.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
