//! Application state for shared services

use std::sync::Arc;

use crate::domain::ledger::LedgerStore;
use crate::domain::pix::PixCodeEncoder;
use crate::infrastructure::recharge::RechargeServiceTrait;
use crate::infrastructure::usage::UsageMeteringServiceTrait;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub metering: Arc<dyn UsageMeteringServiceTrait>,
    pub recharges: Arc<dyn RechargeServiceTrait>,
    /// Unset when no payee key is configured
    pub pix_encoder: Option<Arc<PixCodeEncoder>>,
    /// Admin routes answer 401 while this is unset
    pub admin_api_key: Option<String>,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        metering: Arc<dyn UsageMeteringServiceTrait>,
        recharges: Arc<dyn RechargeServiceTrait>,
    ) -> Self {
        Self {
            ledger,
            metering,
            recharges,
            pix_encoder: None,
            admin_api_key: None,
        }
    }

    pub fn with_pix_encoder(mut self, encoder: PixCodeEncoder) -> Self {
        self.pix_encoder = Some(Arc::new(encoder));
        self
    }

    pub fn with_admin_api_key(mut self, key: impl Into<String>) -> Self {
        self.admin_api_key = Some(key.into()).filter(|k: &String| !k.is_empty());
        self
    }
}
