use std::sync::Arc;

use crate::config::Settings;
use crate::services::finance_service::FinanceService;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub finance: FinanceService,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn reporting_currency(&self) -> &str {
        &self.settings.reporting_currency
    }
}
