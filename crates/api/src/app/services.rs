use std::sync::Arc;

use farmlink_infra::{FulfillmentSequencer, MarketStore, StockLedger};

/// The service graph behind every handler.
///
/// Handlers reach the store directly for plain catalog reads and writes; all
/// stock movement goes through the ledger, all order moves through the
/// sequencer.
pub struct AppServices {
    pub store: Arc<dyn MarketStore>,
    pub ledger: StockLedger<Arc<dyn MarketStore>>,
    pub sequencer: FulfillmentSequencer<Arc<dyn MarketStore>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            sequencer: FulfillmentSequencer::new(store.clone()),
            store,
        }
    }
}
