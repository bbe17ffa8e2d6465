//! Infrastructure layer: storage backends and the transactional services.
//!
//! The [`store`] module owns persistence (Postgres for deployments, an
//! in-memory store for tests and local development). [`ledger::StockLedger`]
//! and [`sequencer::FulfillmentSequencer`] are the two services everything
//! above this crate talks to; neither exposes storage details.

pub mod ledger;
pub mod sequencer;
pub mod store;

pub use ledger::{LedgerError, StockChangeReceipt, StockLedger};
pub use sequencer::{FulfillmentSequencer, OrderDraft, OrderLine};
pub use store::{InMemoryMarketStore, MarketStore, PostgresMarketStore, StoreError};
