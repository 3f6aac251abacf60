mod ledger_consumer;

pub use ledger_consumer::LedgerConsumer;
