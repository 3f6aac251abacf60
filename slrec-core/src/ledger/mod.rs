pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use event::{EventKind, LedgerEvent, ValidationError};
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::{AccountBalance, BalanceStep, LedgerStore, StoreError};
