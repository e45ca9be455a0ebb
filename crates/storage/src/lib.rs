//! The persistence port for the exchange core: durable order, trade,
//! balance, and position records, committed atomically through a single
//! seam (spec.md §4.3, §6).

pub mod error;
pub mod memory;
pub mod port;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryPersistence;
pub use port::PersistencePort;
pub use types::{
    Account, Balance, BalanceDelta, Order, OrderWriteSet, Position, PositionUpsert, TradeRecord,
};
