pub mod coalescer;
pub mod file;
pub mod keys;
pub mod memory;
pub mod state;
pub mod traits;

pub use coalescer::{
    CoalescerConfig, CoalescerStats, MAX_BATCH_SIZE, PendingWrite, QueueCleared, THROTTLE_MS,
    WriteCoalescer,
};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use state::PersistedState;
pub use traits::{KeyValueStore, StoreMap};
