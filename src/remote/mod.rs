pub mod contract;
pub mod memory;

pub use contract::{DataEvent, DataStore, LookupSource, RemoteError, SchemaProvider};
pub use memory::MemoryStore;
