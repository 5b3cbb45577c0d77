//! [`ConfigStore`](super::ConfigStore) implementations.

mod memory;

pub use memory::MemoryConfigStore;
