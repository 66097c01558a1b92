//! Persistence seam.
//!
//! Worlds and blocksets are stored by name in a [`PersistencePool`]. The
//! engine only needs lookup, store, flush and change notification; encoding
//! is left to the implementation.

mod error;
mod memory;
mod object;
mod pool;

pub use error::LoadFailure;
pub use memory::MemoryPool;
pub use object::{ObjectKind, PoolItem, PoolObject};
pub use pool::{PersistencePool, PoolEvent};
