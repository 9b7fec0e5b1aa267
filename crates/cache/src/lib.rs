//! Working-set and staging cache for Doclink.
//!
//! This crate holds the ephemeral side of the system:
//! - The per-user selected domain
//! - The per-user working set (assembled content + embeddings)
//! - Staged uploads awaiting commit
//!
//! Everything here is a derived, disposable projection of the content
//! store. Losing an entry is a performance event, never a correctness
//! failure: working sets are recomputed on demand, and staged uploads
//! are documented to expire if never committed.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::memory::MemoryCache;
pub use error::{CacheError, CacheResult};
pub use traits::WorkingSetCache;

use doclink_core::config::CacheConfig;
use std::sync::Arc;

/// Create a cache from configuration.
pub fn from_config(config: &CacheConfig) -> CacheResult<Arc<dyn WorkingSetCache>> {
    Ok(Arc::new(MemoryCache::new(config)) as Arc<dyn WorkingSetCache>)
}
