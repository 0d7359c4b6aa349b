// In-memory caching layer
// Keeps GitHub calls down within a run; nothing is written to disk

pub mod cache;

pub use cache::StarCountCache;
