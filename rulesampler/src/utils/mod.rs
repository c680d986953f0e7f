pub mod lru;
pub mod top_k;

pub use lru::LruCache;
pub use top_k::{Ranked, TopK};
