pub mod memory;
pub mod postgres;
pub mod redis;
mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
pub use store::Store;

#[cfg(test)]
pub use store::MockStore;
