//! Extension to read the content cache settings from gdmconfig

use crate::resolver::{DEFAULT_CONCURRENCY, DEFAULT_STORE_NAME};
use gdmconfig::Config;

pub trait CacheConfigExt {
    /// Store (namespace) holding the downloaded content
    fn get_cache_store_name(&self) -> String;

    /// Parallel downloads when pre-caching, at least 1
    fn get_precache_concurrency(&self) -> usize;

    fn set_precache_concurrency(&self, concurrency: usize) -> anyhow::Result<()>;
}

impl CacheConfigExt for Config {
    fn get_cache_store_name(&self) -> String {
        self.get_string_or(&["cache", "store_name"], DEFAULT_STORE_NAME)
    }

    fn get_precache_concurrency(&self) -> usize {
        self.get_u64_or(&["cache", "precache_concurrency"], DEFAULT_CONCURRENCY as u64)
            .max(1) as usize
    }

    fn set_precache_concurrency(&self, concurrency: usize) -> anyhow::Result<()> {
        self.set_u64(&["cache", "precache_concurrency"], concurrency.max(1) as u64)
    }
}
