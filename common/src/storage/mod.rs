pub mod index_cache;
pub mod paths;
