pub mod source_cache;
