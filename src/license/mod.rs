//! License record loading.
//!
//! - [`record`]: on-disk record formats (structured JSON, legacy YAML, master database).
//! - [`store`]: the read-only, validated collection of records and its data-quality audit.

pub mod record;
pub mod store;
