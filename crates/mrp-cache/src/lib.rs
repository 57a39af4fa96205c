//! # MRP Cache
//!
//! 單次計算範圍內的 BOM 查詢緩存

pub mod bom_cache;

// Re-export 主要類型
pub use bom_cache::BomLookupCache;
