//! # MRP Optimizer
//!
//! 組合（Combo）生產的分配與優化：組合目錄、初始分配、批數優化、
//! 彙總視圖、互動式調整與匯入。

pub mod assignment;
pub mod catalog;
pub mod import;
pub mod optimizer;
pub mod report;
pub mod session;
pub mod views;

// Re-export 主要類型
pub use assignment::{AssignmentResult, ComboAssigner};
pub use catalog::ComboCatalog;
pub use import::{parse_import, parse_import_str, ImportBatch, ImportRow, ImportSummary};
pub use optimizer::{compute_production, ComboOptimizer, ConvergenceReport, PassSummary, ResidualDeficit};
pub use report::{AppliedRow, ComparisonReport, ComparisonRow, ComparisonStatus, ReportTotals};
pub use session::{AllocationSession, ImportApplication};
pub use views::{
    all_references, by_combo, by_reference, redistribute, ComboGroupView, ComboOutputView, ComboShare,
    Contribution, ReferenceView,
};
