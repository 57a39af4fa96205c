//! # MRP Core
//!
//! 核心資料模型與類型定義：BOM 行、組合（Combo）、庫存、參照分配，
//! 以及資料存取介面 [`MrpRepository`]。

pub mod allocation;
pub mod bom;
pub mod combo;
pub mod config;
pub mod demand;
pub mod inventory;
pub mod repository;

// Re-export 主要類型
pub use allocation::{batch_output, ceil_batches, floor_batches, ComboSelectionSource, ReferenceAllocation};
pub use bom::{normalize_id, BomLine};
pub use combo::{ComboCycleTime, ComboDefinition, ComboOutput, ComboOutputLine, PrimaryComboLine};
pub use config::EngineConfig;
pub use demand::Demand;
pub use inventory::InventoryRecord;
pub use repository::{MemoryRepository, MrpRepository};

/// MRP 錯誤類型
///
/// 只有資料存取失敗會中止一次計算；截斷、格式錯誤的匯入列與未收斂
/// 都以結果中的報告回傳，不經過此類型。
#[derive(Debug, thiserror::Error)]
pub enum MrpError {
    #[error("資料存取失敗 ({operation}): {message}")]
    DataStore {
        operation: &'static str,
        message: String,
    },

    #[error("找不到參照: {0}")]
    UnknownReference(String),

    #[error("找不到組合: {0}")]
    UnknownCombo(String),

    #[error("組合 {combo} 不產出參照 {reference}")]
    ComboNotAvailable { reference: String, combo: String },

    #[error("匯入檔格式錯誤: {0}")]
    MalformedImport(String),

    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("匯出失敗: {0}")]
    Export(String),
}

impl MrpError {
    /// 建立資料存取錯誤
    pub fn data_store(operation: &'static str, message: impl Into<String>) -> Self {
        Self::DataStore {
            operation,
            message: message.into(),
        }
    }

    /// 是否為資料存取錯誤（呼叫端可提供重試）
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataStore { .. })
    }
}

pub type Result<T> = std::result::Result<T, MrpError>;
