//! # MRP Calculation Engine
//!
//! BOM 展開與庫存淨需求計算

pub mod calculator;
pub mod explosion;
pub mod netting;

// Re-export 主要類型
pub use calculator::MrpCalculator;
pub use explosion::{BomExplosion, ExplosionResult, ExplosionStats};
pub use netting::{AlertStatus, ComponentAnalysis, NettingCalculator, NettingResult, ProductionRequirement};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// MRP 計算結果
#[derive(Debug, Clone)]
pub struct MrpResult {
    /// 計算ID（日誌關聯用）
    pub run_id: uuid::Uuid,

    /// 展開後的總需求
    pub requirements: HashMap<String, Decimal>,

    /// 淨需求與庫存分析
    pub netting: NettingResult,

    /// 展開統計
    pub stats: ExplosionStats,

    /// 警告信息
    pub warnings: Vec<MrpWarning>,

    /// 計算時間
    pub calculated_at: DateTime<Utc>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl MrpResult {
    /// 創建空的計算結果
    pub fn empty() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            requirements: HashMap::new(),
            netting: NettingResult::default(),
            stats: ExplosionStats::default(),
            warnings: Vec::new(),
            calculated_at: Utc::now(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: MrpWarning) {
        self.warnings.push(warning);
    }

    /// 展開是否被截斷（深度上限、循環或溢位）
    pub fn is_truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(
                w.kind,
                WarningKind::DepthExceeded | WarningKind::CycleDetected | WarningKind::Overflow
            ))
    }
}

/// 警告類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// 達到 BOM 深度上限，未繼續展開
    DepthExceeded,
    /// 子件已在目前展開路徑上
    CycleDetected,
    /// 需求根沒有 BOM
    NoBom,
    /// 需求數量超出可表示範圍
    Overflow,
}

/// MRP 警告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrpWarning {
    pub component_id: String,
    pub kind: WarningKind,
    pub message: String,
    pub severity: WarningSeverity,
}

impl MrpWarning {
    pub fn new(component_id: String, kind: WarningKind, message: String, severity: WarningSeverity) -> Self {
        Self {
            component_id,
            kind,
            message,
            severity,
        }
    }

    pub fn info(component_id: String, kind: WarningKind, message: String) -> Self {
        Self::new(component_id, kind, message, WarningSeverity::Info)
    }

    pub fn warning(component_id: String, kind: WarningKind, message: String) -> Self {
        Self::new(component_id, kind, message, WarningSeverity::Warning)
    }

    pub fn error(component_id: String, kind: WarningKind, message: String) -> Self {
        Self::new(component_id, kind, message, WarningSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
