//! 日誌初始化
//!
//! 以 `RUST_LOG` 控制等級，未設置時為 `info`，例如
//! `RUST_LOG=mrp_calc=debug,mrp_optimizer=debug`。

use tracing_subscriber::{fmt, EnvFilter};

/// 安裝全域 fmt 訂閱者
///
/// ```no_run
/// combo_mrp::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 測試用：debug 等級並寫入測試輸出，可重複呼叫
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
