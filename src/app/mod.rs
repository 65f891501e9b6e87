// ==========================================
// 养殖批次运营核心 - 应用层
// ==========================================
// 职责: 装配仓储与 API, 对外提供统一入口
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
