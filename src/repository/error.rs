// ==========================================
// 养殖批次运营核心 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    /// 约束目标, 例如 `batch.batch_number`
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    /// 事务内条件更新未命中 (库存不足、分配尾数不足)
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// "UNIQUE constraint failed: batch.batch_number" -> "batch.batch_number"
fn constraint_target(msg: &str) -> String {
    msg.split_once("failed:")
        .map(|(_, target)| target.trim().to_string())
        .unwrap_or_else(|| msg.to_string())
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                RepositoryError::UniqueConstraintViolation(constraint_target(&msg))
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("FOREIGN KEY") => {
                RepositoryError::ForeignKeyViolation(msg)
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::not_found("记录", "-"),
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: RepositoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_unique_violation_keeps_target() {
        let sqlite_err = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT);
        let err: RepositoryError = rusqlite::Error::SqliteFailure(
            sqlite_err,
            Some("UNIQUE constraint failed: batch.batch_number".to_string()),
        )
        .into();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(ref t) if t == "batch.batch_number"));
    }
}
