//! 错误定义模块

use thiserror::Error;

/// 急诊分诊系统统一错误类型
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态: {0}")]
    InvalidState(String),

    #[error("冲突: {0}")]
    Conflict(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 错误分类，供调用方（例如 HTTP 层）映射状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidState,
    Conflict,
    Infrastructure,
}

impl TriageError {
    /// 返回错误所属的分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            TriageError::InvalidInput(_) => ErrorKind::InvalidInput,
            TriageError::NotFound(_) => ErrorKind::NotFound,
            TriageError::InvalidState(_) => ErrorKind::InvalidState,
            TriageError::Conflict(_) => ErrorKind::Conflict,
            TriageError::Storage(_) | TriageError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// 锁中毒时的统一错误
    pub fn poisoned(what: &str) -> Self {
        TriageError::Internal(format!("{} lock poisoned", what))
    }
}

/// 分诊系统统一结果类型
pub type Result<T> = std::result::Result<T, TriageError>;
