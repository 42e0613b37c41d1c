//! 错误定义模块

use thiserror::Error;

/// 牙位图系统统一错误类型
#[derive(Error, Debug)]
pub enum OdontoError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效牙位编号: {0}")]
    InvalidToothNumber(String),

    #[error("无效牙位图: {0}")]
    InvalidOdontogram(String),

    #[error("无效治疗目录: {0}")]
    InvalidCatalog(String),

    #[error("未知治疗: {0}")]
    UnknownTreatment(String),

    #[error("治疗 {treatment} 不能用于牙面 {surface}")]
    InvalidSurfaceForTreatment { treatment: String, surface: String },

    #[error("已有待确认的操作: {0}")]
    ConfirmationPending(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

impl OdontoError {
    /// 牙位不存在
    pub fn tooth_not_found(number: impl std::fmt::Display) -> Self {
        OdontoError::NotFound(format!("Tooth {} not found", number))
    }

    /// 请求后端失败
    pub fn network(context: impl std::fmt::Display, cause: impl std::fmt::Display) -> Self {
        OdontoError::Network(format!("{}: {}", context, cause))
    }
}

/// 牙位图系统统一结果类型
pub type Result<T> = std::result::Result<T, OdontoError>;
