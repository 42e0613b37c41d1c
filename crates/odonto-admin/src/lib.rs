//! # 管理模块
//!
//! 提供配置加载、校验和保存等运维功能

pub mod config;

pub use config::{
    ChartConfig, ChartTemplate, ConfigManager, ConfigValidator, LoggingConfig, OdontoConfig,
    SourceKind, TreatmentSourceConfig,
};
