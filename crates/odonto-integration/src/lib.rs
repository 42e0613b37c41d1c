//! # 外部协作者集成模块
//!
//! 提供牙位图核心依赖的外部协作者，包括：
//! - 治疗数据源：内置静态表或后端REST接口
//! - 确认协作者：固定应答或终端提示

pub mod confirm;
pub mod treatment_source;

pub use confirm::{AutoConfirmer, TerminalConfirmer};
pub use treatment_source::{
    build_catalog, ConditionRecord, RestTreatmentSource, StaticTreatmentSource, TreatmentRecord,
    TreatmentSource,
};
