//! # 牙位图模块
//!
//! 提供完整的牙位图记录功能，包括：
//! - 治疗目录：按标识查找治疗定义，筛选可分面的治疗
//! - 牙齿状态：整牙治疗与分面治疗互斥
//! - 牙位图聚合：八个象限的牙齿查找与修改
//! - 确认门：破坏性批量操作前的用户确认
//! - 病史风险列表：可重复的病史条目

pub mod catalog;
pub mod engine;
pub mod medical_risk;
pub mod odontogram;
pub mod state_machine;
pub mod tooth;

// 重新导出主要类型
pub use catalog::TreatmentCatalog;
pub use engine::{
    ChartSummary, ChartingSession, ClearOutcome, SessionOptions, CLEAR_MEDICAL_RISKS_MESSAGE,
    CLEAR_ODONTOGRAM_MESSAGE,
};
pub use medical_risk::MedicalRiskList;
pub use odontogram::{Odontogram, OdontogramSnapshot};
pub use state_machine::{
    ConfirmationGate, ConfirmationOutcome, ConfirmationTicket, Confirmer, GateEvent, GateState,
};
pub use tooth::{SurfaceTreatments, Tooth, ToothState};
