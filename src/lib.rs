//! # Odonto
//!
//! 牙科诊所牙位图（Odontogram）记录系统，重新导出各子模块。

pub use odonto_admin as admin;
pub use odonto_chart as chart;
pub use odonto_core as core;
pub use odonto_integration as integration;

pub use odonto_chart::{ChartingSession, Odontogram, SessionOptions, TreatmentCatalog};
pub use odonto_core::{OdontoError, Result};
