//! # Odonto Core
//!
//! 牙位图系统的核心模块，提供牙位编号、牙面、治疗定义等基础数据结构、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{OdontoError, Result};
pub use models::*;
