//! 工具模块

pub mod response;
pub mod validation;

pub use validation::*;
