//! Handlers 模块

pub mod mappings;
pub mod selection;
pub mod servers;

pub use mappings::*;
pub use selection::*;
pub use servers::*;
