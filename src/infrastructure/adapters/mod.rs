//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod alignment;
pub mod audio;
pub mod parser;
pub mod synthesis;

pub use alignment::*;
pub use audio::*;
pub use parser::*;
pub use synthesis::*;
