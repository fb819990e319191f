//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod audiobook_handlers;

pub use audiobook_handlers::*;
