//! Query Handlers 实现

mod book_handlers;
mod catalog_handlers;

pub use book_handlers::*;
pub use catalog_handlers::*;
