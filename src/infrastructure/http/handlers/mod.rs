//! HTTP Handlers

mod audiobook;
mod books;
mod catalog;
mod ping;

pub use audiobook::*;
pub use books::*;
pub use catalog::*;
pub use ping::*;
