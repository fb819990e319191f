//! Parser Adapter - 源文档解析实现

mod text_parser;

pub use text_parser::PlainTextParser;
