//! Document Parser Port - 源文档解析抽象

use crate::domain::book::IngestionError;
use crate::domain::ParsedDocument;

/// Document Parser Port
pub trait DocumentParserPort: Send + Sync {
    /// 是否支持该扩展名（小写，不含点）
    fn supports(&self, extension: &str) -> bool;

    /// 解析源文档，`file_stem` 用作缺省书名
    fn parse(&self, bytes: &[u8], file_stem: &str) -> Result<ParsedDocument, IngestionError>;
}
