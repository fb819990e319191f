//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（JobRegistry、BookRepository、SynthesisEngine、AlignmentEngine 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - alignment: 对齐降级策略
//! - error: 应用层错误定义

pub mod alignment;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use alignment::{AlignmentOutcome, AlignmentPolicy, ChapterAlignment, TimingSource};

pub use commands::{
    handlers::{DeleteBookHandler, GenerationDefaults, SubmitAudiobookHandler},
    DeleteBook, SubmitAudiobook, SubmitAudiobookResponse,
};

pub use error::ApplicationError;

pub use ports::{
    // Alignment
    AlignerRegistry,
    AlignmentBackend,
    AlignmentEnginePort,
    AlignmentError,
    AlignmentSelection,
    // Packaging
    AudioPackagerPort,
    ChapterMarker,
    ContainerChapter,
    PackagingError,
    // Books
    BookFile,
    BookRepositoryPort,
    RepositoryError,
    // Parsing
    DocumentParserPort,
    // Jobs
    Job,
    JobError,
    JobRegistryPort,
    JobRequest,
    JobStatus,
    // Synthesis
    SynthesisEnginePort,
    SynthesisError,
    SynthesisOutput,
    SynthesisRequest,
};

pub use queries::{
    handlers::{
        GetAssetHandler, GetBookHandler, GetChapterAudioHandler, GetChapterMetadataHandler,
        GetJobStatusHandler, ListAlignersHandler, ListBooksHandler, ListVoicesHandler,
    },
    GetAsset, GetBook, GetChapterAudio, GetChapterMetadata, GetJobStatus, ListAligners, ListBooks,
    ListVoices,
};
