//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod alignment_engine;
mod audio_packager;
mod book_repository;
mod document_parser;
mod job_registry;
mod synthesis_engine;

pub use alignment_engine::{
    AlignerRegistry, AlignmentBackend, AlignmentEnginePort, AlignmentError, AlignmentSelection,
};
pub use audio_packager::{
    render_ffmetadata, AudioPackagerPort, ChapterMarker, ContainerChapter, PackagingError,
};
pub use book_repository::{BookFile, BookRepositoryPort, RepositoryError};
pub use document_parser::DocumentParserPort;
pub use job_registry::{Job, JobError, JobRegistryPort, JobRequest, JobStatus};
pub use synthesis_engine::{SynthesisError, SynthesisEnginePort, SynthesisOutput, SynthesisRequest};
