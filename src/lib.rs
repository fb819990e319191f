//! Narrator - 有声书生成与逐词同步系统
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book Context: 有声书、章节、清单
//! - Timing Context: 逐词时间戳、启发式估计、词映射
//! - 章节切分与文本分块
//!
//! 应用层 (application/):
//! - Ports: 端口定义（JobRegistry, BookRepository, SynthesisEngine, AlignmentEngine, AudioPackager, DocumentParser）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//! - Alignment: 对齐后端降级策略
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Memory: JobRegistry 内存实现
//! - Worker: GenerationWorker 后台生成流水线
//! - Persistence: 文件系统有声书存储
//! - Adapters: 合成客户端、对齐客户端、WAV 打包、文本解析
//!
//! 外围组件:
//! - gateway: 章节流式代理
//! - playback: 播放端逐词高亮同步

pub mod application;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod infrastructure;
pub mod playback;

pub use config::{load_config, AppConfig};
