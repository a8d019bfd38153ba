//! # 统一错误处理模块
//!
//! 定义 qpd 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分级
//! - 启动期错误（配置、输入数据、缺失字段）: 致命，立即中止
//! - `Normalization`: 不向上传播，仅作为诊断信息打印
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qpd 统一错误类型
#[derive(Error, Debug)]
pub enum QpdError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 配置与输入数据
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input data in {path}\nReason: {reason}")]
    InputData { path: String, reason: String },

    #[error("Required field '{field}' not found on level {level}")]
    MissingField { level: usize, field: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 归一化（降级为单位因子，仅诊断）
    // ─────────────────────────────────────────────────────────────
    #[error("Normalization fell back to 1: {0}")]
    Normalization(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QpdError>;
