//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum UrouteError {
    // 规则数据相关错误
    #[error("规则数据无效：{0}")]
    RuleDataError(String),
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),

    // 清理相关错误
    #[error("正则编译失败：{pattern}，原因：{message}")]
    PatternError { pattern: String, message: String },
    #[error("跳转层数超过上限 {depth}，最后一跳：{last_url}")]
    RedirectLoopError { depth: usize, last_url: String },
    #[error("跳转目标解码失败：{0}")]
    DecodeError(String),

    // 路由相关错误
    #[error("配置错误：{0}")]
    ConfigError(String),
    #[error("未配置任何程序")]
    NoPrograms,
    #[error("未知程序ID：{0}")]
    UnknownProgram(String),
    #[error("程序启动失败：{0}")]
    LaunchError(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("TOML解析失败：{0}")]
    TomlDeError(#[from] toml::de::Error),
    #[error("TOML序列化失败：{0}")]
    TomlSerError(#[from] toml::ser::Error),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
}

// 全局Result类型
pub type UrouteResult<T> = Result<T, UrouteError>;
