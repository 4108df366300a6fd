//! 日志初始化：tracing-subscriber 输出到 stderr

use tracing_subscriber::EnvFilter;

use crate::error::{UrouteError, UrouteResult};

/// 未指定任何级别时的默认过滤
pub const DEFAULT_LEVEL: &str = "info";

/// 计算过滤指令：RUST_LOG > --verbose > 配置文件 > 默认
pub fn filter_directive(env: Option<&str>, verbose: bool, configured: Option<&str>) -> String {
    if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
        return env.to_string();
    }
    if verbose {
        return "debug".to_string();
    }
    match configured.map(str::trim) {
        Some(level) if !level.is_empty() => normalize_level(level),
        _ => DEFAULT_LEVEL.to_string(),
    }
}

/// 兼容 WARNING / CRITICAL 等常见级别写法
fn normalize_level(level: &str) -> String {
    match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// 初始化全局日志订阅器
pub fn init_logging(verbose: bool, configured: Option<&str>) -> UrouteResult<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(env.as_deref(), verbose, configured);

    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("日志级别 {:?} 无效（{}），使用 {}", directive, e, DEFAULT_LEVEL);
        EnvFilter::new(DEFAULT_LEVEL)
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| UrouteError::ConfigError(format!("日志初始化失败：{}", e)))?;

    tracing::debug!("日志已初始化，过滤：{}", directive);
    Ok(())
}
