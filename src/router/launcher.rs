//! 程序启动：命令模板展开与子进程启动

use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::program::Program;
use crate::error::{UrouteError, UrouteResult};

/// 命令模板中的URL占位符
pub const URL_PLACEHOLDER: &str = "@URL";

/// 启动计划：选定的程序与最终参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: Program,
    pub url: String,
    pub args: Vec<String>,
}

impl LaunchPlan {
    pub fn new(program: Program, url: String) -> UrouteResult<Self> {
        let args = build_args(&program.command, &url)?;
        Ok(Self { program, url, args })
    }
}

/// 展开命令模板：`@URL` 参数替换为URL，没有任何参数等于URL时追加到末尾
pub fn build_args(command: &str, url: &str) -> UrouteResult<Vec<String>> {
    let mut args: Vec<String> = command
        .split_whitespace()
        .map(|arg| if arg == URL_PLACEHOLDER { url.to_string() } else { arg.to_string() })
        .collect();

    if args.is_empty() {
        return Err(UrouteError::LaunchError(format!("命令为空：{:?}", command)));
    }

    if !args.iter().any(|arg| arg == url) {
        args.push(url.to_string());
    }

    Ok(args)
}

/// 启动程序，不等待其退出
pub fn launch(plan: &LaunchPlan) -> UrouteResult<()> {
    let (binary, rest) = plan
        .args
        .split_first()
        .ok_or_else(|| UrouteError::LaunchError("参数列表为空".to_string()))?;

    debug!("路由URL {} 到命令：{:?}", plan.url, plan.args);

    let child = Command::new(binary)
        .args(rest)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| UrouteError::LaunchError(format!("{}：{}", binary, e)))?;

    info!("已启动 {}，PID：{}", plan.program, child.id());
    Ok(())
}
