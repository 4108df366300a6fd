//! uroute - 基于 ClearURLs 规则的URL清理与浏览器路由工具

use std::path::Path;

// 导出全局错误类型
pub use self::error::{UrouteError, UrouteResult};

// 导出配置模块
pub use self::config::{ConfigFile, ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{ProviderRule, RuleCacheManager, RuleData, RuleLoader};

// 导出编译模块核心接口
pub use self::compiler::{CompileStats, Pattern, Provider, RuleCompiler, RuleSet};

// 导出清理模块核心接口
pub use self::cleaner::{clean_url, UrlCleaner, MAX_REDIRECT_DEPTH};

// 导出提取模块核心接口
pub use self::extractor::extract_url;

// 导出路由模块核心接口
pub use self::router::{LaunchPlan, Program, ProgramTable, Uroute};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod logging;
pub mod rule;
pub mod compiler;
pub mod cleaner;
pub mod extractor;
pub mod router;

/// 从 ClearURLs JSON 文本加载规则集
pub fn load_ruleset(source: impl AsRef<[u8]>) -> UrouteResult<RuleSet> {
    RuleLoader::from_slice(source.as_ref())
}

/// 从 ClearURLs JSON 文件加载规则集
pub fn load_ruleset_file(path: impl AsRef<Path>) -> UrouteResult<RuleSet> {
    RuleLoader::from_path(path.as_ref())
}
