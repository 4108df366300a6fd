//! 路由门面：清理URL并交给选定的程序打开

use tracing::{debug, info, warn};

use super::launcher::{launch, LaunchPlan};
use super::program::ProgramTable;
use crate::cleaner::UrlCleaner;
use crate::compiler::RuleSet;
use crate::config::{ConfigFile, GlobalConfig};
use crate::error::UrouteResult;
use crate::rule::RuleLoader;

/// URL 路由器
#[derive(Debug, Clone)]
pub struct Uroute {
    config: GlobalConfig,
    programs: ProgramTable,
    rule_set: Option<RuleSet>,
}

impl Uroute {
    /// `rule_set` 为 None 时不做URL清理
    pub fn new(config: GlobalConfig, programs: ProgramTable, rule_set: Option<RuleSet>) -> Self {
        Self { config, programs, rule_set }
    }

    /// 按配置构建，需要清理URL时加载规则集（失败则退化为空规则集）
    pub async fn from_config(config: GlobalConfig, file: &ConfigFile) -> Self {
        let programs = ProgramTable::from_config(file);
        let rule_set = if config.clean_urls {
            Some(RuleLoader::load_or_empty(&config).await)
        } else {
            debug!("URL清理已关闭");
            None
        };
        Self::new(config, programs, rule_set)
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn programs(&self) -> &ProgramTable {
        &self.programs
    }

    pub fn rule_set(&self) -> Option<&RuleSet> {
        self.rule_set.as_ref()
    }

    /// 清理URL，从不失败：出错时返回原URL
    pub fn clean_url(&self, url: &str) -> String {
        let Some(rule_set) = &self.rule_set else {
            return url.to_string();
        };

        match UrlCleaner::new(rule_set).clean_or_last(url) {
            Ok(cleaned) => {
                if cleaned != url {
                    info!("URL已清理：{} -> {}", url, cleaned);
                }
                cleaned
            }
            Err(e) => {
                warn!("URL清理失败，使用原URL：{}", e);
                url.to_string()
            }
        }
    }

    /// 生成启动计划（不启动）
    pub fn route(&self, url: &str, preferred: Option<&str>) -> UrouteResult<LaunchPlan> {
        let program = self.programs.select(preferred)?;
        let url = self.clean_url(url);
        LaunchPlan::new(program.clone(), url)
    }

    /// 清理URL并启动选定的程序
    pub fn run(&self, url: &str, preferred: Option<&str>) -> UrouteResult<LaunchPlan> {
        let plan = self.route(url, preferred)?;
        launch(&plan)?;
        Ok(plan)
    }
}
