//! 规则加载管理器
//! 负责解析规则数据，以及从本地缓存或远程拉取 ClearURLs 规则文件

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use super::cache::RuleCacheManager;
use super::model::RuleData;
use crate::compiler::{RuleCompiler, RuleSet};
use crate::config::GlobalConfig;
use crate::error::{UrouteError, UrouteResult};

const USER_AGENT: &str = concat!("uroute/", env!("CARGO_PKG_VERSION"));

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 解析规则数据（不构建规则集）
    pub fn parse(source: &[u8]) -> UrouteResult<RuleData> {
        serde_json::from_slice(source)
            .map_err(|e| UrouteError::RuleDataError(format!("规则JSON解析失败：{}", e)))
    }

    /// 从内存数据加载规则集
    pub fn from_slice(source: &[u8]) -> UrouteResult<RuleSet> {
        let rule_data = Self::parse(source)?;
        Ok(RuleCompiler::compile(&rule_data))
    }

    /// 从本地文件加载规则集
    pub fn from_path(path: &Path) -> UrouteResult<RuleSet> {
        let data = std::fs::read(path).map_err(|e| {
            UrouteError::RuleDataError(format!("读取规则文件 {} 失败：{}", path.display(), e))
        })?;
        Self::from_slice(&data)
    }

    /// 加载规则集（优先本地文件，缺失或过期则拉取远程）
    pub async fn load(config: &GlobalConfig) -> UrouteResult<RuleSet> {
        // 1. 读取本地规则文件
        let local = match RuleCacheManager::load_from_cache(config).await {
            Ok(data) => match Self::from_slice(&data) {
                Ok(rule_set) => Some(rule_set),
                Err(e) => {
                    warn!("本地规则文件损坏：{}", e);
                    None
                }
            },
            Err(e) => {
                debug!("本地规则文件不可用：{}", e);
                None
            }
        };

        // 2. 本地有效且未过期，直接使用
        if let Some(rule_set) = &local {
            if !RuleCacheManager::is_stale(config).await {
                debug!("从本地规则文件加载成功，Provider数：{}", rule_set.len());
                return Ok(rule_set.clone());
            }
            info!("本地规则文件已过期，尝试刷新");
        } else {
            warn!("本地规则文件不存在或损坏，将拉取远程规则");
        }

        // 3. 拉取远程规则，失败时退回过期的本地规则
        match Self::fetch_remote(config).await {
            Ok(rule_set) => Ok(rule_set),
            Err(e) => match local {
                Some(rule_set) => {
                    warn!("远程规则拉取失败，继续使用过期的本地规则：{}", e);
                    Ok(rule_set)
                }
                None => Err(e),
            },
        }
    }

    /// 加载规则集，任何失败都退化为空规则集
    pub async fn load_or_empty(config: &GlobalConfig) -> RuleSet {
        match Self::load(config).await {
            Ok(rule_set) => rule_set,
            Err(e) => {
                warn!("规则加载失败，URL将不做清理：{}", e);
                RuleSet::empty()
            }
        }
    }

    /// 强制拉取远程规则（按配置顺序尝试各规则源）
    pub async fn fetch_remote(config: &GlobalConfig) -> UrouteResult<RuleSet> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .build()?;

        for source_url in &config.rule_sources {
            debug!("开始尝试拉取规则，URL：{}", source_url);

            let data = match Self::fetch_rule_file(&client, source_url).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("拉取规则失败：{}，URL：{}", e, source_url);
                    continue; // 尝试下一个规则源
                }
            };

            let rule_set = match Self::from_slice(&data) {
                Ok(rule_set) => rule_set,
                Err(e) => {
                    warn!("远程规则无效：{}，URL：{}", e, source_url);
                    continue;
                }
            };

            // 缓存到本地
            if let Err(e) = RuleCacheManager::save_to_cache(config, &data).await {
                warn!("规则缓存到本地失败：{}", e);
            }

            info!("成功拉取规则，Provider数：{}，URL：{}", rule_set.len(), source_url);
            return Ok(rule_set);
        }

        Err(UrouteError::RuleLoadError(
            "所有远程规则源拉取失败，请检查网络或URL配置".to_string(),
        ))
    }

    /// 拉取单个规则文件原文
    async fn fetch_rule_file(client: &Client, url: &str) -> UrouteResult<Vec<u8>> {
        let response = client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UrouteError::RuleLoadError(format!(
                "URL {} 返回状态码 {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
