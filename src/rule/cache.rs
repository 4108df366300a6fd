//! 规则缓存管理
//! 仅处理本地规则文件（ClearURLs JSON 原文）的读写与有效期判断

use std::time::SystemTime;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::error::UrouteResult;

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 读取本地规则文件原文
    pub async fn load_from_cache(config: &GlobalConfig) -> UrouteResult<Vec<u8>> {
        let cache_data = tokio::fs::read(&config.rules_path).await?;
        debug!(
            "本地规则文件读取成功：{}，大小：{} 字节",
            config.rules_path.display(),
            cache_data.len()
        );
        Ok(cache_data)
    }

    /// 将规则原文写入本地（自动创建父目录）
    pub async fn save_to_cache(config: &GlobalConfig, data: &[u8]) -> UrouteResult<()> {
        let cache_path = &config.rules_path;
        if let Some(parent) = cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(cache_path, data).await?;
        debug!("规则文件已写入：{}，大小：{} 字节", cache_path.display(), data.len());
        Ok(())
    }

    /// 清除本地缓存
    pub async fn clear_cache(config: &GlobalConfig) -> UrouteResult<()> {
        let cache_path = &config.rules_path;
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }

    /// 本地规则文件是否过期（文件不存在视为过期，未配置有效期则永不过期）
    pub async fn is_stale(config: &GlobalConfig) -> bool {
        let Ok(metadata) = tokio::fs::metadata(&config.rules_path).await else {
            return true;
        };
        let Some(max_age) = config.rules_max_age else {
            return false;
        };

        metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age > max_age)
            // 时钟回拨等无法计算文件年龄时，按未过期处理
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use std::time::Duration;

    fn config_in(dir: &tempfile::TempDir) -> GlobalConfig {
        ConfigManager::custom()
            .rules_path(dir.path().join("data").join("rules.json"))
            .build()
    }

    #[tokio::test]
    async fn test_save_load_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        assert!(RuleCacheManager::load_from_cache(&config).await.is_err());
        RuleCacheManager::save_to_cache(&config, b"{\"providers\":{}}").await.unwrap();
        let data = RuleCacheManager::load_from_cache(&config).await.unwrap();
        assert_eq!(data, b"{\"providers\":{}}");

        RuleCacheManager::clear_cache(&config).await.unwrap();
        assert!(!config.rules_path.exists());
        // 重复清除不报错
        RuleCacheManager::clear_cache(&config).await.unwrap();
    }

    #[tokio::test]
    async fn test_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);

        assert!(RuleCacheManager::is_stale(&config).await);

        RuleCacheManager::save_to_cache(&config, b"{}").await.unwrap();
        assert!(!RuleCacheManager::is_stale(&config).await);

        config.rules_max_age = Some(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(RuleCacheManager::is_stale(&config).await);

        config.rules_max_age = None;
        assert!(!RuleCacheManager::is_stale(&config).await);
    }
}
