//! 全局配置管理，存储所有可配置项
//! 包括规则相关运行参数（GlobalConfig）与用户配置文件（config.toml）

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{UrouteError, UrouteResult};

/// ClearURLs 官方规则源
pub const CLEARURLS_RULES_URL: &str = "https://rules2.clearurls.xyz/data.minify.json";
/// ClearURLs GitLab 镜像
pub const CLEARURLS_MIRROR_URL: &str = "https://gitlab.com/ClearURLs/rules/-/raw/master/data.min.json";

const APP_NAME: &str = "uroute";
const DEFAULT_RULES_MAX_AGE_DAYS: u64 = 7;

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 本地规则文件路径
    pub rules_path: PathBuf,
    // 远程规则源（按顺序尝试）
    pub rule_sources: Vec<String>,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 本地规则文件最长有效期，None 表示永不刷新
    pub rules_max_age: Option<Duration>,
    // 是否启用URL清理
    pub clean_urls: bool,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            rule_sources: vec![
                CLEARURLS_RULES_URL.to_string(),
                CLEARURLS_MIRROR_URL.to_string(),
            ],
            http_timeout: 30,
            rules_max_age: Some(days(DEFAULT_RULES_MAX_AGE_DAYS)),
            clean_urls: true,
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }

    /// 默认配置文件路径：$XDG_CONFIG_HOME/uroute/config.toml
    pub fn config_path() -> PathBuf {
        xdg_dirs()
            .map(|dirs| dirs.get_config_home().join(APP_NAME).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".uroute.toml"))
    }

    /// 加载配置文件，不存在时生成初始配置
    pub fn load_or_init(path: &Path) -> UrouteResult<ConfigFile> {
        if !path.exists() {
            let initial = ConfigFile::initial(|prog| which(prog).is_some());
            initial.save(path)?;
            info!("已生成初始配置文件：{}", path.display());
            return Ok(initial);
        }

        ConfigFile::load(path)
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn rules_path(mut self, path: PathBuf) -> Self {
        self.config.rules_path = path;
        self
    }

    pub fn rule_sources(mut self, sources: Vec<String>) -> Self {
        self.config.rule_sources = sources;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn rules_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.config.rules_max_age = max_age;
        self
    }

    pub fn clean_urls(mut self, enabled: bool) -> Self {
        self.config.clean_urls = enabled;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// 应用配置文件 [main] 段中的覆盖项
    pub fn apply_file(mut self, file: &ConfigFile) -> Self {
        let main = &file.main;
        if let Some(path) = &main.clean_urls_rules_file {
            self.config.rules_path = expand_home(path);
        }
        if let Some(enabled) = main.clean_urls {
            self.config.clean_urls = enabled;
        }
        if let Some(days_count) = main.rules_max_age_days {
            self.config.rules_max_age = (days_count > 0).then(|| days(days_count));
        }
        if let Some(timeout) = main.http_timeout {
            self.config.http_timeout = timeout;
        }
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

/// 配置文件 [main] 段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_urls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_urls_rules_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_max_age_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout: Option<u64>,
}

/// 配置文件 [logging] 段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// 配置文件中的单个程序（[[program]]）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub id: String,
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ProgramEntry {
    fn new(id: &str, name: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            command: command.to_string(),
            icon: None,
        }
    }
}

/// 用户配置文件（~/.config/uroute/config.toml）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub main: MainSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default, rename = "program", skip_serializing_if = "Vec::is_empty")]
    pub programs: Vec<ProgramEntry>,
}

impl ConfigFile {
    /// 解析配置文本
    pub fn from_toml(content: &str) -> UrouteResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 从文件加载配置
    pub fn load(path: &Path) -> UrouteResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            UrouteError::ConfigError(format!("读取配置文件 {} 失败：{}", path.display(), e))
        })?;
        let file = Self::from_toml(&content)?;
        debug!("配置文件加载成功：{}，程序数：{}", path.display(), file.programs.len());
        Ok(file)
    }

    /// 写入配置文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> UrouteResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 生成初始配置：按已安装的浏览器填充程序列表
    pub fn initial(is_installed: impl Fn(&str) -> bool) -> Self {
        let mut file = ConfigFile::default();
        let mut default_program = None;

        if is_installed("firefox") {
            file.programs.push(ProgramEntry::new("firefox", "Firefox", "firefox"));
            file.programs.push(ProgramEntry::new(
                "firefox-private",
                "Firefox Private Window",
                "firefox --private-window",
            ));
            default_program = Some("firefox-private".to_string());
        }

        if is_installed("chromium-browser") || is_installed("chromium") {
            let binary = if is_installed("chromium-browser") { "chromium-browser" } else { "chromium" };
            file.programs.push(ProgramEntry::new("chromium", "Chromium", binary));
            file.programs.push(ProgramEntry::new(
                "chromium-incognito",
                "Chromium Incognito",
                &format!("{} --incognito", binary),
            ));
            default_program.get_or_insert_with(|| "chromium-incognito".to_string());
        }

        file.main.default_program = default_program;
        file
    }
}

/// 默认规则文件路径：$XDG_DATA_HOME/uroute/rules.json
pub fn default_rules_path() -> PathBuf {
    xdg_dirs()
        .map(|dirs| dirs.get_data_home().join(APP_NAME).join("rules.json"))
        .unwrap_or_else(|| PathBuf::from("rules.json"))
}

fn xdg_dirs() -> Option<xdg::BaseDirectories> {
    xdg::BaseDirectories::with_prefix(APP_NAME).ok()
}

/// 在 PATH 中查找可执行文件
pub fn which(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// 展开开头的 `~`（主目录不可用时原样返回）
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

fn days(count: u64) -> Duration {
    Duration::from_secs(count * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.http_timeout, 30);
        assert!(cfg.clean_urls);
        assert_eq!(cfg.rule_sources[0], CLEARURLS_RULES_URL);
        assert_eq!(cfg.rules_max_age, Some(Duration::from_secs(7 * 86400)));
        assert!(cfg.rules_path.ends_with("rules.json"));
    }

    #[test]
    fn test_config_file_parse() {
        let toml = r#"
            [main]
            default_program = "ff"
            clean_urls = false
            rules_max_age_days = 0

            [logging]
            level = "debug"

            [[program]]
            id = "ff"
            name = "Firefox"
            command = "firefox @URL"

            [[program]]
            id = "cr"
            name = "Chromium"
            command = "chromium --incognito"
            icon = "chromium"
        "#;

        let file = ConfigFile::from_toml(toml).unwrap();
        assert_eq!(file.main.default_program.as_deref(), Some("ff"));
        assert_eq!(file.logging.level.as_deref(), Some("debug"));
        assert_eq!(file.programs.len(), 2);
        assert_eq!(file.programs[1].icon.as_deref(), Some("chromium"));

        let cfg = ConfigManager::custom().apply_file(&file).build();
        assert!(!cfg.clean_urls);
        assert_eq!(cfg.rules_max_age, None);
    }

    #[test]
    fn test_rules_file_override() {
        let file = ConfigFile::from_toml(
            "[main]\nclean_urls_rules_file = \"/tmp/custom-rules.json\"\nhttp_timeout = 5\n",
        )
        .unwrap();
        let cfg = ConfigManager::custom().apply_file(&file).build();
        assert_eq!(cfg.rules_path, PathBuf::from("/tmp/custom-rules.json"));
        assert_eq!(cfg.http_timeout, 5);
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().expect("测试环境需要主目录");
        assert_eq!(expand_home("~/rules.json"), home.join("rules.json"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("/abs/rules.json"), PathBuf::from("/abs/rules.json"));
        assert_eq!(expand_home("~other/rules.json"), PathBuf::from("~other/rules.json"));

        let file = ConfigFile::from_toml("[main]\nclean_urls_rules_file = \"~/data/rules.json\"\n").unwrap();
        let cfg = ConfigManager::custom().apply_file(&file).build();
        assert_eq!(cfg.rules_path, home.join("data").join("rules.json"));
    }

    #[test]
    fn test_empty_config_file() {
        let file = ConfigFile::from_toml("").unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn test_initial_config_prefers_firefox_private() {
        let file = ConfigFile::initial(|prog| prog == "firefox" || prog == "chromium");
        let ids: Vec<&str> = file.programs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["firefox", "firefox-private", "chromium", "chromium-incognito"]);
        assert_eq!(file.main.default_program.as_deref(), Some("firefox-private"));
        assert_eq!(file.programs[3].command, "chromium --incognito");
    }

    #[test]
    fn test_initial_config_without_browsers() {
        let file = ConfigFile::initial(|_| false);
        assert!(file.programs.is_empty());
        assert!(file.main.default_program.is_none());
    }

    #[test]
    fn test_load_or_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = ConfigManager::load_or_init(&path).unwrap();
        assert!(path.exists());

        let reloaded = ConfigManager::load_or_init(&path).unwrap();
        assert_eq!(created, reloaded);
    }
}
