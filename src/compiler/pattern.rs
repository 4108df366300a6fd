//! 编译后模式模型
//! 正则按需编译：首次使用时才编译，错误在首次使用时暴露
//! 优先使用 regex；含环视、反向引用等回溯语法时退回 fancy-regex

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{UrouteError, UrouteResult};

/// 匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// 从字符串开头锚定，忽略大小写（urlPattern/exceptions/redirections/rules）
    AnchoredIgnoreCase,
    /// 全文查找，区分大小写（rawRules 全局替换）
    Search,
}

/// 编译结果：线性时间引擎或回溯引擎
#[derive(Debug, Clone)]
pub enum CompiledRegex {
    Standard(Regex),
    Backtracking(fancy_regex::Regex),
}

impl CompiledRegex {
    pub fn is_backtracking(&self) -> bool {
        matches!(self, CompiledRegex::Backtracking(_))
    }

    /// 捕获组数量（含整体匹配）
    pub fn captures_len(&self) -> usize {
        match self {
            CompiledRegex::Standard(regex) => regex.captures_len(),
            CompiledRegex::Backtracking(regex) => regex.captures_len(),
        }
    }

    fn is_match(&self, input: &str) -> Result<bool, fancy_regex::Error> {
        match self {
            CompiledRegex::Standard(regex) => Ok(regex.is_match(input)),
            CompiledRegex::Backtracking(regex) => regex.is_match(input),
        }
    }

    fn group<'t>(&self, input: &'t str, index: usize) -> Result<Option<&'t str>, fancy_regex::Error> {
        match self {
            CompiledRegex::Standard(regex) => Ok(regex
                .captures(input)
                .and_then(|caps| caps.get(index))
                .map(|m| m.as_str())),
            CompiledRegex::Backtracking(regex) => Ok(regex
                .captures(input)?
                .and_then(|caps| caps.get(index))
                .map(|m| m.as_str())),
        }
    }

    /// 所有匹配区间（按出现顺序，互不重叠）
    fn match_ranges(&self, input: &str) -> Result<Vec<(usize, usize)>, fancy_regex::Error> {
        match self {
            CompiledRegex::Standard(regex) => {
                Ok(regex.find_iter(input).map(|m| (m.start(), m.end())).collect())
            }
            CompiledRegex::Backtracking(regex) => regex
                .find_iter(input)
                .map(|m| m.map(|m| (m.start(), m.end())))
                .collect(),
        }
    }
}

/// 惰性编译的正则模式
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    mode: MatchMode,
    compiled: OnceCell<Result<CompiledRegex, String>>,
}

impl Pattern {
    pub fn new(source: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            source: source.into(),
            mode,
            compiled: OnceCell::new(),
        }
    }

    /// 锚定 + 忽略大小写模式
    pub fn anchored(source: impl Into<String>) -> Self {
        Self::new(source, MatchMode::AnchoredIgnoreCase)
    }

    /// 全文查找模式
    pub fn search(source: impl Into<String>) -> Self {
        Self::new(source, MatchMode::Search)
    }

    /// 原始正则文本
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 获取编译后的正则（首次调用时编译，失败只告警一次）
    pub fn regex(&self) -> UrouteResult<&CompiledRegex> {
        let compiled = self.compiled.get_or_init(|| {
            let result = Self::build(&self.source, self.mode);
            match &result {
                Ok(regex) if regex.is_backtracking() => {
                    debug!("正则使用回溯引擎编译：{}", self.source);
                }
                Ok(_) => {}
                Err(message) => warn!("正则编译失败，已跳过：{}，原因：{}", self.source, message),
            }
            result
        });

        match compiled {
            Ok(regex) => Ok(regex),
            Err(message) => Err(self.error(message.clone())),
        }
    }

    /// 判断是否匹配（锚定模式下仅从开头匹配）
    pub fn is_match(&self, input: &str) -> UrouteResult<bool> {
        self.regex()?
            .is_match(input)
            .map_err(|e| self.error(e.to_string()))
    }

    /// 取第 `index` 个捕获组；未匹配或该组未参与匹配时返回 None
    pub fn group<'t>(&self, input: &'t str, index: usize) -> UrouteResult<Option<&'t str>> {
        self.regex()?
            .group(input, index)
            .map_err(|e| self.error(e.to_string()))
    }

    /// 删除所有匹配；没有任何匹配时返回 None
    pub fn remove_all(&self, input: &str) -> UrouteResult<Option<String>> {
        let ranges = self
            .regex()?
            .match_ranges(input)
            .map_err(|e| self.error(e.to_string()))?;
        if ranges.is_empty() {
            return Ok(None);
        }

        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for (start, end) in ranges {
            output.push_str(&input[last..start]);
            last = end;
        }
        output.push_str(&input[last..]);
        Ok(Some(output))
    }

    /// 是否已编译（无论成功与否）
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    fn error(&self, message: String) -> UrouteError {
        UrouteError::PatternError {
            pattern: self.source.clone(),
            message,
        }
    }

    fn build(source: &str, mode: MatchMode) -> Result<CompiledRegex, String> {
        match Self::build_standard(source, mode) {
            Ok(regex) => Ok(CompiledRegex::Standard(regex)),
            Err(standard_err) => Self::build_backtracking(source, mode)
                .map(CompiledRegex::Backtracking)
                .map_err(|_| standard_err.to_string()),
        }
    }

    fn build_standard(source: &str, mode: MatchMode) -> Result<Regex, regex::Error> {
        match mode {
            MatchMode::AnchoredIgnoreCase => {
                // 先单独校验原始文本，避免未闭合括号在包裹后改变语义
                RegexBuilder::new(source).case_insensitive(true).build()?;
                RegexBuilder::new(&format!("^(?:{})", source))
                    .case_insensitive(true)
                    .build()
            }
            MatchMode::Search => Regex::new(source),
        }
    }

    fn build_backtracking(source: &str, mode: MatchMode) -> Result<fancy_regex::Regex, fancy_regex::Error> {
        match mode {
            MatchMode::AnchoredIgnoreCase => {
                fancy_regex::Regex::new(source)?;
                fancy_regex::Regex::new(&format!("(?i)^(?:{})", source))
            }
            MatchMode::Search => fancy_regex::Regex::new(source),
        }
    }
}

/// 编译后的 Provider
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pub url_pattern: Pattern,
    pub exceptions: Vec<Pattern>,
    pub redirections: Vec<Pattern>,
    /// rules 与 referralMarketing 的并集，作用于查询参数名
    pub query_rules: Vec<Pattern>,
    pub raw_rules: Vec<Pattern>,
}

impl Provider {
    /// 遍历该 Provider 的全部模式
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        std::iter::once(&self.url_pattern)
            .chain(self.exceptions.iter())
            .chain(self.redirections.iter())
            .chain(self.query_rules.iter())
            .chain(self.raw_rules.iter())
    }
}

/// 编译后的规则集，加载后不可变，可跨线程只读共享
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    providers: Vec<Provider>,
}

impl RuleSet {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// 空规则集（清理退化为原样返回）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_pattern_matches_only_at_start() {
        let pattern = Pattern::anchored(r"example\.com");
        assert!(pattern.is_match("example.com/path").unwrap());
        assert!(pattern.is_match("EXAMPLE.COM").unwrap());
        assert!(!pattern.is_match("https://example.com").unwrap());
    }

    #[test]
    fn test_anchored_alternation_stays_anchored() {
        let pattern = Pattern::anchored("foo|bar");
        assert!(pattern.is_match("bar-baz").unwrap());
        assert!(!pattern.is_match("xbar").unwrap());
    }

    #[test]
    fn test_search_pattern_is_case_sensitive_and_unanchored() {
        let pattern = Pattern::search("ref=[^&]*");
        assert!(pattern.is_match("https://a.b/x?ref=1").unwrap());
        assert!(!pattern.is_match("https://a.b/x?REF=1").unwrap());
        assert!(!pattern.regex().unwrap().is_backtracking());
    }

    #[test]
    fn test_lookahead_uses_backtracking_engine() {
        let pattern = Pattern::search("/amp(?=/|$)");
        assert!(pattern.regex().unwrap().is_backtracking());
        assert_eq!(
            pattern.remove_all("https://news.example/a/amp").unwrap().as_deref(),
            Some("https://news.example/a")
        );
        assert_eq!(
            pattern.remove_all("https://news.example/amp/b/amper").unwrap().as_deref(),
            Some("https://news.example/b/amper")
        );
    }

    #[test]
    fn test_backtracking_anchored_pattern() {
        let pattern = Pattern::anchored("(?!ref)[a-z]+_id");
        assert!(pattern.is_match("USER_ID").unwrap());
        assert!(!pattern.is_match("ref_id").unwrap());
        assert!(!pattern.is_match("x-user_id").unwrap());

        let backref = Pattern::anchored(r"(\w)\1");
        assert!(backref.is_match("AAb").unwrap());
        assert!(!backref.is_match("ab").unwrap());
    }

    #[test]
    fn test_group_and_remove_all() {
        let pattern = Pattern::anchored(r"https://a\.b/\?u=([^&]+)");
        assert_eq!(pattern.group("https://a.b/?u=x&y", 1).unwrap(), Some("x"));
        assert_eq!(pattern.group("https://c.d/?u=x", 1).unwrap(), None);
        assert_eq!(pattern.group("https://a.b/?u=x", 2).unwrap(), None);
        assert_eq!(pattern.regex().unwrap().captures_len(), 2);

        let raw = Pattern::search("-x");
        assert_eq!(raw.remove_all("a-xb-x").unwrap().as_deref(), Some("ab"));
        assert_eq!(raw.remove_all("abc").unwrap(), None);
    }

    #[test]
    fn test_invalid_pattern_reports_error_lazily() {
        let pattern = Pattern::anchored("(unclosed");
        assert!(!pattern.is_compiled());

        let err = pattern.is_match("anything").unwrap_err();
        assert!(matches!(err, UrouteError::PatternError { ref pattern, .. } if pattern == "(unclosed"));
        assert!(pattern.is_compiled());
        // 再次使用仍返回同样的错误
        assert!(pattern.regex().is_err());
    }

    #[test]
    fn test_unbalanced_close_paren_is_rejected() {
        let pattern = Pattern::anchored("a)|(b");
        assert!(pattern.regex().is_err());
    }

    #[test]
    fn test_escaped_slash_is_accepted() {
        let pattern = Pattern::anchored(r"https?:\/\/redir\.to\/");
        assert!(pattern.is_match("https://redir.to/x").unwrap());
    }
}
