//! URL 清理核心
//! 按文档顺序应用 Provider：例外短路、跳转目标提取（可递归）、查询参数过滤、rawRules 替换

use std::borrow::Cow;
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use super::query::{filter_query, UrlParts};
use crate::compiler::{Pattern, Provider, RuleSet};
use crate::error::{UrouteError, UrouteResult};

/// 跳转递归层数上限
pub const MAX_REDIRECT_DEPTH: usize = 10;

/// 单个 Provider 的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProviderOutcome {
    /// 未匹配或命中例外
    Skipped,
    /// 提取到跳转目标（已解码）
    Redirect(String),
    /// 查询参数 / rawRules 清理后的 URL
    Cleaned(String),
}

/// URL 清理器
///
/// 只读借用规则集，无内部可变状态，可在多线程间并发使用。
#[derive(Debug, Clone)]
pub struct UrlCleaner<'a> {
    rule_set: &'a RuleSet,
    recurse_redirections: bool,
    strict: bool,
    max_depth: usize,
}

impl<'a> UrlCleaner<'a> {
    /// 创建清理器（默认递归清理跳转目标、容错模式）
    pub fn new(rule_set: &'a RuleSet) -> Self {
        Self {
            rule_set,
            recurse_redirections: true,
            strict: false,
            max_depth: MAX_REDIRECT_DEPTH,
        }
    }

    /// 是否递归清理跳转目标
    pub fn recurse_redirections(mut self, recurse: bool) -> Self {
        self.recurse_redirections = recurse;
        self
    }

    /// 严格模式：非法正则与跳转目标解码失败直接返回错误，而不是跳过
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 清理 URL
    ///
    /// 跳转层数超限时返回 `RedirectLoopError`，其中带有最后一跳的 URL。
    pub fn clean(&self, url: &str) -> UrouteResult<String> {
        self.clean_hop(url, 0)
    }

    /// 清理 URL，跳转层数超限时返回最后一跳的 URL
    pub fn clean_or_last(&self, url: &str) -> UrouteResult<String> {
        match self.clean(url) {
            Err(UrouteError::RedirectLoopError { depth, last_url }) => {
                warn!("跳转层数超过上限 {}，停止于：{}", depth, last_url);
                Ok(last_url)
            }
            other => other,
        }
    }

    fn clean_hop(&self, url: &str, hops: usize) -> UrouteResult<String> {
        let mut url = url.to_string();

        for provider in self.rule_set.providers() {
            match self.apply_provider(provider, &url)? {
                ProviderOutcome::Skipped => {}
                ProviderOutcome::Cleaned(cleaned) => url = cleaned,
                ProviderOutcome::Redirect(target) => {
                    debug!("Provider [{}] 提取到跳转目标：{}", provider.name, target);
                    if !self.recurse_redirections {
                        return Ok(target);
                    }
                    if hops >= self.max_depth {
                        return Err(UrouteError::RedirectLoopError {
                            depth: self.max_depth,
                            last_url: target,
                        });
                    }
                    return self.clean_hop(&target, hops + 1);
                }
            }
        }

        Ok(url)
    }

    fn apply_provider(&self, provider: &Provider, url: &str) -> UrouteResult<ProviderOutcome> {
        // 1. urlPattern 不匹配则跳过
        match self.check(&provider.url_pattern, url)? {
            Some(true) => {}
            _ => return Ok(ProviderOutcome::Skipped),
        }

        // 2. 命中任一例外则整个 Provider 跳过；例外无法判定时同样跳过
        for exception in &provider.exceptions {
            match self.check(exception, url)? {
                Some(false) => {}
                _ => return Ok(ProviderOutcome::Skipped),
            }
        }

        // 3. 跳转目标提取，第一个可用的捕获生效
        for redirection in &provider.redirections {
            if let Some(target) = self.extract_redirect(redirection, url)? {
                return Ok(ProviderOutcome::Redirect(target));
            }
        }

        // 4. 拆分查询参数，移除命中规则的参数后重新编码
        let mut cleaned = Cow::Borrowed(url);
        let mut parts = UrlParts::split(url);
        if let Some(query) = parts.query.take() {
            let filtered = filter_query(&query, &provider.query_rules, |rule, name| {
                Ok(self.check(rule, name)?.unwrap_or(false))
            })?;
            if filtered.removed > 0 {
                debug!("Provider [{}] 移除查询参数{}个", provider.name, filtered.removed);
            }
            parts.query = filtered.query.map(Cow::Owned);
            cleaned = Cow::Owned(parts.join());
        }

        // 5. rawRules 全局替换为空
        for raw_rule in &provider.raw_rules {
            if let Some(Some(replaced)) = self.tolerate(raw_rule.remove_all(&cleaned))? {
                cleaned = Cow::Owned(replaced);
            }
        }

        Ok(ProviderOutcome::Cleaned(cleaned.into_owned()))
    }

    /// 尝试从 URL 中提取跳转目标
    ///
    /// 缺少第一个捕获组的规则视为不匹配；解码失败同样视为不匹配（严格模式下报错）。
    fn extract_redirect(&self, redirection: &Pattern, url: &str) -> UrouteResult<Option<String>> {
        let Some(regex) = self.tolerate(redirection.regex())? else {
            return Ok(None);
        };
        if regex.captures_len() < 2 {
            debug!("跳转规则没有捕获组，已跳过：{}", redirection.as_str());
            return Ok(None);
        }
        let Some(Some(captured)) = self.tolerate(redirection.group(url, 1))? else {
            return Ok(None);
        };

        if captured.is_empty() || captured == url {
            return Ok(None);
        }

        match percent_decode_str(captured).decode_utf8() {
            Ok(target) => Ok(Some(target.into_owned())),
            Err(e) => {
                let err = UrouteError::DecodeError(format!("{}：{}", captured, e));
                if self.strict {
                    return Err(err);
                }
                debug!("{}", err);
                Ok(None)
            }
        }
    }

    /// 判断模式是否匹配；正则非法时返回 None（严格模式下报错）
    fn check(&self, pattern: &Pattern, input: &str) -> UrouteResult<Option<bool>> {
        self.tolerate(pattern.is_match(input))
    }

    /// 容错模式下把正则错误降级为 None
    fn tolerate<T>(&self, result: UrouteResult<T>) -> UrouteResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!("{}", e);
                Ok(None)
            }
        }
    }
}

/// 使用规则集清理 URL（容错模式）
pub fn clean_url(rule_set: &RuleSet, url: &str, recurse_redirections: bool) -> UrouteResult<String> {
    UrlCleaner::new(rule_set)
        .recurse_redirections(recurse_redirections)
        .clean(url)
}
