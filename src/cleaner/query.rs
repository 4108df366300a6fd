//! URL 组件拆分与查询参数过滤
//! 按 scheme/authority/path/params/query/fragment 拆分，不做任何规范化，
//! 未修改的组件原样拼回

use std::borrow::Cow;
use url::form_urlencoded;

use crate::compiler::Pattern;
use crate::error::UrouteResult;

/// URL 的各组成部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub params: Option<&'a str>,
    pub query: Option<Cow<'a, str>>,
    pub fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// 拆分 URL（宽松解析，任何输入都能拆分）
    pub fn split(url: &'a str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };

        let (scheme, rest) = match rest.split_once(':') {
            Some((scheme, after)) if is_scheme(scheme) => (Some(scheme), after),
            _ => (None, rest),
        };

        let (authority, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?']).unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };

        let (path_and_params, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(Cow::Borrowed(query))),
            None => (rest, None),
        };

        // params 仅出现在最后一个路径段
        let last_segment = path_and_params.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (path, params) = match path_and_params[last_segment..].find(';') {
            Some(i) => {
                let split_at = last_segment + i;
                (&path_and_params[..split_at], Some(&path_and_params[split_at + 1..]))
            }
            None => (path_and_params, None),
        };

        Self { scheme, authority, path, params, query, fragment }
    }

    /// 拼回完整 URL
    pub fn join(&self) -> String {
        let mut url = String::new();
        if let Some(scheme) = self.scheme {
            url.push_str(scheme);
            url.push(':');
        }
        if let Some(authority) = self.authority {
            url.push_str("//");
            url.push_str(authority);
        }
        url.push_str(self.path);
        if let Some(params) = self.params {
            url.push(';');
            url.push_str(params);
        }
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        if let Some(fragment) = self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// 查询参数过滤结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    /// 重新编码后的查询串；None 表示没有剩余参数
    pub query: Option<String>,
    /// 命中规则被移除的参数数
    pub removed: usize,
}

/// 移除名称匹配任一规则的查询参数，保持其余参数的顺序与重复项，并重新编码
///
/// 值为空的参数（`flag`、`a=`）不保留。`matches` 对单个规则与参数名求值，其错误原样向上传递。
pub fn filter_query<F>(query: &str, rules: &[Pattern], mut matches: F) -> UrouteResult<QueryFilter>
where
    F: FnMut(&Pattern, &str) -> UrouteResult<bool>,
{
    let mut removed = 0;
    let mut kept: Vec<(Cow<str>, Cow<str>)> = Vec::new();

    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }

        let mut hit = false;
        for rule in rules {
            if matches(rule, &*name)? {
                hit = true;
                break;
            }
        }

        if hit {
            removed += 1;
        } else {
            kept.push((name, value));
        }
    }

    if kept.is_empty() {
        return Ok(QueryFilter { query: None, removed });
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept)
        .finish();
    Ok(QueryFilter { query: Some(query), removed })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(query: &str, rules: &[&str]) -> QueryFilter {
        let rules: Vec<Pattern> = rules.iter().map(|r| Pattern::anchored(*r)).collect();
        filter_query(query, &rules, |rule, name| Ok(rule.is_match(name).unwrap_or(false))).unwrap()
    }

    #[test]
    fn test_split_full_url() {
        let parts = UrlParts::split("https://user@example.com:8080/a/b;p=1?x=1&y=2#frag");
        assert_eq!(parts.scheme, Some("https"));
        assert_eq!(parts.authority, Some("user@example.com:8080"));
        assert_eq!(parts.path, "/a/b");
        assert_eq!(parts.params, Some("p=1"));
        assert_eq!(parts.query.as_deref(), Some("x=1&y=2"));
        assert_eq!(parts.fragment, Some("frag"));
    }

    #[test]
    fn test_split_join_is_lossless() {
        for url in [
            "https://example.com",
            "https://example.com/?",
            "https://example.com/path#",
            "http://a.b/c;d/e?f#g?h",
            "mailto:someone@example.com",
            "no scheme at all",
            "https://example.com?q=1",
        ] {
            assert_eq!(UrlParts::split(url).join(), url);
        }
    }

    #[test]
    fn test_fragment_question_mark_is_not_query() {
        let parts = UrlParts::split("https://a.b/p#x?y=1");
        assert_eq!(parts.query, None);
        assert_eq!(parts.fragment, Some("x?y=1"));
    }

    #[test]
    fn test_filter_removes_matching_names_in_order() {
        let result = strip("utm_source=x&id=5&UTM_medium=y&id=6", &["utm_"]);
        assert_eq!(result.removed, 2);
        assert_eq!(result.query.as_deref(), Some("id=5&id=6"));
    }

    #[test]
    fn test_filter_is_anchored() {
        let result = strip("my_utm_source=x", &["utm_"]);
        assert_eq!(result.removed, 0);
        assert_eq!(result.query.as_deref(), Some("my_utm_source=x"));
    }

    #[test]
    fn test_filter_always_reencodes_and_drops_blank_values() {
        let result = strip("q=a%20b&flag&empty=&k=v", &["utm_"]);
        assert_eq!(result.removed, 0);
        assert_eq!(result.query.as_deref(), Some("q=a+b&k=v"));

        let result = strip("flag&empty=", &[]);
        assert_eq!(result.query, None);
    }

    #[test]
    fn test_filter_everything_removed() {
        let result = strip("fbclid=1&gclid=2", &["fbclid", "gclid"]);
        assert_eq!(result.removed, 2);
        assert_eq!(result.query, None);
    }

    #[test]
    fn test_filter_reencodes_remaining_pairs() {
        let result = strip("q=a%20b&ref=1&x=%26", &["ref"]);
        assert_eq!(result.query.as_deref(), Some("q=a+b&x=%26"));
    }

    #[test]
    fn test_filter_skips_broken_rule() {
        let result = strip("a=1&b=2", &["((", "b"]);
        assert_eq!(result.query.as_deref(), Some("a=1"));
    }

    #[test]
    fn test_filter_propagates_errors_when_asked() {
        let rules = vec![Pattern::anchored("((")];
        let result = filter_query("a=1", &rules, |rule, name| rule.is_match(name));
        assert!(result.is_err());
    }
}
