//! URL提取器
//! 从任意文本（剪贴板、标准输入等）中找出第一个 http/https URL

use once_cell::sync::Lazy;
use regex::Regex;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://\S+").expect("URL提取正则必须合法")
});

/// 提取文本中的第一个 URL，未找到返回 None
pub fn extract_url(contents: &str) -> Option<&str> {
    URL_REGEX.find(contents).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_url() {
        assert_eq!(extract_url("see http://a.b/c and more"), Some("http://a.b/c"));
        assert_eq!(
            extract_url("two: https://x.y/1?q=2 https://z/3"),
            Some("https://x.y/1?q=2")
        );
    }

    #[test]
    fn test_extract_stops_at_whitespace() {
        assert_eq!(extract_url("https://a.b/c\tnext"), Some("https://a.b/c"));
        assert_eq!(extract_url("line\nhttps://a.b/\nline"), Some("https://a.b/"));
    }

    #[test]
    fn test_extract_not_found() {
        assert_eq!(extract_url("no link here"), None);
        assert_eq!(extract_url("ftp://files.example/x"), None);
        assert_eq!(extract_url("https://"), None);
        assert_eq!(extract_url(""), None);
    }

    #[test]
    fn test_extract_is_case_sensitive_on_scheme() {
        assert_eq!(extract_url("HTTP://A.B/"), None);
    }
}
