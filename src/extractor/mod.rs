//! 提取模块：从文本中提取URL
pub mod url_extractor;

pub use self::url_extractor::extract_url;
