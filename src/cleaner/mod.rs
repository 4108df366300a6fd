//! 清理模块：按规则集清理URL
pub mod query;
pub mod url_cleaner;

pub use self::query::{filter_query, QueryFilter, UrlParts};
pub use self::url_cleaner::{clean_url, UrlCleaner, MAX_REDIRECT_DEPTH};
