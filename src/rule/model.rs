//! 规则数据模型定义
//! 仅存储 ClearURLs 规则文件的原始数据，无任何业务逻辑

use std::fmt;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// 单个 Provider 的原始规则（从 ClearURLs JSON 解析）
///
/// 所有字段均可缺省，缺省值为空。
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRule {
    #[serde(default)]
    pub url_pattern: String,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub redirections: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub referral_marketing: Vec<String>,
    #[serde(default)]
    pub raw_rules: Vec<String>,
}

/// 完整规则数据，providers 保持文档中的顺序
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RuleData {
    #[serde(deserialize_with = "deserialize_ordered_providers")]
    pub providers: Vec<(String, ProviderRule)>,
}

impl RuleData {
    /// Provider 数量
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ======== 按文档顺序反序列化 providers 映射 ========
fn deserialize_ordered_providers<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, ProviderRule)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedProvidersVisitor;

    impl<'de> Visitor<'de> for OrderedProvidersVisitor {
        type Value = Vec<(String, ProviderRule)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of provider name to provider rules")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut providers: Vec<(String, ProviderRule)> =
                Vec::with_capacity(map.size_hint().unwrap_or(0));

            while let Some((name, rule)) = map.next_entry::<String, ProviderRule>()? {
                // 重名时后者覆盖前者，保留首次出现的位置
                match providers.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(slot) => slot.1 = rule,
                    None => providers.push((name, rule)),
                }
            }

            Ok(providers)
        }
    }

    deserializer.deserialize_map(OrderedProvidersVisitor)
}
