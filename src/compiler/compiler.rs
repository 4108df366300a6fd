//! 规则编译器核心
//! 将原始规则数据转换为可执行的规则集（正则惰性编译）

use std::time::Instant;
use tracing::debug;

use super::pattern::{Pattern, Provider, RuleSet};
use crate::error::UrouteError;
use crate::rule::{ProviderRule, RuleData};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则数据，保持 Provider 的文档顺序
    ///
    /// 此处不校验正则语法，非法正则在首次使用时才报错。
    pub fn compile(rule_data: &RuleData) -> RuleSet {
        let providers = rule_data
            .providers
            .iter()
            .map(|(name, rule)| Self::compile_provider(name, rule))
            .collect::<Vec<_>>();

        debug!("规则集构建完成，Provider数：{}", providers.len());
        RuleSet::new(providers)
    }

    /// 编译单个 Provider
    fn compile_provider(name: &str, rule: &ProviderRule) -> Provider {
        let anchored = |patterns: &[String]| -> Vec<Pattern> {
            patterns.iter().map(Pattern::anchored).collect()
        };

        let mut query_rules = anchored(&rule.rules);
        query_rules.extend(anchored(&rule.referral_marketing));

        Provider {
            name: name.to_string(),
            url_pattern: Pattern::anchored(rule.url_pattern.as_str()),
            exceptions: anchored(&rule.exceptions),
            redirections: anchored(&rule.redirections),
            query_rules,
            raw_rules: rule.raw_rules.iter().map(Pattern::search).collect(),
        }
    }

    /// 立即编译规则集中的全部正则，返回统计信息（用于诊断）
    pub fn validate(rule_set: &RuleSet) -> CompileStats {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        for provider in rule_set.providers() {
            stats.provider_count += 1;
            for pattern in provider.patterns() {
                stats.pattern_count += 1;
                match pattern.regex() {
                    Ok(regex) if regex.is_backtracking() => stats.backtracking_count += 1,
                    Ok(_) => {}
                    Err(UrouteError::PatternError { pattern, message }) => {
                        stats.failures.push(PatternFailure {
                            provider: provider.name.clone(),
                            pattern,
                            message,
                        });
                    }
                    Err(_) => {}
                }
            }
        }

        debug!(
            "规则校验完成，耗时{:?}，Provider{}个、正则{}条（回溯引擎{}条）、失败{}条",
            start.elapsed(),
            stats.provider_count,
            stats.pattern_count,
            stats.backtracking_count,
            stats.failures.len()
        );

        stats
    }
}

/// 编译失败的正则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFailure {
    pub provider: String,
    pub pattern: String,
    pub message: String,
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    pub provider_count: usize,
    pub pattern_count: usize,
    /// 需要回溯引擎（环视、反向引用等）的正则数
    pub backtracking_count: usize,
    pub failures: Vec<PatternFailure>,
}
