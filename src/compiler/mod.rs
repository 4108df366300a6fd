//! 编译模块：将原始规则数据转换为惰性编译的规则集
pub mod pattern;
pub mod compiler;

pub use self::pattern::{CompiledRegex, MatchMode, Pattern, Provider, RuleSet};
pub use self::compiler::{CompileStats, PatternFailure, RuleCompiler};
