use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::modules::lister::models::ProgramRecord;

/// 模式最短长度，过短的名称会匹配到大量无关项
pub const MIN_PATTERN_LEN: usize = 3;

fn version_regex() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"\s+\d+(\.\d+)*").expect("version regex is valid"))
}

/// 由程序名称和发布者派生的搜索模式集合 (全部小写)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: BTreeSet<String>,
}

impl PatternSet {
    /// 生成搜索模式
    ///
    /// 名称原样小写、去掉版本号后的小写形式 (若不同) 以及发布者小写形式。
    /// 空集合表示"什么都不匹配"。
    pub fn generate(program: &ProgramRecord) -> Self {
        let mut candidates = Vec::new();

        let name = program.name.to_lowercase();
        if !name.trim().is_empty() {
            let without_version = version_regex().replace_all(&program.name, "").to_lowercase();
            if without_version != name {
                candidates.push(without_version);
            }
            candidates.push(name);
        }

        if let Some(publisher) = &program.publisher {
            candidates.push(publisher.to_lowercase());
        }

        let patterns = candidates
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| p.chars().count() >= MIN_PATTERN_LEN)
            .collect();

        let set = Self { patterns };
        tracing::debug!("搜索模式: {:?}", set.patterns);
        set
    }

    /// 名称 (已小写) 是否包含任一模式
    pub fn matches(&self, name_lower: &str) -> bool {
        self.patterns.iter().any(|p| name_lower.contains(p.as_str()))
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }
}
