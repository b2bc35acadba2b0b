pub mod models;
pub mod registry;

use crate::modules::common::utils;
use crate::modules::registry::RegistryBackend;
use models::ProgramRecord;

/// 列出所有已安装程序 (按名称去重并排序)
pub fn list_programs(registry: &dyn RegistryBackend, search: Option<&str>) -> Vec<ProgramRecord> {
    let mut programs = registry::list_registry_programs(registry);
    dedupe_and_sort(&mut programs);

    if let Some(query) = search {
        programs.retain(|program| {
            utils::fuzzy_score(&program.name, query).is_some()
                || program
                    .publisher
                    .as_deref()
                    .map(|publisher| utils::fuzzy_score(publisher, query).is_some())
                    .unwrap_or(false)
        });
    }

    programs
}

/// 按名称查找程序: 完全匹配 > 包含 > 模糊匹配得分最高者
pub fn find_program<'a>(programs: &'a [ProgramRecord], query: &str) -> Option<&'a ProgramRecord> {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return None;
    }

    programs
        .iter()
        .find(|p| p.name.to_lowercase() == query_lower)
        .or_else(|| {
            programs
                .iter()
                .find(|p| p.name.to_lowercase().contains(&query_lower))
        })
        .or_else(|| {
            programs
                .iter()
                .filter_map(|p| utils::fuzzy_score(&p.name, &query_lower).map(|score| (score, p)))
                .max_by_key(|(score, _)| *score)
                .map(|(_, p)| p)
        })
}

fn dedupe_and_sort(programs: &mut Vec<ProgramRecord>) {
    let mut seen = std::collections::HashSet::new();
    programs.retain(|program| seen.insert(program.name.to_lowercase()));
    programs.sort_by(|left, right| left.name.to_lowercase().cmp(&right.name.to_lowercase()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::registry::{Hive, MemoryRegistry};

    fn sample() -> Vec<ProgramRecord> {
        vec![
            ProgramRecord::new("Mozilla Firefox"),
            ProgramRecord::new("Mozilla Firefox ESR"),
            ProgramRecord::new("Visual Studio Code").with_publisher("Microsoft Corporation"),
        ]
    }

    #[test]
    fn exact_name_wins_over_partial() {
        let programs = sample();
        assert_eq!(find_program(&programs, "mozilla firefox").unwrap().name, "Mozilla Firefox");
        assert_eq!(find_program(&programs, "ESR").unwrap().name, "Mozilla Firefox ESR");
    }

    #[test]
    fn fuzzy_lookup_is_last_resort() {
        let programs = sample();
        assert_eq!(find_program(&programs, "vscode").unwrap().name, "Visual Studio Code");
        assert!(find_program(&programs, "   ").is_none());
        assert!(find_program(&programs, "qqqq").is_none());
    }

    #[test]
    fn listing_dedupes_across_uninstall_keys() {
        let registry = MemoryRegistry::new();
        for (hive, base) in registry::UNINSTALL_KEYS {
            registry.set_value(hive, &format!(r"{}\Acme", base), "DisplayName", "Acme Widget");
        }
        registry.set_value(
            Hive::CurrentUser,
            &format!(r"{}\Beta", registry::UNINSTALL_KEYS[2].1),
            "DisplayName",
            "beta tool",
        );

        let programs = list_programs(&registry, None);
        let names: Vec<_> = programs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Widget", "beta tool"]);

        let filtered = list_programs(&registry, Some("beta"));
        assert_eq!(filtered.len(), 1);
    }
}
