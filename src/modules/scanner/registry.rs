use super::models::{Leftover, LeftoverKind};
use super::patterns::PatternSet;
use crate::modules::registry::{Hive, RegistryBackend, RegistryView};

/// 残留扫描的注册表起点
pub const BASE_KEYS: [(Hive, &str); 3] = [
    (Hive::LocalMachine, "Software"),
    (Hive::CurrentUser, "Software"),
    (Hive::LocalMachine, r"Software\Wow6432Node"),
];

/// 扫描注册表残留
pub fn scan_registry_leftovers(
    registry: &dyn RegistryBackend,
    patterns: &PatternSet,
    max_depth: usize,
    leftovers: &mut Vec<Leftover>,
) {
    if patterns.is_empty() {
        return;
    }

    for (hive, base) in BASE_KEYS {
        scan_registry_key(registry, hive, base, patterns, max_depth, 0, leftovers);
    }
}

/// 递归扫描注册表键，已匹配的子键不再深入
fn scan_registry_key(
    registry: &dyn RegistryBackend,
    hive: Hive,
    path: &str,
    patterns: &PatternSet,
    max_depth: usize,
    depth: usize,
    leftovers: &mut Vec<Leftover>,
) {
    let subkeys = match registry.subkeys(hive, path, RegistryView::Default) {
        Ok(names) => names,
        Err(e) => {
            tracing::debug!("无法打开注册表键 {}: {}", hive.join(path), e);
            return;
        }
    };

    for name in subkeys {
        let subpath = format!("{}\\{}", path, name);

        if patterns.matches(&name.to_lowercase()) {
            leftovers.push(Leftover::new(LeftoverKind::Registry, hive.join(&subpath)));
        } else if depth < max_depth {
            scan_registry_key(registry, hive, &subpath, patterns, max_depth, depth + 1, leftovers);
        }
    }
}
