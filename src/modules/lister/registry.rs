use super::models::ProgramRecord;
use crate::modules::registry::{Hive, RegistryBackend, RegistryView};

/// Uninstall 注册表路径列表
pub const UNINSTALL_KEYS: [(Hive, &str); 3] = [
    (Hive::LocalMachine, r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall"),
    (
        Hive::LocalMachine,
        r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    ),
    (Hive::CurrentUser, r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall"),
];

/// 从注册表读取已安装程序
pub fn list_registry_programs(registry: &dyn RegistryBackend) -> Vec<ProgramRecord> {
    let mut programs = Vec::new();

    for (hive, path) in UNINSTALL_KEYS {
        let names = match registry.subkeys(hive, path, RegistryView::Default) {
            Ok(names) => names,
            Err(e) => {
                tracing::debug!("无法打开注册表路径 {}: {}", path, e);
                continue;
            }
        };

        for name in names {
            let subpath = format!("{}\\{}", path, name);
            if let Some(program) = parse_registry_entry(registry, hive, &subpath) {
                programs.push(program);
            }
        }
    }

    programs
}

/// 解析注册表项
fn parse_registry_entry(
    registry: &dyn RegistryBackend,
    hive: Hive,
    path: &str,
) -> Option<ProgramRecord> {
    let read = |name: &str| {
        registry
            .read_string(hive, path, RegistryView::Default, name)
            .filter(|value| !value.trim().is_empty())
    };

    // 必须有 DisplayName
    let name = read("DisplayName")?;

    // 跳过以 KB 开头的补丁
    if name.starts_with("KB") || name.to_lowercase().contains("security update") {
        return None;
    }

    Some(ProgramRecord {
        name,
        publisher: read("Publisher"),
        version: read("DisplayVersion"),
        install_location: read("InstallLocation"),
        uninstall_string: read("UninstallString"),
        registry_key: Some(hive.join(path)),
    })
}
