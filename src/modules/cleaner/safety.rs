use std::sync::OnceLock;

use crate::modules::common::error::UninstallerError;
use crate::modules::registry::parse_registry_path;
use crate::modules::scanner::models::{Leftover, LeftoverKind};

/// 文件系统保护名单
///
/// 系统目录取自 `%SystemRoot%` 等环境变量，C: 盘的默认位置始终保留。
#[derive(Debug)]
struct PathGuard {
    /// 自身及其下所有内容
    subtrees: Vec<String>,
    /// 只保护自身、不保护其子项
    roots: Vec<String>,
}

impl PathGuard {
    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut guard = Self {
            subtrees: Vec::new(),
            roots: Vec::new(),
        };
        guard.extend(&|_: &str| -> Option<String> { None });
        guard.extend(&lookup);
        guard
    }

    fn extend(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        let dir = |name: &str, default: &str| {
            lookup(name)
                .map(|value| value.trim().trim_end_matches('\\').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let windows = dir("SystemRoot", r"C:\Windows");
        let drive = dir("SystemDrive", "C:");

        for path in [
            windows.clone(),
            format!(r"{}\System32", windows),
            format!(r"{}\SysWOW64", windows),
            format!(r"{}\WinSxS", windows),
            format!(r"{}\Boot", drive),
            format!(r"{}\Recovery", drive),
        ] {
            push_unique(&mut self.subtrees, path);
        }

        for path in [
            drive.clone(),
            dir("ProgramFiles", r"C:\Program Files"),
            dir("ProgramFiles(x86)", r"C:\Program Files (x86)"),
            dir("ProgramData", r"C:\ProgramData"),
            format!(r"{}\Users", drive),
        ] {
            push_unique(&mut self.roots, path);
        }
    }

    fn is_critical(&self, path: &str) -> bool {
        let normalized = path.replace('/', "\\");
        let normalized = normalized.trim_end_matches('\\').to_uppercase();

        matches_protected(&normalized, &self.subtrees, &self.roots)
    }
}

fn push_unique(list: &mut Vec<String>, path: String) {
    let path = path.to_uppercase();
    if !list.contains(&path) {
        list.push(path);
    }
}

fn path_guard() -> &'static PathGuard {
    static GUARD: OnceLock<PathGuard> = OnceLock::new();
    GUARD.get_or_init(|| PathGuard::from_env(|name| std::env::var(name).ok()))
}

/// 关键注册表路径黑名单 (自身及其下所有内容)
const CRITICAL_REGISTRY_PATHS: &[&str] = &[
    r"HKEY_LOCAL_MACHINE\SYSTEM",
    r"HKEY_LOCAL_MACHINE\BOOT",
    r"HKEY_LOCAL_MACHINE\SAM",
    r"HKEY_LOCAL_MACHINE\SECURITY",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Run",
];

/// 只保护自身的注册表键
const PROTECTED_REGISTRY_ROOTS: &[&str] = &[
    r"HKEY_LOCAL_MACHINE\SOFTWARE",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\WOW6432Node",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes",
    r"HKEY_CURRENT_USER\SOFTWARE",
    r"HKEY_CURRENT_USER\SOFTWARE\Microsoft",
    r"HKEY_CURRENT_USER\SOFTWARE\Classes",
];

/// 删除前检查
pub fn pre_delete_check(leftover: &Leftover) -> Result<(), UninstallerError> {
    let critical = match leftover.kind {
        LeftoverKind::Registry => is_critical_registry(&leftover.path),
        LeftoverKind::File | LeftoverKind::Directory | LeftoverKind::Shortcut => {
            is_critical_path(&leftover.path)
        }
    };

    if critical {
        return Err(UninstallerError::CriticalSystemItem(leftover.path.clone()));
    }

    Ok(())
}

/// 检查是否为关键系统路径
fn is_critical_path(path: &str) -> bool {
    path_guard().is_critical(path)
}

/// 检查是否为关键注册表路径，根键别名先转换为完整名称
fn is_critical_registry(path: &str) -> bool {
    let Some((hive, subpath)) = parse_registry_path(path) else {
        return false;
    };

    matches_protected(
        &hive.join(subpath).to_uppercase(),
        CRITICAL_REGISTRY_PATHS,
        PROTECTED_REGISTRY_ROOTS,
    )
}

fn matches_protected<S: AsRef<str>>(candidate: &str, subtrees: &[S], roots: &[S]) -> bool {
    let is_root = roots
        .iter()
        .any(|root| candidate == root.as_ref().trim_end_matches('\\').to_uppercase());

    is_root
        || subtrees.iter().any(|critical| {
            let critical = critical.as_ref().to_uppercase();
            candidate == critical
                || candidate
                    .strip_prefix(&critical)
                    .map(|rest| rest.starts_with('\\'))
                    .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(kind: LeftoverKind, path: &str) -> bool {
        pre_delete_check(&Leftover::new(kind, path)).is_ok()
    }

    #[test]
    fn system_directories_are_refused() {
        assert!(!check(LeftoverKind::Directory, r"C:\Windows"));
        assert!(!check(LeftoverKind::File, r"c:\windows\system32\drivers\etc\hosts"));
        assert!(!check(LeftoverKind::Directory, r"C:\Program Files\"));
        assert!(check(LeftoverKind::Directory, r"C:\Program Files\Acme"));
        assert!(check(LeftoverKind::Directory, r"C:\WindowsApps2\Acme"));
    }

    #[test]
    fn system_directories_follow_the_environment() {
        let guard = PathGuard::from_env(|name| match name {
            "SystemRoot" => Some(r"D:\WINDOWS\".to_string()),
            "SystemDrive" => Some("D:".to_string()),
            "ProgramFiles" => Some(r"D:\Program Files".to_string()),
            _ => None,
        });

        assert!(guard.is_critical(r"D:\Windows\System32\drivers"));
        assert!(guard.is_critical(r"D:\Program Files"));
        assert!(guard.is_critical(r"D:\Users"));
        assert!(!guard.is_critical(r"D:\Program Files\Acme"));
        // 默认位置仍然受保护
        assert!(guard.is_critical(r"C:\Windows\WinSxS"));
        assert!(guard.is_critical(r"C:\ProgramData"));
        assert!(!guard.is_critical(r"E:\Windows"));
    }

    #[test]
    fn registry_roots_are_refused_under_any_alias() {
        assert!(!check(LeftoverKind::Registry, r"HKLM\Software"));
        assert!(!check(LeftoverKind::Registry, r"hklm\SYSTEM\CurrentControlSet"));
        assert!(!check(LeftoverKind::Registry, r"HKEY_CURRENT_USER\Software\Microsoft"));
        assert!(check(LeftoverKind::Registry, r"HKCU\Software\Acme"));
        assert!(check(LeftoverKind::Registry, r"HKLM\Software\Microsoft\AcmeTool"));
    }

    #[test]
    fn refusal_names_the_item() {
        let err = pre_delete_check(&Leftover::new(LeftoverKind::Registry, r"HKLM\SAM\Domains"))
            .unwrap_err();
        assert_eq!(err.to_string(), r"Critical system item: HKLM\SAM\Domains");
    }
}
