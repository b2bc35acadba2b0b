use std::io::ErrorKind;

use winreg::enums::*;
use winreg::RegKey;
use winreg::HKEY;

use super::{Hive, KeyState, RegistryBackend, RegistryView};
use crate::modules::common::error::UninstallerError;

/// 基于 winreg 的系统注册表
#[derive(Debug, Clone, Copy, Default)]
pub struct WinRegistry;

fn predef(hive: Hive) -> RegKey {
    let hkey: HKEY = match hive {
        Hive::LocalMachine => HKEY_LOCAL_MACHINE,
        Hive::CurrentUser => HKEY_CURRENT_USER,
        Hive::ClassesRoot => HKEY_CLASSES_ROOT,
        Hive::Users => HKEY_USERS,
        Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
    };
    RegKey::predef(hkey)
}

fn view_flags(view: RegistryView) -> u32 {
    match view {
        RegistryView::View64 => KEY_WOW64_64KEY,
        RegistryView::View32 => KEY_WOW64_32KEY,
        RegistryView::Default => 0,
    }
}

fn map_error(hive: Hive, path: &str, error: std::io::Error) -> UninstallerError {
    match error.kind() {
        ErrorKind::NotFound => UninstallerError::NotFound(hive.join(path)),
        ErrorKind::PermissionDenied => {
            UninstallerError::PermissionDenied(format!("{}: {}", hive.join(path), error))
        }
        _ => UninstallerError::Registry(format!("{}: {}", hive.join(path), error)),
    }
}

fn open(hive: Hive, path: &str, view: RegistryView) -> Result<RegKey, UninstallerError> {
    predef(hive)
        .open_subkey_with_flags(path, KEY_READ | view_flags(view))
        .map_err(|e| map_error(hive, path, e))
}

impl RegistryBackend for WinRegistry {
    fn key_state(&self, hive: Hive, path: &str, view: RegistryView) -> KeyState {
        match predef(hive).open_subkey_with_flags(path, KEY_READ | view_flags(view)) {
            Ok(_) => KeyState::Present,
            Err(e) if e.kind() == ErrorKind::NotFound => KeyState::Absent,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => KeyState::AccessDenied,
            Err(e) => {
                tracing::debug!("探测注册表键 {} 失败: {}", hive.join(path), e);
                KeyState::AccessDenied
            }
        }
    }

    fn subkeys(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<String>, UninstallerError> {
        let key = open(hive, path, view)?;
        // 枚举中途出错视为枚举结束
        Ok(key.enum_keys().map_while(Result::ok).collect())
    }

    fn values(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<(String, String)>, UninstallerError> {
        let key = open(hive, path, view)?;
        Ok(key
            .enum_values()
            .map_while(Result::ok)
            .map(|(name, value)| {
                let name = if name.is_empty() { "(Default)".to_string() } else { name };
                (name, value.to_string())
            })
            .collect())
    }

    fn read_string(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
        name: &str,
    ) -> Option<String> {
        open(hive, path, view).ok()?.get_value::<String, _>(name).ok()
    }

    fn delete_key(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<(), UninstallerError> {
        let root = predef(hive);
        let result = match view {
            RegistryView::Default => root.delete_subkey(path),
            _ => root.delete_subkey_with_flags(path, view_flags(view)),
        };
        result.map_err(|e| map_error(hive, path, e))
    }
}
