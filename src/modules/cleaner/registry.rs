use super::models::Removal;
use crate::modules::common::error::UninstallerError;
use crate::modules::registry::{parse_registry_path, Hive, KeyState, RegistryBackend, RegistryView};

/// 删除注册表残留 (递归删除整个键)
pub fn delete_registry_leftover(
    registry: &dyn RegistryBackend,
    path: &str,
) -> Result<Removal, UninstallerError> {
    let (hive, subpath) = parse_registry_path(path).ok_or(UninstallerError::InvalidRegistryPath)?;

    // 键不存在视为已清理
    if probe_key(registry, hive, subpath) == KeyState::Absent {
        tracing::debug!("注册表项已不存在: {}", path);
        return Ok(Removal::AlreadyAbsent);
    }

    // 64 位和 32 位 (Wow6432Node) 视图下可能各有一份副本，每轮至少删除一份
    for _ in RegistryView::FALLBACK_ORDER {
        delete_key_recursive(registry, hive, subpath).map_err(|e| {
            tracing::error!("删除注册表失败 {}: {}", path, e);
            e
        })?;

        if probe_key(registry, hive, subpath) == KeyState::Absent {
            tracing::info!("已删除注册表项: {}", path);
            return Ok(Removal::Deleted);
        }
    }

    tracing::error!("删除后注册表项仍然存在: {}", path);
    Err(UninstallerError::RegistryKeyNotDeleted)
}

/// 依次在各视图下探测，任一视图可见即视为存在
fn probe_key(registry: &dyn RegistryBackend, hive: Hive, path: &str) -> KeyState {
    let mut state = KeyState::Absent;

    for view in RegistryView::FALLBACK_ORDER {
        match registry.key_state(hive, path, view) {
            KeyState::Present => return KeyState::Present,
            KeyState::AccessDenied => state = KeyState::AccessDenied,
            KeyState::Absent => {}
        }
    }

    state
}

/// 先删除所有子键，再删除键本身
///
/// 子键删除失败只记录日志，最终由父键的删除结果决定成败。
pub fn delete_key_recursive(
    registry: &dyn RegistryBackend,
    hive: Hive,
    path: &str,
) -> Result<(), UninstallerError> {
    let subkeys = RegistryView::FALLBACK_ORDER
        .iter()
        .find_map(|view| registry.subkeys(hive, path, *view).ok())
        .ok_or(UninstallerError::RegistryKeyNotOpened)?;

    for name in subkeys {
        let child = format!("{}\\{}", path, name);
        if let Err(e) = delete_key_recursive(registry, hive, &child) {
            tracing::warn!("删除子键失败 {}: {}", hive.join(&child), e);
        }
    }

    let deleted = RegistryView::FALLBACK_ORDER
        .iter()
        .any(|view| registry.delete_key(hive, path, *view).is_ok());

    if deleted {
        Ok(())
    } else {
        Err(UninstallerError::RegistryKeyNotDeleted)
    }
}
