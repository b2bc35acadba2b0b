//! 内存注册表
//!
//! 键名不区分大小写，每个键可以只在部分视图中可见，也可以标记为拒绝访问。
//! 默认所有视图共用一棵树；分离模式下 32 位视图单独保存一份，
//! 与 64 位系统上 `Wow6432Node` 的重定向一致。

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Hive, KeyState, RegistryBackend, RegistryView};
use crate::modules::common::error::UninstallerError;

/// (根键, 存储视图, 小写路径)
type KeyId = (Hive, RegistryView, String);

#[derive(Debug, Clone)]
struct MemKey {
    /// 保留原始大小写的完整子路径
    path: String,
    values: Vec<(String, String)>,
    views: Vec<RegistryView>,
    denied: bool,
}

impl MemKey {
    fn new(path: &str, views: &[RegistryView]) -> Self {
        Self {
            path: path.to_string(),
            values: Vec::new(),
            views: views.to_vec(),
            denied: false,
        }
    }

    fn visible_in(&self, view: RegistryView) -> bool {
        self.views.contains(&view)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: Mutex<BTreeMap<KeyId, MemKey>>,
    split_views: bool,
}

fn normalize(path: &str) -> String {
    path.trim_matches('\\').to_lowercase()
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 64 位视图 (含默认视图) 和 32 位视图各自保存一份键
    pub fn with_split_views() -> Self {
        Self {
            split_views: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<KeyId, MemKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 视图对应的存储位置
    fn store_of(&self, view: RegistryView) -> RegistryView {
        match (self.split_views, view) {
            (false, _) => RegistryView::Default,
            (true, RegistryView::View32) => RegistryView::View32,
            (true, _) => RegistryView::View64,
        }
    }

    fn id(&self, hive: Hive, path: &str, view: RegistryView) -> KeyId {
        (hive, self.store_of(view), normalize(path))
    }

    /// 共享同一存储位置的所有视图
    fn views_sharing(&self, store: RegistryView) -> Vec<RegistryView> {
        RegistryView::FALLBACK_ORDER
            .into_iter()
            .filter(|view| self.store_of(*view) == store)
            .collect()
    }

    /// 路径在各存储位置中的键 ID (去重)
    fn ids(&self, hive: Hive, path: &str) -> Vec<KeyId> {
        let mut ids: Vec<KeyId> = RegistryView::FALLBACK_ORDER
            .into_iter()
            .map(|view| self.id(hive, path, view))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// 创建键 (及其缺失的父键)，在所有视图中可见
    pub fn insert_key(&self, hive: Hive, path: &str) {
        self.insert_key_in_views(hive, path, &RegistryView::FALLBACK_ORDER);
    }

    /// 创建只在指定视图中可见的键，缺失的父键在同一存储位置的所有视图中可见
    pub fn insert_key_in_views(&self, hive: Hive, path: &str, views: &[RegistryView]) {
        let path = path.trim_matches('\\');
        let segments: Vec<&str> = path.split('\\').filter(|s| !s.is_empty()).collect();
        let mut keys = self.lock();

        for view in views {
            let store = self.store_of(*view);
            for end in 1..segments.len() {
                let parent = segments[..end].join("\\");
                keys.entry((hive, store, normalize(&parent)))
                    .or_insert_with(|| MemKey::new(&parent, &self.views_sharing(store)));
            }

            keys.entry((hive, store, normalize(path)))
                .and_modify(|key| {
                    if !key.visible_in(*view) {
                        key.views.push(*view);
                    }
                })
                .or_insert_with(|| MemKey::new(path, &[*view]));
        }
    }

    pub fn set_value(&self, hive: Hive, path: &str, name: &str, data: &str) {
        self.insert_key(hive, path);
        let mut keys = self.lock();
        for id in self.ids(hive, path) {
            if let Some(key) = keys.get_mut(&id) {
                key.values.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
                key.values.push((name.to_string(), data.to_string()));
            }
        }
    }

    /// 将键标记为拒绝访问
    pub fn deny(&self, hive: Hive, path: &str) {
        let mut keys = self.lock();
        for id in self.ids(hive, path) {
            if let Some(key) = keys.get_mut(&id) {
                key.denied = true;
            }
        }
    }

    /// 键是否存在于任意视图
    pub fn contains(&self, hive: Hive, path: &str) -> bool {
        let keys = self.lock();
        self.ids(hive, path).iter().any(|id| keys.contains_key(id))
    }

    /// 键在指定视图中是否可见
    pub fn contains_in(&self, hive: Hive, path: &str, view: RegistryView) -> bool {
        self.lock()
            .get(&self.id(hive, path, view))
            .map(|key| key.visible_in(view))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn open<'a>(
        &self,
        keys: &'a BTreeMap<KeyId, MemKey>,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<&'a MemKey, UninstallerError> {
        match keys.get(&self.id(hive, path, view)) {
            Some(key) if key.visible_in(view) => {
                if key.denied {
                    Err(UninstallerError::PermissionDenied(hive.join(path)))
                } else {
                    Ok(key)
                }
            }
            _ => Err(UninstallerError::NotFound(hive.join(path))),
        }
    }

    fn children<'a>(
        keys: &'a BTreeMap<KeyId, MemKey>,
        hive: Hive,
        store: RegistryView,
        path: &str,
    ) -> impl Iterator<Item = &'a MemKey> + 'a {
        let prefix = format!("{}\\", normalize(path));
        keys.iter()
            .filter_map(move |((key_hive, key_store, key_path), key)| {
                let is_child = *key_hive == hive
                    && *key_store == store
                    && key_path
                        .strip_prefix(&prefix)
                        .map(|rest| !rest.is_empty() && !rest.contains('\\'))
                        .unwrap_or(false);
                is_child.then_some(key)
            })
    }
}

impl RegistryBackend for MemoryRegistry {
    fn key_state(&self, hive: Hive, path: &str, view: RegistryView) -> KeyState {
        let keys = self.lock();
        match self.open(&keys, hive, path, view) {
            Ok(_) => KeyState::Present,
            Err(UninstallerError::PermissionDenied(_)) => KeyState::AccessDenied,
            Err(_) => KeyState::Absent,
        }
    }

    fn subkeys(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<String>, UninstallerError> {
        let keys = self.lock();
        self.open(&keys, hive, path, view)?;

        Ok(Self::children(&keys, hive, self.store_of(view), path)
            .filter(|child| child.visible_in(view))
            .filter_map(|child| child.path.rsplit('\\').next().map(str::to_string))
            .collect())
    }

    fn values(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<(String, String)>, UninstallerError> {
        let keys = self.lock();
        Ok(self.open(&keys, hive, path, view)?.values.clone())
    }

    fn read_string(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
        name: &str,
    ) -> Option<String> {
        let keys = self.lock();
        let key = self.open(&keys, hive, path, view).ok()?;
        key.values
            .iter()
            .find(|(value_name, _)| value_name.eq_ignore_ascii_case(name))
            .map(|(_, data)| data.clone())
    }

    fn delete_key(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<(), UninstallerError> {
        let mut keys = self.lock();
        self.open(&keys, hive, path, view)?;

        if Self::children(&keys, hive, self.store_of(view), path)
            .next()
            .is_some()
        {
            return Err(UninstallerError::Registry(format!(
                "{} still has subkeys",
                hive.join(path)
            )));
        }

        keys.remove(&self.id(hive, path, view));
        Ok(())
    }
}
