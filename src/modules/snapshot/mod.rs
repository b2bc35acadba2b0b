//! 安装快照
//!
//! 安装前后各拍一次快照，比较得到安装痕迹，之后可按痕迹精确清理。

pub mod models;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::modules::common::config::ScanConfig;
use crate::modules::common::error::UninstallerError;
use crate::modules::registry::{Hive, RegistryBackend, RegistryView};
use crate::modules::scanner::roots::ScanRoots;
use models::{ChangeType, FileChange, InstallationTrace, RegistryChange};

/// 默认监控的注册表键
pub const DEFAULT_REGISTRY_KEYS: [(Hive, &str); 5] = [
    (Hive::LocalMachine, r"Software\Microsoft\Windows\CurrentVersion\Uninstall"),
    (
        Hive::LocalMachine,
        r"Software\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    ),
    (Hive::CurrentUser, r"Software\Microsoft\Windows\CurrentVersion\Uninstall"),
    (Hive::LocalMachine, "Software"),
    (Hive::CurrentUser, "Software"),
];

/// 快照范围
#[derive(Debug, Clone)]
pub struct SnapshotScope {
    pub roots: Vec<PathBuf>,
    pub registry_keys: Vec<(Hive, String)>,
    pub file_depth: usize,
    pub registry_depth: usize,
}

impl SnapshotScope {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            registry_keys: Vec::new(),
            file_depth: 5,
            registry_depth: 1,
        }
    }

    pub fn with_registry_key(mut self, hive: Hive, path: impl Into<String>) -> Self {
        self.registry_keys.push((hive, path.into()));
        self
    }

    pub fn with_depths(mut self, file_depth: usize, registry_depth: usize) -> Self {
        self.file_depth = file_depth;
        self.registry_depth = registry_depth;
        self
    }

    /// 系统默认范围: 所有数据根目录和默认注册表键
    pub fn system(roots: &dyn ScanRoots, config: &ScanConfig) -> Self {
        let mut scope = Self::new(roots.data_roots())
            .with_depths(config.snapshot_depth, config.registry_depth);
        for (hive, path) in DEFAULT_REGISTRY_KEYS {
            scope = scope.with_registry_key(hive, path);
        }
        scope
    }
}

/// 快照中的文件状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// 系统状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub timestamp: DateTime<Local>,
    pub files: BTreeMap<String, FileState>,
    /// 键完整路径 -> (值名 -> 值)
    pub registry_keys: BTreeMap<String, BTreeMap<String, String>>,
}

impl SystemSnapshot {
    pub fn empty() -> Self {
        Self {
            timestamp: Local::now(),
            files: BTreeMap::new(),
            registry_keys: BTreeMap::new(),
        }
    }

    pub fn capture(scope: &SnapshotScope, registry: &dyn RegistryBackend) -> Self {
        let mut snapshot = Self::empty();

        tracing::info!("正在记录文件快照 ({} 个根目录)...", scope.roots.len());
        for root in &scope.roots {
            snapshot.capture_filesystem(root, scope.file_depth);
        }

        tracing::info!("正在记录注册表快照 ({} 个键)...", scope.registry_keys.len());
        for (hive, path) in &scope.registry_keys {
            snapshot.capture_registry(registry, *hive, path, 0, scope.registry_depth);
        }

        tracing::info!(
            "快照完成: {} 个文件, {} 个注册表键",
            snapshot.files.len(),
            snapshot.registry_keys.len()
        );
        snapshot
    }

    /// 记录目录深度不超过 `max_depth` 的所有文件
    fn capture_filesystem(&mut self, root: &Path, max_depth: usize) {
        if !root.exists() {
            return;
        }

        let walker = WalkDir::new(root).min_depth(1).max_depth(max_depth + 1);
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            match entry.metadata() {
                Ok(meta) => {
                    let state = FileState {
                        size: meta.len(),
                        modified: meta.modified().ok().map(DateTime::<Local>::from),
                    };
                    self.files
                        .insert(entry.path().to_string_lossy().to_string(), state);
                }
                Err(e) => tracing::debug!("读取文件信息失败 {}: {}", entry.path().display(), e),
            }
        }
    }

    fn capture_registry(
        &mut self,
        registry: &dyn RegistryBackend,
        hive: Hive,
        path: &str,
        depth: usize,
        max_depth: usize,
    ) {
        let values = match registry.values(hive, path, RegistryView::Default) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!("无法读取注册表项 {}: {}", hive.join(path), e);
                return;
            }
        };
        self.registry_keys
            .insert(hive.join(path), values.into_iter().collect());

        if depth >= max_depth {
            return;
        }

        let Ok(subkeys) = registry.subkeys(hive, path, RegistryView::Default) else {
            return;
        };
        for name in subkeys {
            let child = format!("{}\\{}", path, name);
            self.capture_registry(registry, hive, &child, depth + 1, max_depth);
        }
    }

    /// 与安装前快照比较，`self` 为安装后
    pub fn compare_filesystem(&self, before: &SystemSnapshot) -> Vec<FileChange> {
        let mut changes = Vec::new();

        for (path, state) in &self.files {
            let change_type = match before.files.get(path) {
                None => ChangeType::Added,
                Some(old) if old != state => ChangeType::Modified,
                Some(_) => continue,
            };
            changes.push(FileChange {
                path: path.clone(),
                change_type,
                size: Some(state.size),
                timestamp: state.modified,
            });
        }

        for path in before.files.keys() {
            if !self.files.contains_key(path) {
                changes.push(FileChange {
                    path: path.clone(),
                    change_type: ChangeType::Deleted,
                    size: None,
                    timestamp: None,
                });
            }
        }

        changes
    }

    pub fn compare_registry(&self, before: &SystemSnapshot) -> Vec<RegistryChange> {
        let mut changes = Vec::new();

        for (key_path, values) in &self.registry_keys {
            let Some(old_values) = before.registry_keys.get(key_path) else {
                changes.push(RegistryChange {
                    key_path: key_path.clone(),
                    change_type: ChangeType::Added,
                    value_name: None,
                    value_data: None,
                });
                continue;
            };

            for (name, data) in values {
                let change_type = match old_values.get(name) {
                    None => ChangeType::Added,
                    Some(old) if old != data => ChangeType::Modified,
                    Some(_) => continue,
                };
                changes.push(RegistryChange {
                    key_path: key_path.clone(),
                    change_type,
                    value_name: Some(name.clone()),
                    value_data: Some(data.clone()),
                });
            }

            for name in old_values.keys().filter(|name| !values.contains_key(*name)) {
                changes.push(RegistryChange {
                    key_path: key_path.clone(),
                    change_type: ChangeType::Deleted,
                    value_name: Some(name.clone()),
                    value_data: None,
                });
            }
        }

        for key_path in before.registry_keys.keys() {
            if !self.registry_keys.contains_key(key_path) {
                changes.push(RegistryChange {
                    key_path: key_path.clone(),
                    change_type: ChangeType::Deleted,
                    value_name: None,
                    value_data: None,
                });
            }
        }

        changes
    }

    /// 生成安装痕迹
    pub fn trace_since(&self, before: &SystemSnapshot, program_name: &str) -> InstallationTrace {
        let file_changes = self.compare_filesystem(before);
        let registry_changes = self.compare_registry(before);

        let total_size = file_changes
            .iter()
            .filter(|change| change.change_type == ChangeType::Added)
            .filter_map(|change| change.size)
            .sum();

        tracing::info!(
            "检测到 {} 个文件变更, {} 个注册表变更",
            file_changes.len(),
            registry_changes.len()
        );

        InstallationTrace {
            program_name: program_name.to_string(),
            install_date: Local::now(),
            file_changes,
            registry_changes,
            total_size,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), UninstallerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        tracing::info!("快照已保存到 {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, UninstallerError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::registry::MemoryRegistry;
    use crate::modules::scanner::models::LeftoverKind;
    use std::fs;
    use tempfile::tempdir;

    fn scope(root: &Path) -> SnapshotScope {
        SnapshotScope::new(vec![root.to_path_buf()])
            .with_registry_key(Hive::CurrentUser, "Software")
            .with_depths(5, 2)
    }

    #[test]
    fn install_is_detected_as_added_files_and_keys() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("existing.txt"), b"old").unwrap();
        fs::write(root.path().join("removed.txt"), b"bye").unwrap();

        let registry = MemoryRegistry::new();
        registry.set_value(Hive::CurrentUser, r"Software\Existing", "Mode", "a");

        let before = SystemSnapshot::capture(&scope(root.path()), &registry);

        let app = root.path().join("Acme").join("bin");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("acme.exe"), vec![0u8; 64]).unwrap();
        fs::remove_file(root.path().join("removed.txt")).unwrap();
        registry.set_value(Hive::CurrentUser, r"Software\Acme", "Path", "C:\\Acme");
        registry.set_value(Hive::CurrentUser, r"Software\Existing", "Mode", "b");

        let after = SystemSnapshot::capture(&scope(root.path()), &registry);
        let trace = after.trace_since(&before, "Acme");

        let added: Vec<_> = trace
            .file_changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Added)
            .collect();
        assert_eq!(added.len(), 1);
        assert!(added[0].path.ends_with("acme.exe"));
        assert_eq!(trace.total_size, 64);
        assert!(trace
            .file_changes
            .iter()
            .any(|c| c.change_type == ChangeType::Deleted && c.path.ends_with("removed.txt")));

        assert!(trace.registry_changes.contains(&RegistryChange {
            key_path: r"HKEY_CURRENT_USER\Software\Acme".to_string(),
            change_type: ChangeType::Added,
            value_name: None,
            value_data: None,
        }));
        assert!(trace.registry_changes.contains(&RegistryChange {
            key_path: r"HKEY_CURRENT_USER\Software\Existing".to_string(),
            change_type: ChangeType::Modified,
            value_name: Some("Mode".to_string()),
            value_data: Some("b".to_string()),
        }));

        let leftovers = trace.to_leftovers();
        assert_eq!(leftovers.len(), 2);
        assert_eq!(leftovers[0].kind, LeftoverKind::File);
        assert_eq!(leftovers[0].size, Some(64));
        assert_eq!(leftovers[1].path, r"HKEY_CURRENT_USER\Software\Acme");
    }

    #[test]
    fn unchanged_system_has_no_changes() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("same.txt"), b"same").unwrap();
        let registry = MemoryRegistry::new();
        registry.insert_key(Hive::CurrentUser, r"Software\Same");

        let before = SystemSnapshot::capture(&scope(root.path()), &registry);
        let after = SystemSnapshot::capture(&scope(root.path()), &registry);

        assert!(after.compare_filesystem(&before).is_empty());
        assert!(after.compare_registry(&before).is_empty());
    }

    #[test]
    fn file_depth_limits_the_walk() {
        let root = tempdir().unwrap();
        let deep = root.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        fs::write(root.path().join("a").join("b").join("kept.txt"), b"k").unwrap();
        fs::write(deep.join("skipped.txt"), b"s").unwrap();

        let registry = MemoryRegistry::new();
        let snapshot =
            SystemSnapshot::capture(&SnapshotScope::new(vec![root.path().to_path_buf()]).with_depths(2, 0), &registry);

        assert_eq!(snapshot.files.len(), 1);
        assert!(snapshot.files.keys().next().unwrap().ends_with("kept.txt"));
    }

    #[test]
    fn snapshot_and_trace_survive_disk_round_trip() {
        let dir = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        registry.set_value(Hive::CurrentUser, r"Software\Acme", "Path", "x");

        let snapshot = SystemSnapshot::capture(&scope(dir.path()), &registry);
        let snapshot_path = dir.path().join("snap").join("before.json");
        snapshot.save(&snapshot_path).unwrap();
        assert_eq!(SystemSnapshot::load(&snapshot_path).unwrap(), snapshot);

        let trace = snapshot.trace_since(&SystemSnapshot::empty(), "Acme: Widget");
        let traces_dir = dir.path().join("traces");
        let saved = trace.save(&traces_dir).unwrap();
        assert!(saved.file_name().unwrap().to_string_lossy().starts_with("Acme Widget_"));

        let listed = InstallationTrace::list(&traces_dir);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1, trace);
    }
}
