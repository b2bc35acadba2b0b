use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use super::models::{BackupKind, BackupMetadata, RegistryKeyExport};
use super::BackupCoordinator;
use crate::modules::common::config::AppConfig;
use crate::modules::common::error::UninstallerError;
use crate::modules::registry::{Hive, KeyState, RegistryBackend, RegistryView};

const METADATA_FILE: &str = "metadata.json";

/// 本地备份管理
///
/// 每次备份生成一个独立目录 `<类型>_<时间戳>`，其中包含备份内容和 `metadata.json`。
pub struct BackupManager<'a> {
    root: PathBuf,
    registry: &'a dyn RegistryBackend,
    files_enabled: bool,
    registry_enabled: bool,
}

impl<'a> BackupManager<'a> {
    pub fn new(root: impl Into<PathBuf>, registry: &'a dyn RegistryBackend) -> Self {
        Self {
            root: root.into(),
            registry,
            files_enabled: true,
            registry_enabled: true,
        }
    }

    pub fn from_config(config: &AppConfig, registry: &'a dyn RegistryBackend) -> Self {
        Self {
            root: config.backup_dir(),
            registry,
            files_enabled: config.backup.backup_files,
            registry_enabled: config.backup.backup_registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 复制文件和目录到新的备份目录
    ///
    /// 一项都没有复制成功时删除备份目录并返回错误。
    pub fn try_backup_files(
        &self,
        paths: &[String],
        label: &str,
    ) -> Result<BackupMetadata, UninstallerError> {
        let backup_dir = self.create_backup_dir("files")?;
        let content_dir = backup_dir.join(sanitize(label));
        fs::create_dir_all(&content_dir)?;

        let mut saved = Vec::new();
        for path in paths {
            let source = Path::new(path);
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = unique_child(&content_dir, &name.to_string_lossy());

            let copied = if source.is_dir() {
                copy_tree(source, &target)
            } else if source.is_file() {
                fs::copy(source, &target).map(|_| ()).map_err(UninstallerError::from_io)
            } else {
                continue;
            };

            match copied {
                Ok(()) => saved.push(path.clone()),
                Err(e) => tracing::warn!("备份失败 {}: {}", path, e),
            }
        }

        if saved.is_empty() {
            if let Err(e) = fs::remove_dir_all(&backup_dir) {
                tracing::debug!("无法删除空备份目录 {}: {}", backup_dir.display(), e);
            }
            return Err(UninstallerError::Other(format!(
                "none of {} paths could be backed up",
                paths.len()
            )));
        }

        self.write_metadata(&backup_dir, BackupKind::Files, label, saved)
    }

    /// 以 JSON 树导出注册表键
    pub fn try_backup_registry_key(
        &self,
        hive: Hive,
        subpath: &str,
        label: &str,
    ) -> Result<PathBuf, UninstallerError> {
        let export = self.export_key(hive, subpath)?;

        let backup_dir = self.create_backup_dir("registry")?;
        let file = backup_dir.join(format!("{}.json", sanitize(label)));
        fs::write(&file, serde_json::to_string_pretty(&export)?)?;

        self.write_metadata(&backup_dir, BackupKind::Registry, label, vec![export.path.clone()])?;
        Ok(file)
    }

    /// 读取注册表键及其子树
    pub fn export_key(&self, hive: Hive, subpath: &str) -> Result<RegistryKeyExport, UninstallerError> {
        let view = RegistryView::FALLBACK_ORDER
            .into_iter()
            .find(|view| self.registry.key_state(hive, subpath, *view) == KeyState::Present)
            .ok_or_else(|| UninstallerError::NotFound(hive.join(subpath)))?;

        self.export_tree(hive, subpath, view)
    }

    fn export_tree(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<RegistryKeyExport, UninstallerError> {
        let values = self.registry.values(hive, path, view)?;

        let mut subkeys = Vec::new();
        for name in self.registry.subkeys(hive, path, view)? {
            let child = format!("{}\\{}", path, name);
            match self.export_tree(hive, &child, view) {
                Ok(export) => subkeys.push(export),
                Err(e) => tracing::warn!("导出子键失败 {}: {}", hive.join(&child), e),
            }
        }

        Ok(RegistryKeyExport {
            path: hive.join(path),
            values,
            subkeys,
        })
    }

    /// 列出所有备份，最新的在前
    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>, UninstallerError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let dir = entry?.path();
            if !dir.is_dir() {
                continue;
            }

            match read_metadata(&dir) {
                Ok(metadata) => backups.push(metadata),
                Err(e) => tracing::debug!("跳过无元数据的目录 {}: {}", dir.display(), e),
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// 删除超过 `keep_days` 天的备份，返回删除数量
    pub fn cleanup_old_backups(&self, keep_days: u32) -> Result<usize, UninstallerError> {
        if !self.root.exists() {
            return Ok(0);
        }

        let now = Local::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)? {
            let dir = entry?.path();
            if !dir.is_dir() {
                continue;
            }

            let Some(created) = backup_time(&dir) else {
                continue;
            };

            if (now - created).num_days() > i64::from(keep_days) {
                match fs::remove_dir_all(&dir) {
                    Ok(()) => {
                        tracing::info!("已删除过期备份: {}", dir.display());
                        removed += 1;
                    }
                    Err(e) => tracing::warn!("删除过期备份失败 {}: {}", dir.display(), e),
                }
            }
        }

        Ok(removed)
    }

    fn create_backup_dir(&self, prefix: &str) -> Result<PathBuf, UninstallerError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut dir = self.root.join(format!("{}_{}", prefix, stamp));
        let mut n = 1;
        while dir.exists() {
            dir = self.root.join(format!("{}_{}_{}", prefix, stamp, n));
            n += 1;
        }

        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_metadata(
        &self,
        dir: &Path,
        kind: BackupKind,
        label: &str,
        items: Vec<String>,
    ) -> Result<BackupMetadata, UninstallerError> {
        let metadata = BackupMetadata {
            timestamp: Local::now(),
            kind,
            label: label.to_string(),
            items,
            path: dir.to_path_buf(),
        };
        fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;
        Ok(metadata)
    }
}

impl BackupCoordinator for BackupManager<'_> {
    fn backup_files(&self, paths: &[String], label: &str) -> Option<PathBuf> {
        if !self.files_enabled {
            tracing::debug!("文件备份已关闭");
            return None;
        }

        match self.try_backup_files(paths, label) {
            Ok(metadata) => {
                tracing::info!(
                    "已备份 {}/{} 个文件项到 {}",
                    metadata.items.len(),
                    paths.len(),
                    metadata.path.display()
                );
                Some(metadata.path)
            }
            Err(e) => {
                tracing::warn!("文件备份失败: {}", e);
                None
            }
        }
    }

    fn backup_registry_key(&self, hive: Hive, subpath: &str, label: &str) -> Option<PathBuf> {
        if !self.registry_enabled {
            tracing::debug!("注册表备份已关闭");
            return None;
        }

        match self.try_backup_registry_key(hive, subpath, label) {
            Ok(file) => {
                tracing::info!("已备份注册表项 {} 到 {}", hive.join(subpath), file.display());
                Some(file)
            }
            Err(e) => {
                tracing::warn!("注册表备份失败 {}: {}", hive.join(subpath), e);
                None
            }
        }
    }
}

fn read_metadata(dir: &Path) -> Result<BackupMetadata, UninstallerError> {
    let content = fs::read_to_string(dir.join(METADATA_FILE))?;
    let mut metadata: BackupMetadata = serde_json::from_str(&content)?;
    metadata.path = dir.to_path_buf();
    Ok(metadata)
}

/// 优先使用元数据中的时间，读取失败时退回目录修改时间
fn backup_time(dir: &Path) -> Option<DateTime<Local>> {
    read_metadata(dir).map(|m| m.timestamp).ok().or_else(|| {
        fs::metadata(dir)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Local>::from)
    })
}

fn copy_tree(source: &Path, target: &Path) -> Result<(), UninstallerError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| UninstallerError::Other(e.to_string()))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination).map_err(UninstallerError::from_io)?;
        }
    }

    Ok(())
}

fn unique_child(dir: &Path, name: &str) -> PathBuf {
    let mut candidate = dir.join(name);
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}", n, name));
        n += 1;
    }
    candidate
}

/// 将标签转换为可用的文件名
fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "backup".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::registry::MemoryRegistry;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn files_and_directories_are_copied_with_metadata() {
        let source = tempdir().unwrap();
        let file = source.path().join("settings.ini");
        fs::write(&file, b"[acme]").unwrap();
        let app = source.path().join("Acme");
        fs::create_dir_all(app.join("cache")).unwrap();
        fs::write(app.join("cache").join("blob.bin"), b"blob").unwrap();

        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        let manager = BackupManager::new(root.path(), &registry);

        let paths = vec![
            file.to_string_lossy().to_string(),
            app.to_string_lossy().to_string(),
            source.path().join("missing.txt").to_string_lossy().to_string(),
        ];
        let dir = manager.backup_files(&paths, "Acme Widget").unwrap();

        let content = dir.join("Acme_Widget");
        assert_eq!(fs::read(content.join("settings.ini")).unwrap(), b"[acme]");
        assert_eq!(fs::read(content.join("Acme").join("cache").join("blob.bin")).unwrap(), b"blob");

        let metadata = read_metadata(&dir).unwrap();
        assert_eq!(metadata.kind, BackupKind::Files);
        assert_eq!(metadata.items.len(), 2);
    }

    #[test]
    fn nothing_copied_means_no_backup() {
        let source = tempdir().unwrap();
        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        let manager = BackupManager::new(root.path(), &registry);

        let paths = vec![source.path().join("gone.log").to_string_lossy().to_string()];

        let err = manager.try_backup_files(&paths, "Acme").unwrap_err();
        assert_eq!(err.to_string(), "none of 1 paths could be backed up");
        assert!(manager.backup_files(&paths, "Acme").is_none());
        assert!(manager.list_backups().unwrap().is_empty());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn registry_key_is_exported_as_a_tree() {
        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        registry.set_value(Hive::CurrentUser, r"Software\Acme", "Version", "1.0");
        registry.set_value(Hive::CurrentUser, r"Software\Acme\Prefs", "Theme", "dark");
        let manager = BackupManager::new(root.path(), &registry);

        let file = manager
            .backup_registry_key(Hive::CurrentUser, r"Software\Acme", "Acme")
            .unwrap();

        let export: RegistryKeyExport =
            serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(export.path, r"HKEY_CURRENT_USER\Software\Acme");
        assert_eq!(export.values, vec![("Version".to_string(), "1.0".to_string())]);
        assert_eq!(export.key_count(), 2);
        assert_eq!(export.subkeys[0].values[0].1, "dark");
    }

    #[test]
    fn missing_registry_key_yields_no_backup() {
        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        let manager = BackupManager::new(root.path(), &registry);

        assert!(manager
            .backup_registry_key(Hive::LocalMachine, r"Software\Nope", "nope")
            .is_none());
    }

    #[test]
    fn disabled_file_backup_returns_none() {
        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        let mut config = AppConfig::default();
        config.backup.dir = Some(root.path().to_path_buf());
        config.backup.backup_files = false;
        let manager = BackupManager::from_config(&config, &registry);

        assert!(manager.backup_files(&[], "x").is_none());
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn listing_is_newest_first_and_old_backups_are_pruned() {
        let root = tempdir().unwrap();
        let registry = MemoryRegistry::new();
        let manager = BackupManager::new(root.path(), &registry);

        for (name, age_days) in [("files_old", 45), ("files_new", 1)] {
            let dir = root.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            let metadata = BackupMetadata {
                timestamp: Local::now() - Duration::days(age_days),
                kind: BackupKind::Files,
                label: name.to_string(),
                items: Vec::new(),
                path: PathBuf::new(),
            };
            fs::write(dir.join(METADATA_FILE), serde_json::to_string(&metadata).unwrap()).unwrap();
        }
        fs::create_dir_all(root.path().join("stray")).unwrap();

        let listed = manager.list_backups().unwrap();
        let labels: Vec<_> = listed.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["files_new", "files_old"]);
        assert_eq!(listed[0].path, root.path().join("files_new"));

        assert_eq!(manager.cleanup_old_backups(30).unwrap(), 1);
        assert!(!root.path().join("files_old").exists());
        assert!(root.path().join("files_new").exists());
        assert!(root.path().join("stray").exists());
    }

    #[test]
    fn labels_become_safe_file_names() {
        assert_eq!(sanitize("Acme: Widget/2"), "Acme__Widget_2");
        assert_eq!(sanitize(""), "backup");
    }
}
