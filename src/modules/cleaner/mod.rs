pub mod filesystem;
pub mod models;
pub mod registry;
pub mod safety;

use std::collections::BTreeMap;

use chrono::Local;

use crate::modules::backup::BackupCoordinator;
use crate::modules::common::error::UninstallerError;
use crate::modules::registry::{parse_registry_path, RegistryBackend};
use crate::modules::scanner::models::{Leftover, LeftoverKind};
use models::{CleanPhase, CleanResult, Removal};

/// 单项删除策略
pub trait Remover {
    fn remove(&self, leftover: &Leftover) -> Result<Removal, UninstallerError>;
}

/// 删除真实文件系统和注册表中的残留
pub struct SystemRemover<'a> {
    registry: &'a dyn RegistryBackend,
}

impl<'a> SystemRemover<'a> {
    pub fn new(registry: &'a dyn RegistryBackend) -> Self {
        Self { registry }
    }
}

impl Remover for SystemRemover<'_> {
    fn remove(&self, leftover: &Leftover) -> Result<Removal, UninstallerError> {
        match leftover.kind {
            LeftoverKind::File | LeftoverKind::Shortcut => filesystem::delete_file(&leftover.path),
            LeftoverKind::Directory => filesystem::delete_directory(&leftover.path),
            LeftoverKind::Registry => {
                registry::delete_registry_leftover(self.registry, &leftover.path)
            }
        }
    }
}

/// 残留清理器
///
/// 删除前先备份 (可选)，然后按 快捷方式 -> 文件 -> 目录 -> 注册表 的顺序删除。
/// 单项失败不会中断清理，所有失败记录在 [`CleanResult::errors`] 中。
pub struct Cleaner<'a> {
    remover: Box<dyn Remover + 'a>,
    backup: Option<&'a dyn BackupCoordinator>,
}

impl<'a> Cleaner<'a> {
    pub fn new(registry: &'a dyn RegistryBackend) -> Self {
        Self::with_remover(SystemRemover::new(registry))
    }

    pub fn with_remover(remover: impl Remover + 'a) -> Self {
        Self {
            remover: Box::new(remover),
            backup: None,
        }
    }

    pub fn with_backup(mut self, backup: &'a dyn BackupCoordinator) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn clean(&self, leftovers: &[Leftover]) -> CleanResult {
        self.clean_with_progress(leftovers, &mut |_, _| {})
    }

    /// 清理残留，每个阶段结束后回调 (阶段, 已处理数量)
    pub fn clean_with_progress(
        &self,
        leftovers: &[Leftover],
        progress: &mut dyn FnMut(CleanPhase, usize),
    ) -> CleanResult {
        let mut result = CleanResult::new(leftovers.len());
        if leftovers.is_empty() {
            return result;
        }

        let mut grouped: BTreeMap<LeftoverKind, Vec<&Leftover>> = BTreeMap::new();
        for leftover in leftovers {
            grouped.entry(leftover.kind).or_default().push(leftover);
        }

        if let Some(backup) = self.backup {
            self.create_backups(backup, &grouped);
            progress(CleanPhase::Backup, 0);
        }

        let mut processed = 0;
        for kind in LeftoverKind::CLEAN_ORDER {
            let Some(items) = grouped.get(&kind) else {
                continue;
            };

            for leftover in items {
                self.clean_one(leftover, &mut result);
                processed += 1;
            }
            progress(CleanPhase::Delete(kind), processed);
        }

        tracing::info!(
            "清理完成: 共 {} 项，删除 {} 项，失败 {} 项，已不存在 {} 项",
            result.total_items,
            result.deleted_items,
            result.failed_items,
            result.absent_items
        );

        result
    }

    fn clean_one(&self, leftover: &Leftover, result: &mut CleanResult) {
        // 安全检查
        if let Err(e) = safety::pre_delete_check(leftover) {
            tracing::warn!("跳过关键系统项: {}", leftover.path);
            result.record_failure(&leftover.path, e.to_string());
            return;
        }

        match self.remover.remove(leftover) {
            Ok(removal) => result.record(leftover, removal),
            Err(e) => result.record_failure(&leftover.path, e.to_string()),
        }
    }

    /// 文件和目录合并为一次备份，注册表键逐个备份
    fn create_backups(
        &self,
        backup: &dyn BackupCoordinator,
        grouped: &BTreeMap<LeftoverKind, Vec<&Leftover>>,
    ) {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        let files: Vec<String> = [LeftoverKind::File, LeftoverKind::Directory]
            .iter()
            .filter_map(|kind| grouped.get(kind))
            .flatten()
            .map(|leftover| leftover.path.clone())
            .collect();

        if !files.is_empty() && backup.backup_files(&files, &format!("leftovers_{}", stamp)).is_none() {
            tracing::warn!("文件备份未完成，继续清理");
        }

        for leftover in grouped.get(&LeftoverKind::Registry).into_iter().flatten() {
            let Some((hive, subpath)) = parse_registry_path(&leftover.path) else {
                continue;
            };

            let label = format!("registry_{}", stamp);
            if backup.backup_registry_key(hive, subpath, &label).is_none() {
                tracing::warn!("注册表项备份未完成: {}", leftover.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::registry::{Hive, MemoryRegistry};
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// 记录调用顺序的备份器和删除器
    #[derive(Default)]
    struct Journal {
        events: RefCell<Vec<String>>,
    }

    impl BackupCoordinator for Journal {
        fn backup_files(&self, paths: &[String], _label: &str) -> Option<PathBuf> {
            self.events
                .borrow_mut()
                .push(format!("backup files [{}]", paths.join(", ")));
            None
        }

        fn backup_registry_key(&self, hive: Hive, subpath: &str, _label: &str) -> Option<PathBuf> {
            self.events.borrow_mut().push(format!("backup {}", hive.join(subpath)));
            None
        }
    }

    struct RecordingRemover<'j>(&'j Journal);

    impl Remover for RecordingRemover<'_> {
        fn remove(&self, leftover: &Leftover) -> Result<Removal, UninstallerError> {
            self.0.events.borrow_mut().push(format!("delete {}", leftover.kind));
            Ok(Removal::Deleted)
        }
    }

    fn mixed_leftovers() -> Vec<Leftover> {
        vec![
            Leftover::new(LeftoverKind::Registry, r"HKCU\Software\Acme"),
            Leftover::new(LeftoverKind::Directory, r"C:\Program Files\Acme").with_size(2048),
            Leftover::new(LeftoverKind::Shortcut, r"C:\Users\me\Desktop\Acme.lnk"),
            Leftover::new(LeftoverKind::File, r"C:\Users\me\acme.log").with_size(10),
        ]
    }

    #[test]
    fn empty_input_does_nothing() {
        let journal = Journal::default();
        let cleaner = Cleaner::with_remover(RecordingRemover(&journal)).with_backup(&journal);

        let result = cleaner.clean(&[]);

        assert_eq!(result, CleanResult::default());
        assert!(journal.events.borrow().is_empty());
    }

    #[test]
    fn backups_run_first_then_deletes_follow_kind_order() {
        let journal = Journal::default();
        let cleaner = Cleaner::with_remover(RecordingRemover(&journal)).with_backup(&journal);

        let mut phases = Vec::new();
        let result = cleaner.clean_with_progress(&mixed_leftovers(), &mut |phase, n| {
            phases.push((phase, n))
        });

        assert_eq!(
            *journal.events.borrow(),
            vec![
                r"backup files [C:\Users\me\acme.log, C:\Program Files\Acme]",
                r"backup HKEY_CURRENT_USER\Software\Acme",
                "delete shortcut",
                "delete file",
                "delete directory",
                "delete registry",
            ]
        );
        assert_eq!(
            phases,
            vec![
                (CleanPhase::Backup, 0),
                (CleanPhase::Delete(LeftoverKind::Shortcut), 1),
                (CleanPhase::Delete(LeftoverKind::File), 2),
                (CleanPhase::Delete(LeftoverKind::Directory), 3),
                (CleanPhase::Delete(LeftoverKind::Registry), 4),
            ]
        );
        assert_eq!(result.deleted_items, 4);
        assert_eq!(result.size_freed, 2058);
    }

    #[test]
    fn critical_items_are_refused_without_touching_them() {
        let journal = Journal::default();
        let cleaner = Cleaner::with_remover(RecordingRemover(&journal));
        let leftovers = vec![
            Leftover::new(LeftoverKind::Directory, r"C:\Windows\System32"),
            Leftover::new(LeftoverKind::File, r"C:\Users\me\acme.log"),
        ];

        let result = cleaner.clean(&leftovers);

        assert_eq!(result.failed_items, 1);
        assert_eq!(result.deleted_items, 1);
        assert_eq!(
            result.errors,
            vec![(
                r"C:\Windows\System32".to_string(),
                r"Critical system item: C:\Windows\System32".to_string()
            )]
        );
        assert_eq!(*journal.events.borrow(), vec!["delete file"]);
    }

    #[test]
    fn second_clean_reports_everything_absent() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("Acme");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("data.bin"), vec![0u8; 100]).unwrap();
        let log = dir.path().join("acme.log");
        fs::write(&log, b"log").unwrap();

        let registry = MemoryRegistry::new();
        registry.insert_key(Hive::CurrentUser, r"Software\Acme\Settings\Window");

        let leftovers = vec![
            Leftover::new(LeftoverKind::Directory, app.to_string_lossy()).with_size(100),
            Leftover::new(LeftoverKind::File, log.to_string_lossy()).with_size(3),
            Leftover::new(LeftoverKind::Registry, r"HKEY_CURRENT_USER\Software\Acme"),
        ];
        let cleaner = Cleaner::new(&registry);

        let first = cleaner.clean(&leftovers);
        assert_eq!(first.deleted_items, 3);
        assert_eq!(first.failed_items, 0);
        assert_eq!(first.size_freed, 103);
        assert!(!app.exists());
        assert!(!registry.contains(Hive::CurrentUser, r"Software\Acme\Settings"));

        let second = cleaner.clean(&leftovers);
        assert_eq!(second.deleted_items, 0);
        assert_eq!(second.failed_items, 0);
        assert_eq!(second.absent_items, 3);
        assert!(second.is_success());
    }

    #[test]
    fn second_clean_finds_nothing_when_key_exists_in_both_views() {
        let registry = MemoryRegistry::with_split_views();
        registry.insert_key(Hive::LocalMachine, r"Software\Acme");
        let leftovers = vec![Leftover::new(
            LeftoverKind::Registry,
            r"HKEY_LOCAL_MACHINE\Software\Acme",
        )];
        let cleaner = Cleaner::new(&registry);

        let first = cleaner.clean(&leftovers);
        assert_eq!(first.deleted_items, 1);
        assert_eq!(first.failed_items, 0);
        assert!(!registry.contains(Hive::LocalMachine, r"Software\Acme"));

        let second = cleaner.clean(&leftovers);
        assert_eq!(second.deleted_items, 0);
        assert_eq!(second.failed_items, 0);
        assert_eq!(second.absent_items, 1);
    }

    #[cfg(unix)]
    #[test]
    fn permission_failure_is_recorded_and_next_item_still_deleted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let sealed = dir.path().join("Sealed");
        fs::create_dir_all(&sealed).unwrap();
        let locked_file = sealed.join("acme.cfg");
        fs::write(&locked_file, b"cfg").unwrap();
        let free_file = dir.path().join("acme.log");
        fs::write(&free_file, b"log").unwrap();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o555)).unwrap();

        // root 用户不受权限位限制
        if fs::File::create(sealed.join(".writable")).is_ok() {
            fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let registry = MemoryRegistry::new();
        let leftovers = vec![
            Leftover::new(LeftoverKind::File, locked_file.to_string_lossy()),
            Leftover::new(LeftoverKind::File, free_file.to_string_lossy()),
        ];
        let result = Cleaner::new(&registry).clean(&leftovers);
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.failed_items, 1);
        assert_eq!(result.deleted_items, 1);
        assert_eq!(result.errors[0].0, locked_file.to_string_lossy());
        assert!(result.errors[0].1.starts_with("Permission denied"));
        assert!(result.has_permission_errors());
        assert!(locked_file.exists());
        assert!(!free_file.exists());
    }

    #[test]
    fn failures_are_collected_and_cleaning_continues() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("acme.log");
        fs::write(&log, b"log").unwrap();

        let registry = MemoryRegistry::new();
        let leftovers = vec![
            Leftover::new(LeftoverKind::Registry, r"NOT_A_HIVE\Acme"),
            Leftover::new(LeftoverKind::File, log.to_string_lossy()),
        ];

        let result = Cleaner::new(&registry).clean(&leftovers);

        assert_eq!(result.total_items, 2);
        assert_eq!(result.deleted_items, 1);
        assert_eq!(result.failed_items, 1);
        assert_eq!(result.errors[0].1, "Invalid registry path");
        assert!(!log.exists());
    }
}
