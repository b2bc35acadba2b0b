//! 清理前备份
//!
//! 清理器只通过 [`BackupCoordinator`] 请求备份，备份失败不会阻止删除。

pub mod manager;
pub mod models;

use std::path::PathBuf;

use crate::modules::registry::Hive;

pub use manager::BackupManager;

/// 备份协调接口
pub trait BackupCoordinator {
    /// 备份一组文件或目录，失败时返回 None
    fn backup_files(&self, paths: &[String], label: &str) -> Option<PathBuf>;

    /// 备份单个注册表键 (含子键)，失败时返回 None
    fn backup_registry_key(&self, hive: Hive, subpath: &str, label: &str) -> Option<PathBuf>;
}
