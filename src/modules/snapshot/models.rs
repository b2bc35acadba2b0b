use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::modules::common::error::UninstallerError;
use crate::modules::scanner::models::{Leftover, LeftoverKind};

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// 文件变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change_type: ChangeType,
    pub size: Option<u64>,
    pub timestamp: Option<DateTime<Local>>,
}

/// 注册表变更，`value_name` 为空表示整个键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryChange {
    pub key_path: String,
    pub change_type: ChangeType,
    pub value_name: Option<String>,
    pub value_data: Option<String>,
}

/// 一次安装产生的全部变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationTrace {
    pub program_name: String,
    pub install_date: DateTime<Local>,
    pub file_changes: Vec<FileChange>,
    pub registry_changes: Vec<RegistryChange>,
    /// 新增文件的总大小
    pub total_size: u64,
}

impl InstallationTrace {
    /// 保存到 `dir/<程序名>_<时间戳>.json`
    pub fn save(&self, dir: &Path) -> Result<PathBuf, UninstallerError> {
        std::fs::create_dir_all(dir)?;

        let safe_name: String = self
            .program_name
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let file_name = format!(
            "{}_{}.json",
            safe_name.trim(),
            self.install_date.format("%Y%m%d_%H%M%S")
        );

        let path = dir.join(file_name);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("安装痕迹已保存到 {}", path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, UninstallerError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 列出目录中所有可读取的安装痕迹
    pub fn list(dir: &Path) -> Vec<(PathBuf, Self)> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut traces: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .filter_map(|path| match Self::load(&path) {
                Ok(trace) => Some((path, trace)),
                Err(e) => {
                    tracing::warn!("读取安装痕迹失败 {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        traces.sort_by(|a, b| b.1.install_date.cmp(&a.1.install_date));
        traces
    }

    /// 新增的文件和注册表键转换为可清理的残留
    pub fn to_leftovers(&self) -> Vec<Leftover> {
        let files = self
            .file_changes
            .iter()
            .filter(|change| change.change_type == ChangeType::Added)
            .map(|change| {
                let leftover = Leftover::new(LeftoverKind::File, &change.path);
                match change.size {
                    Some(size) => leftover.with_size(size),
                    None => leftover,
                }
            });

        let keys = self
            .registry_changes
            .iter()
            .filter(|change| change.change_type == ChangeType::Added && change.value_name.is_none())
            .map(|change| Leftover::new(LeftoverKind::Registry, &change.key_path));

        files.chain(keys).collect()
    }
}
