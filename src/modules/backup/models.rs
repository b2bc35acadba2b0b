use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 备份类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Files,
    Registry,
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupKind::Files => write!(f, "files"),
            BackupKind::Registry => write!(f, "registry"),
        }
    }
}

/// 每个备份目录下的 metadata.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub label: String,
    /// 已备份的文件路径或注册表键
    pub items: Vec<String>,
    /// 备份目录，读取时填充
    #[serde(skip)]
    pub path: PathBuf,
}

/// 导出的注册表键 (JSON 树)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryKeyExport {
    pub path: String,
    pub values: Vec<(String, String)>,
    pub subkeys: Vec<RegistryKeyExport>,
}

impl RegistryKeyExport {
    /// 键本身加全部子键的数量
    pub fn key_count(&self) -> usize {
        1 + self.subkeys.iter().map(Self::key_count).sum::<usize>()
    }
}
