use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::modules::common::config::ScanConfig;
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils;

/// 残留类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftoverKind {
    /// 文件
    File,
    /// 目录 (整体删除)
    Directory,
    /// 注册表键
    Registry,
    /// 快捷方式 (.lnk)
    Shortcut,
}

impl LeftoverKind {
    /// 清理顺序: 快捷方式 -> 文件 -> 目录 -> 注册表
    pub const CLEAN_ORDER: [LeftoverKind; 4] = [
        LeftoverKind::Shortcut,
        LeftoverKind::File,
        LeftoverKind::Directory,
        LeftoverKind::Registry,
    ];

    /// 单行展示用的标签
    pub fn tag(self) -> &'static str {
        match self {
            LeftoverKind::File => "[File]",
            LeftoverKind::Directory => "[Dir]",
            LeftoverKind::Registry => "[Reg]",
            LeftoverKind::Shortcut => "[Link]",
        }
    }

    pub fn is_filesystem(self) -> bool {
        matches!(self, LeftoverKind::File | LeftoverKind::Directory)
    }
}

impl std::fmt::Display for LeftoverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeftoverKind::File => write!(f, "file"),
            LeftoverKind::Directory => write!(f, "directory"),
            LeftoverKind::Registry => write!(f, "registry"),
            LeftoverKind::Shortcut => write!(f, "shortcut"),
        }
    }
}

impl std::str::FromStr for LeftoverKind {
    type Err = UninstallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "files" => Ok(LeftoverKind::File),
            "dir" | "directory" | "directories" => Ok(LeftoverKind::Directory),
            "reg" | "registry" => Ok(LeftoverKind::Registry),
            "link" | "shortcut" | "shortcuts" => Ok(LeftoverKind::Shortcut),
            other => Err(UninstallerError::Other(format!("unknown leftover type: {}", other))),
        }
    }
}

/// 一个残留项目，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leftover {
    #[serde(rename = "type")]
    pub kind: LeftoverKind,
    pub path: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Local>>,
    pub description: Option<String>,
}

impl Leftover {
    pub fn new(kind: LeftoverKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            size: None,
            last_modified: None,
            description: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_last_modified(mut self, modified: DateTime<Local>) -> Self {
        self.last_modified = Some(modified);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Display for Leftover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.tag(), self.path)?;
        if let Some(size) = self.size {
            write!(f, " ({})", utils::format_size(size))?;
        }
        Ok(())
    }
}

/// 扫描深度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanDepths {
    pub files: usize,
    pub registry: usize,
    /// 1 表示只看目录本身的直接子项
    pub shortcuts: usize,
}

impl Default for ScanDepths {
    fn default() -> Self {
        Self {
            files: 2,
            registry: 2,
            shortcuts: 1,
        }
    }
}

impl From<&ScanConfig> for ScanDepths {
    fn from(config: &ScanConfig) -> Self {
        Self {
            files: config.file_depth,
            registry: config.registry_depth,
            shortcuts: config.shortcut_depth,
        }
    }
}

/// 需要执行的扫描类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSelection {
    pub files: bool,
    pub registry: bool,
    pub shortcuts: bool,
}

impl Default for ScanSelection {
    fn default() -> Self {
        Self {
            files: true,
            registry: true,
            shortcuts: true,
        }
    }
}

impl From<&ScanConfig> for ScanSelection {
    fn from(config: &ScanConfig) -> Self {
        Self {
            files: config.scan_files,
            registry: config.scan_registry,
            shortcuts: config.scan_shortcuts,
        }
    }
}

/// 扫描阶段，用于进度回调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Files,
    Registry,
    Shortcuts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_short_tags_and_size_suffix() {
        let file = Leftover::new(LeftoverKind::File, r"C:\App\app.log").with_size(1536);
        assert_eq!(file.to_string(), r"[File] C:\App\app.log (1.5 KB)");

        let dir = Leftover::new(LeftoverKind::Directory, r"C:\App").with_size(0);
        assert_eq!(dir.to_string(), r"[Dir] C:\App (0.0 B)");

        let key = Leftover::new(LeftoverKind::Registry, r"HKEY_CURRENT_USER\Software\App");
        assert_eq!(key.to_string(), r"[Reg] HKEY_CURRENT_USER\Software\App");

        let link = Leftover::new(LeftoverKind::Shortcut, r"C:\Users\me\Desktop\App.lnk");
        assert_eq!(link.to_string(), r"[Link] C:\Users\me\Desktop\App.lnk");
    }

    #[test]
    fn serializes_with_export_field_names() {
        let leftover = Leftover::new(LeftoverKind::Directory, "/tmp/app")
            .with_size(10)
            .with_description("Directory with 2 items");
        let json = serde_json::to_value(&leftover).unwrap();

        assert_eq!(json["type"], "directory");
        assert_eq!(json["path"], "/tmp/app");
        assert_eq!(json["size"], 10);
        assert!(json["last_modified"].is_null());
        assert_eq!(json["description"], "Directory with 2 items");
    }

    #[test]
    fn kinds_parse_from_cli_words() {
        assert_eq!("dir".parse::<LeftoverKind>().unwrap(), LeftoverKind::Directory);
        assert_eq!("Registry".parse::<LeftoverKind>().unwrap(), LeftoverKind::Registry);
        assert!("service".parse::<LeftoverKind>().is_err());
    }
}
