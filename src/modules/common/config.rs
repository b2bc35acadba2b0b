//! 应用配置
//!
//! 配置保存在 `<LocalAppData>/yu-cleaner/config.json`，可通过 `YU_CLEANER_HOME` 覆盖目录。
//! 缺失的字段使用默认值。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::UninstallerError;

pub const HOME_DIR_ENV: &str = "YU_CLEANER_HOME";
const CONFIG_FILE_NAME: &str = "config.json";

/// 应用数据目录
pub fn app_home() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_DIR_ENV) {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yu-cleaner")
}

/// 备份配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub keep_days: u32,
    pub backup_files: bool,
    pub backup_registry: bool,
    pub dir: Option<PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_days: 30,
            backup_files: true,
            backup_registry: true,
            dir: None,
        }
    }
}

/// 扫描配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub scan_files: bool,
    pub scan_registry: bool,
    pub scan_shortcuts: bool,
    pub file_depth: usize,
    pub registry_depth: usize,
    pub shortcut_depth: usize,
    /// 安装快照使用的深度，比残留扫描更深
    pub snapshot_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_files: true,
            scan_registry: true,
            scan_shortcuts: true,
            file_depth: 2,
            registry_depth: 2,
            shortcut_depth: 1,
            snapshot_depth: 5,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backup: BackupConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        app_home().join(CONFIG_FILE_NAME)
    }

    /// 从默认位置加载
    pub fn load() -> Result<Self, UninstallerError> {
        Self::load_from(&Self::default_path())
    }

    /// 文件不存在时返回默认配置
    pub fn load_from(path: &Path) -> Result<Self, UninstallerError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| UninstallerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), UninstallerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("配置已保存到 {}", path.display());
        Ok(())
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .dir
            .clone()
            .unwrap_or_else(|| app_home().join("backups"))
    }

    pub fn traces_dir(&self) -> PathBuf {
        app_home().join("traces")
    }
}
