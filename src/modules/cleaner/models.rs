use serde::{Deserialize, Serialize};

use crate::modules::scanner::models::{Leftover, LeftoverKind};

/// 单项删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// 实际删除
    Deleted,
    /// 目标已不存在
    AlreadyAbsent,
}

/// 清理阶段，用于进度回调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanPhase {
    Backup,
    Delete(LeftoverKind),
}

/// 清理汇总结果
///
/// `total_items == deleted_items + failed_items + absent_items`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanResult {
    pub total_items: usize,
    pub deleted_items: usize,
    pub failed_items: usize,
    /// 清理前已不存在的项目，视为成功但不计入删除数
    pub absent_items: usize,
    /// (路径, 错误信息)，按处理顺序
    pub errors: Vec<(String, String)>,
    pub size_freed: u64,
}

impl CleanResult {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, leftover: &Leftover, removal: Removal) {
        match removal {
            Removal::Deleted => {
                self.deleted_items += 1;
                if leftover.kind.is_filesystem() {
                    self.size_freed += leftover.size.unwrap_or(0);
                }
            }
            Removal::AlreadyAbsent => self.absent_items += 1,
        }
    }

    pub(crate) fn record_failure(&mut self, path: &str, message: String) {
        self.failed_items += 1;
        self.errors.push((path.to_string(), message));
    }

    pub fn is_success(&self) -> bool {
        self.failed_items == 0
    }

    /// 是否存在权限相关的失败 (提示以管理员身份重试)
    pub fn has_permission_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|(_, message)| message.starts_with("Permission denied"))
    }
}
