use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::path::Path;
use walkdir::WalkDir;

/// 路径存在状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    AccessDenied,
}

/// 探测文件系统路径 (不跟随符号链接)
pub fn probe_path(path: &Path) -> Presence {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Presence::Present,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Presence::Absent,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Presence::AccessDenied,
        // 其他错误交给删除操作报告
        Err(_) => Presence::Present,
    }
}

/// 计算目录大小，无法访问的条目计为 0
pub fn calculate_dir_size(path: &Path) -> u64 {
    if path.is_file() {
        return path.metadata().map(|m| m.len()).unwrap_or(0);
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// 统计目录下的全部条目数量 (不含目录本身)
pub fn count_items(path: &Path) -> usize {
    WalkDir::new(path)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .count()
}

/// 格式化文件大小 (1024 进制，保留一位小数)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }

    format!("{:.1} TB", size)
}

/// 获取模糊匹配分数
pub fn fuzzy_score(text: &str, pattern: &str) -> Option<i64> {
    let matcher = SkimMatcherV2::default().ignore_case();
    matcher.fuzzy_match(text, pattern)
}
