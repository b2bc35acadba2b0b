use std::path::Path;

use chrono::{DateTime, Local};
use walkdir::{DirEntry, WalkDir};

use super::models::{Leftover, LeftoverKind};
use super::patterns::PatternSet;
use crate::modules::common::utils;

/// 扫描文件系统残留
///
/// `max_depth` 为 0 时只检查根目录的直接子项。
pub fn scan_filesystem_leftovers<P: AsRef<Path>>(
    roots: &[P],
    patterns: &PatternSet,
    max_depth: usize,
    leftovers: &mut Vec<Leftover>,
) {
    if patterns.is_empty() {
        return;
    }

    for root in roots {
        let root = root.as_ref();
        if !root.is_dir() {
            tracing::debug!("跳过不存在的目录: {}", root.display());
            continue;
        }

        tracing::debug!("扫描目录: {}", root.display());
        scan_directory(root, patterns, max_depth, leftovers);
    }
}

/// 扫描目录，已匹配的目录不再深入
fn scan_directory(root: &Path, patterns: &PatternSet, max_depth: usize, leftovers: &mut Vec<Leftover>) {
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth + 1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                // 权限不足、扫描中被删除、损坏的链接
                tracing::debug!("跳过无法访问的条目: {}", e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !patterns.matches(&name) {
            continue;
        }

        if entry.file_type().is_dir() {
            leftovers.push(directory_leftover(&entry));
            walker.skip_current_dir();
        } else {
            leftovers.push(file_leftover(&entry));
        }
    }
}

fn modified_time(entry: &DirEntry) -> Option<DateTime<Local>> {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Local>::from)
}

fn file_leftover(entry: &DirEntry) -> Leftover {
    let path = entry.path().to_string_lossy().to_string();
    let mut leftover = Leftover::new(LeftoverKind::File, path);

    match entry.metadata() {
        Ok(metadata) => {
            leftover = leftover.with_size(metadata.len());
            if let Some(modified) = modified_time(entry) {
                leftover = leftover.with_last_modified(modified);
            }
        }
        Err(e) => tracing::debug!("无法读取文件信息 {}: {}", entry.path().display(), e),
    }

    leftover
}

fn directory_leftover(entry: &DirEntry) -> Leftover {
    let path = entry.path();
    let size = utils::calculate_dir_size(path);
    let item_count = utils::count_items(path);

    let mut leftover = Leftover::new(LeftoverKind::Directory, path.to_string_lossy().to_string())
        .with_size(size)
        .with_description(format!("Directory with {} items", item_count));

    if let Some(modified) = modified_time(entry) {
        leftover = leftover.with_last_modified(modified);
    }

    leftover
}
