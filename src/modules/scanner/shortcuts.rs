use std::path::Path;

use walkdir::WalkDir;

use super::models::{Leftover, LeftoverKind};
use super::patterns::PatternSet;

fn is_link_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("lnk"))
        .unwrap_or(false)
}

/// 扫描快捷方式残留
pub fn scan_shortcut_leftovers<P: AsRef<Path>>(
    dirs: &[P],
    patterns: &PatternSet,
    max_depth: usize,
    leftovers: &mut Vec<Leftover>,
) {
    if patterns.is_empty() {
        return;
    }

    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            continue;
        }

        scan_shortcuts_in_dir(dir, patterns, max_depth, leftovers);
    }
}

/// 在目录中扫描快捷方式
fn scan_shortcuts_in_dir(dir: &Path, patterns: &PatternSet, max_depth: usize, leftovers: &mut Vec<Leftover>) {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth.max(1))
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if entry.file_type().is_dir() || !is_link_file(path) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if patterns.matches(&name) {
            leftovers.push(Leftover::new(
                LeftoverKind::Shortcut,
                path.to_string_lossy().to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::lister::models::ProgramRecord;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn only_matching_link_files_in_the_directory_are_reported() {
        let desktop = tempdir().unwrap();
        fs::write(desktop.path().join("Acme Widget.lnk"), b"").unwrap();
        fs::write(desktop.path().join("ACME WIDGET HELP.LNK"), b"").unwrap();
        fs::write(desktop.path().join("Acme Widget.txt"), b"").unwrap();
        fs::write(desktop.path().join("Other.lnk"), b"").unwrap();
        fs::create_dir_all(desktop.path().join("Folder")).unwrap();
        fs::write(desktop.path().join("Folder").join("Acme Widget.lnk"), b"").unwrap();

        let patterns = PatternSet::generate(&ProgramRecord::new("Acme Widget"));
        let mut leftovers = Vec::new();
        scan_shortcut_leftovers(&[desktop.path()], &patterns, 1, &mut leftovers);

        assert_eq!(leftovers.len(), 2);
        assert!(leftovers.iter().all(|l| l.kind == LeftoverKind::Shortcut));
        assert!(leftovers.iter().all(|l| !l.path.contains("Folder")));
    }
}
