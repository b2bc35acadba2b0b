use std::path::Path;

use super::models::Removal;
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils::{self, Presence};

/// 删除文件或快捷方式
pub fn delete_file(path: &str) -> Result<Removal, UninstallerError> {
    let target = Path::new(path);

    if utils::probe_path(target) == Presence::Absent {
        return Ok(Removal::AlreadyAbsent);
    }

    std::fs::remove_file(target).map_err(|e| {
        tracing::warn!("删除文件失败 {}: {}", path, e);
        UninstallerError::from_io(e)
    })?;

    tracing::info!("已删除文件: {}", path);
    Ok(Removal::Deleted)
}

/// 删除整个目录树，错误按目录报告
pub fn delete_directory(path: &str) -> Result<Removal, UninstallerError> {
    let target = Path::new(path);

    if utils::probe_path(target) == Presence::Absent {
        return Ok(Removal::AlreadyAbsent);
    }

    std::fs::remove_dir_all(target).map_err(|e| {
        tracing::warn!("删除目录失败 {}: {}", path, e);
        UninstallerError::from_io(e)
    })?;

    tracing::info!("已删除目录: {}", path);
    Ok(Removal::Deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn deleting_a_missing_file_is_already_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        let removal = delete_file(&path.to_string_lossy()).unwrap();
        assert_eq!(removal, Removal::AlreadyAbsent);
    }

    #[test]
    fn file_is_removed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"log").unwrap();

        assert_eq!(delete_file(&path.to_string_lossy()).unwrap(), Removal::Deleted);
        assert!(!path.exists());
    }

    #[test]
    fn directory_tree_is_removed() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("App");
        fs::create_dir_all(app.join("nested").join("deeper")).unwrap();
        fs::write(app.join("nested").join("deeper").join("x.bin"), b"x").unwrap();

        assert_eq!(delete_directory(&app.to_string_lossy()).unwrap(), Removal::Deleted);
        assert!(!app.exists());
        assert_eq!(
            delete_directory(&app.to_string_lossy()).unwrap(),
            Removal::AlreadyAbsent
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_in_read_only_directory_reports_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let sealed = dir.path().join("Sealed");
        fs::create_dir_all(&sealed).unwrap();
        let file = sealed.join("app.log");
        fs::write(&file, b"log").unwrap();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o555)).unwrap();

        // root 用户不受权限位限制
        if fs::File::create(sealed.join(".writable")).is_ok() {
            fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = delete_file(&file.to_string_lossy()).unwrap_err();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(err.is_permission_related());
        assert!(err.to_string().starts_with("Permission denied: "));
        assert!(file.exists());
    }

    #[test]
    fn removing_a_directory_as_a_file_fails() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("App");
        fs::create_dir_all(&app).unwrap();

        assert!(delete_file(&app.to_string_lossy()).is_err());
        assert!(app.exists());
    }
}
