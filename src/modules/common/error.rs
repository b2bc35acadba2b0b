use thiserror::Error;

#[derive(Error, Debug)]
pub enum UninstallerError {
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid registry path")]
    InvalidRegistryPath,

    #[error("Could not open registry key with any access level")]
    RegistryKeyNotOpened,

    #[error("Could not delete registry key")]
    RegistryKeyNotDeleted,

    #[error("Critical system item: {0}")]
    CriticalSystemItem(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Uninstaller timed out after {0:?}")]
    UninstallTimeout(std::time::Duration),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(String),

    #[error("{0}")]
    Other(String),
}

impl UninstallerError {
    /// 将 io 错误按权限问题和其他错误区分
    pub fn from_io(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            UninstallerError::PermissionDenied(error.to_string())
        } else {
            UninstallerError::FileSystem(error)
        }
    }

    /// 是否为权限相关错误 (用于提示以管理员身份重试)
    pub fn is_permission_related(&self) -> bool {
        match self {
            UninstallerError::PermissionDenied(_) => true,
            UninstallerError::FileSystem(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for UninstallerError {
    fn from(error: serde_json::Error) -> Self {
        UninstallerError::Serde(error.to_string())
    }
}

impl serde::Serialize for UninstallerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_io_errors_map_to_permission_denied() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access is denied");
        let mapped = UninstallerError::from_io(error);

        assert!(mapped.is_permission_related());
        assert!(mapped.to_string().starts_with("Permission denied:"));
    }

    #[test]
    fn registry_failures_use_fixed_messages() {
        assert_eq!(UninstallerError::InvalidRegistryPath.to_string(), "Invalid registry path");
        assert_eq!(
            UninstallerError::RegistryKeyNotDeleted.to_string(),
            "Could not delete registry key"
        );
    }
}
