//! 注册表抽象层
//!
//! 扫描器、清理器和备份只依赖 [`RegistryBackend`]，Windows 上由 winreg 实现，
//! 其他平台及测试使用内存实现。

pub mod memory;
#[cfg(windows)]
pub mod windows;

use serde::{Deserialize, Serialize};

use crate::modules::common::error::UninstallerError;

pub use memory::MemoryRegistry;
#[cfg(windows)]
pub use self::windows::WinRegistry;

/// 注册表根键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
    ClassesRoot,
    Users,
    CurrentConfig,
}

/// 根键名称表: (完整名称, 缩写)
const HIVE_NAMES: [(Hive, &str, &str); 5] = [
    (Hive::LocalMachine, "HKEY_LOCAL_MACHINE", "HKLM"),
    (Hive::CurrentUser, "HKEY_CURRENT_USER", "HKCU"),
    (Hive::ClassesRoot, "HKEY_CLASSES_ROOT", "HKCR"),
    (Hive::Users, "HKEY_USERS", "HKU"),
    (Hive::CurrentConfig, "HKEY_CURRENT_CONFIG", "HKCC"),
];

impl Hive {
    /// 规范名称，例如 `HKEY_LOCAL_MACHINE`
    pub fn canonical_name(self) -> &'static str {
        HIVE_NAMES
            .iter()
            .find(|(hive, _, _)| *hive == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn alias(self) -> &'static str {
        HIVE_NAMES
            .iter()
            .find(|(hive, _, _)| *hive == self)
            .map(|(_, _, alias)| *alias)
            .unwrap_or("UNKNOWN")
    }

    /// 拼接完整路径 `HIVE\sub\path`
    pub fn join(self, subpath: &str) -> String {
        format!("{}\\{}", self.canonical_name(), subpath)
    }
}

impl std::fmt::Display for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// 注册表重定向视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryView {
    /// KEY_WOW64_64KEY
    View64,
    /// KEY_WOW64_32KEY
    View32,
    /// 不指定视图
    Default,
}

impl RegistryView {
    /// 删除时依次尝试的视图顺序
    pub const FALLBACK_ORDER: [RegistryView; 3] =
        [RegistryView::View64, RegistryView::View32, RegistryView::Default];
}

/// 注册表键存在状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Present,
    Absent,
    AccessDenied,
}

/// 注册表访问接口
pub trait RegistryBackend: Send + Sync {
    /// 探测键是否存在
    fn key_state(&self, hive: Hive, path: &str, view: RegistryView) -> KeyState;

    /// 打开键并列出直接子键
    fn subkeys(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<String>, UninstallerError>;

    /// 列出键下的值，非字符串值以其文本形式返回
    fn values(
        &self,
        hive: Hive,
        path: &str,
        view: RegistryView,
    ) -> Result<Vec<(String, String)>, UninstallerError>;

    /// 读取字符串值，值不存在或类型不符时返回 None
    fn read_string(&self, hive: Hive, path: &str, view: RegistryView, name: &str)
        -> Option<String>;

    /// 删除单个键 (不递归，有子键时失败)
    fn delete_key(&self, hive: Hive, path: &str, view: RegistryView)
        -> Result<(), UninstallerError>;
}

/// 当前平台的默认注册表实现
#[cfg(windows)]
pub fn system_registry() -> Box<dyn RegistryBackend> {
    Box::new(WinRegistry)
}

/// 非 Windows 平台没有注册表，返回空的内存实现
#[cfg(not(windows))]
pub fn system_registry() -> Box<dyn RegistryBackend> {
    Box::new(MemoryRegistry::new())
}

/// 解析注册表路径 `HKLM\Software\X` -> (Hive, "Software\X")
///
/// 根键前缀不区分大小写，子路径不能为空。
pub fn parse_registry_path(path: &str) -> Option<(Hive, &str)> {
    let path = path.trim();
    let (prefix, rest) = path.split_once('\\')?;

    let hive = HIVE_NAMES
        .iter()
        .find(|(_, name, alias)| {
            prefix.eq_ignore_ascii_case(name) || prefix.eq_ignore_ascii_case(alias)
        })
        .map(|(hive, _, _)| *hive)?;

    let subpath = rest.trim_matches('\\');
    if subpath.is_empty() {
        return None;
    }

    Some((hive, subpath))
}
