use serde::{Deserialize, Serialize};

/// 已安装程序
///
/// 扫描和清理只使用 `name` 与 `publisher`，其余字段用于展示。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub name: String,
    pub publisher: Option<String>,
    pub version: Option<String>,
    pub install_location: Option<String>,
    pub uninstall_string: Option<String>,
    /// 程序所在的 Uninstall 注册表键
    pub registry_key: Option<String>,
}

impl ProgramRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }
}
