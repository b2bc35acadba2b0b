use std::path::{Path, PathBuf};

/// 提供扫描根目录
pub trait ScanRoots {
    /// 程序安装目录和用户/全局数据目录
    fn data_roots(&self) -> Vec<PathBuf>;

    /// 快捷方式所在目录
    fn shortcut_dirs(&self) -> Vec<PathBuf>;
}

/// 从环境变量和系统目录推导的扫描根目录
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRoots;

fn push_unique(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.iter().any(|d| d == &dir) {
        dirs.push(dir);
    }
}

fn start_menu(base: &Path) -> PathBuf {
    base.join("Microsoft").join("Windows").join("Start Menu")
}

impl ScanRoots for SystemRoots {
    fn data_roots(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        // Program Files (含 x86 和 W6432)
        for var in ["ProgramFiles", "ProgramFiles(x86)", "ProgramW6432"] {
            if let Some(path) = std::env::var_os(var) {
                push_unique(&mut dirs, PathBuf::from(path));
            }
        }

        // AppData\Local, AppData\Roaming
        if let Some(local) = dirs::data_local_dir() {
            push_unique(&mut dirs, local);
        }
        if let Some(roaming) = dirs::data_dir() {
            push_unique(&mut dirs, roaming);
        }

        // ProgramData
        if let Some(program_data) = std::env::var_os("ProgramData") {
            push_unique(&mut dirs, PathBuf::from(program_data));
        }

        dirs
    }

    fn shortcut_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        // 用户桌面
        if let Some(desktop) = dirs::desktop_dir() {
            push_unique(&mut dirs, desktop);
        }

        // 开始菜单 - 当前用户
        if let Some(roaming) = dirs::data_dir() {
            let menu = start_menu(&roaming);
            push_unique(&mut dirs, menu.join("Programs"));
            push_unique(&mut dirs, menu);
        }

        // 开始菜单 - 所有用户
        if let Some(program_data) = std::env::var_os("ProgramData") {
            push_unique(&mut dirs, start_menu(Path::new(&program_data)).join("Programs"));
        }

        dirs
    }
}

/// 固定的扫描根目录
#[derive(Debug, Clone, Default)]
pub struct FixedRoots {
    pub data_roots: Vec<PathBuf>,
    pub shortcut_dirs: Vec<PathBuf>,
}

impl FixedRoots {
    pub fn new(data_roots: Vec<PathBuf>, shortcut_dirs: Vec<PathBuf>) -> Self {
        Self {
            data_roots,
            shortcut_dirs,
        }
    }
}

impl ScanRoots for FixedRoots {
    fn data_roots(&self) -> Vec<PathBuf> {
        self.data_roots.clone()
    }

    fn shortcut_dirs(&self) -> Vec<PathBuf> {
        self.shortcut_dirs.clone()
    }
}
