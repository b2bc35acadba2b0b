pub mod filesystem;
pub mod models;
pub mod patterns;
pub mod registry;
pub mod roots;
pub mod shortcuts;

use crate::modules::lister::models::ProgramRecord;
use crate::modules::registry::RegistryBackend;
use models::{Leftover, ScanDepths, ScanPhase, ScanSelection};
use patterns::PatternSet;
use roots::ScanRoots;

/// 残留扫描器
///
/// 每次调用使用独立的结果列表，扫描器本身不保存状态。
pub struct LeftoverScanner<'a> {
    roots: &'a dyn ScanRoots,
    registry: &'a dyn RegistryBackend,
    depths: ScanDepths,
}

impl<'a> LeftoverScanner<'a> {
    pub fn new(roots: &'a dyn ScanRoots, registry: &'a dyn RegistryBackend) -> Self {
        Self {
            roots,
            registry,
            depths: ScanDepths::default(),
        }
    }

    pub fn with_depths(mut self, depths: ScanDepths) -> Self {
        self.depths = depths;
        self
    }

    /// 扫描程序残留
    pub fn scan(&self, program: &ProgramRecord, selection: ScanSelection) -> Vec<Leftover> {
        self.scan_with_progress(program, selection, &mut |_, _| {})
    }

    /// 扫描程序残留，每完成一个阶段回调一次 (阶段, 当前累计数量)
    pub fn scan_with_progress(
        &self,
        program: &ProgramRecord,
        selection: ScanSelection,
        progress: &mut dyn FnMut(ScanPhase, usize),
    ) -> Vec<Leftover> {
        tracing::info!("开始扫描残留: {}", program.name);

        let patterns = PatternSet::generate(program);
        let mut leftovers = Vec::new();

        if patterns.is_empty() {
            tracing::warn!("程序名称过短，无法生成搜索模式: {:?}", program.name);
            return leftovers;
        }

        if selection.files {
            tracing::info!("正在扫描残留文件...");
            let roots = self.roots.data_roots();
            filesystem::scan_filesystem_leftovers(&roots, &patterns, self.depths.files, &mut leftovers);
            progress(ScanPhase::Files, leftovers.len());
        }

        if selection.registry {
            tracing::info!("正在扫描注册表...");
            registry::scan_registry_leftovers(
                self.registry,
                &patterns,
                self.depths.registry,
                &mut leftovers,
            );
            progress(ScanPhase::Registry, leftovers.len());
        }

        if selection.shortcuts {
            tracing::info!("正在扫描快捷方式...");
            let dirs = self.roots.shortcut_dirs();
            shortcuts::scan_shortcut_leftovers(&dirs, &patterns, self.depths.shortcuts, &mut leftovers);
            progress(ScanPhase::Shortcuts, leftovers.len());
        }

        tracing::info!("扫描完成，找到 {} 个残留项", leftovers.len());
        leftovers
    }
}
