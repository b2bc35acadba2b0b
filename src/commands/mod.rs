pub mod backups;
pub mod clean;
pub mod list;
pub mod scan;
pub mod snapshot;
pub mod uninstall;

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::modules::common::utils;
use crate::modules::lister::{self, models::ProgramRecord};
use crate::modules::registry::RegistryBackend;
use crate::modules::scanner::models::{Leftover, LeftoverKind};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 列出所有已安装的程序
    List(list::ListCommand),

    /// 扫描程序残留 (只读)
    Scan(scan::ScanCommand),

    /// 备份并清理程序残留
    Clean(clean::CleanCommand),

    /// 运行程序的卸载命令，然后扫描并清理残留
    Uninstall(uninstall::UninstallCommand),

    /// 安装快照: 记录安装前后的系统变化
    Snapshot(snapshot::SnapshotCommand),

    /// 管理清理前的备份
    Backups(backups::BackupsCommand),
}

/// 按名称查找已安装程序，找不到时 (通常已被卸载) 直接使用输入的名称
pub(crate) fn resolve_program(
    registry: &dyn RegistryBackend,
    query: &str,
    publisher: Option<&str>,
) -> ProgramRecord {
    let programs = lister::list_programs(registry, None);

    let mut program = match lister::find_program(&programs, query) {
        Some(found) => {
            tracing::info!("匹配到已安装程序: {}", found.name);
            found.clone()
        }
        None => {
            tracing::info!("未找到已安装程序，按名称扫描: {}", query);
            ProgramRecord::new(query.trim())
        }
    };

    if let Some(publisher) = publisher {
        program.publisher = Some(publisher.to_string());
    }

    program
}

/// 逐行打印残留，最后按类型汇总
pub(crate) fn print_leftovers(leftovers: &[Leftover]) {
    for leftover in leftovers {
        println!("  {}", leftover);
    }

    let count = |kind: LeftoverKind| leftovers.iter().filter(|l| l.kind == kind).count();
    let total_size: u64 = leftovers
        .iter()
        .filter(|l| l.kind.is_filesystem())
        .filter_map(|l| l.size)
        .sum();

    println!("\n--- 统计 ---");
    println!("  文件: {}", count(LeftoverKind::File));
    println!("  目录: {}", count(LeftoverKind::Directory));
    println!("  注册表: {}", count(LeftoverKind::Registry));
    println!("  快捷方式: {}", count(LeftoverKind::Shortcut));
    println!("  占用空间: {}", utils::format_size(total_size));
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    println!("\n结果已保存到: {}", path.display());
    Ok(())
}

pub(crate) fn print_elevation_hint() {
    println!("\n部分项目因权限不足未能删除，请以管理员身份重新运行。");
}
