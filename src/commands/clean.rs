use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::modules::backup::BackupManager;
use crate::modules::cleaner::models::CleanResult;
use crate::modules::cleaner::Cleaner;
use crate::modules::common::config::AppConfig;
use crate::modules::common::utils;
use crate::modules::registry;
use crate::modules::scanner::models::{Leftover, LeftoverKind, ScanDepths, ScanSelection};

#[derive(Parser, Debug)]
pub struct CleanCommand {
    /// 程序名称 (可以是已卸载的程序)
    pub program: String,

    /// 发布者，用于生成额外的搜索模式
    #[arg(long)]
    pub publisher: Option<String>,

    /// 确认删除 (不指定则预览)
    #[arg(long)]
    pub confirm: bool,

    /// 删除前不做备份
    #[arg(long)]
    pub no_backup: bool,

    /// 只清理指定类型 (file|directory|registry|shortcut)，可多次指定
    #[arg(long)]
    pub only: Vec<LeftoverKind>,

    /// 将清理结果保存为 JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(cmd: CleanCommand, config: &AppConfig) -> Result<()> {
    // 1. 扫描残留
    println!("正在扫描 \"{}\" 的残留...", cmd.program);
    let leftovers = super::scan::scan_leftovers(
        &cmd.program,
        cmd.publisher.as_deref(),
        ScanSelection::from(&config.scan),
        ScanDepths::from(&config.scan),
    )
    .await?;

    let leftovers: Vec<Leftover> = leftovers
        .into_iter()
        .filter(|l| cmd.only.is_empty() || cmd.only.contains(&l.kind))
        .collect();

    println!("找到 {} 个残留\n", leftovers.len());
    if leftovers.is_empty() {
        return Ok(());
    }

    // 2. 预览模式
    if !cmd.confirm {
        println!("=== 预览模式 ===");
        println!("使用 --confirm 确认删除\n");
        super::print_leftovers(&leftovers);
        return Ok(());
    }

    // 3. 备份并删除
    println!("=== 开始清理 ===\n");
    let result = clean_leftovers(config, leftovers, !cmd.no_backup).await?;
    print_result(&result);

    if let Some(output) = &cmd.output {
        super::write_json(output, &result)?;
    }

    Ok(())
}

/// 在阻塞线程中备份并删除残留
pub(crate) async fn clean_leftovers(
    config: &AppConfig,
    leftovers: Vec<Leftover>,
    backup: bool,
) -> Result<CleanResult> {
    let config = config.clone();
    let backup = backup && config.backup.enabled;

    let result = tokio::task::spawn_blocking(move || {
        let registry = registry::system_registry();
        let manager = BackupManager::from_config(&config, registry.as_ref());

        let mut cleaner = Cleaner::new(registry.as_ref());
        if backup {
            println!("备份目录: {}", manager.root().display());
            cleaner = cleaner.with_backup(&manager);
        }

        cleaner.clean_with_progress(&leftovers, &mut |phase, done| {
            tracing::debug!("清理阶段 {:?} 完成，累计 {} 项", phase, done);
        })
    })
    .await?;

    Ok(result)
}

pub(crate) fn print_result(result: &CleanResult) {
    println!("\n--- 清理完成 ---");
    println!("  共计: {}", result.total_items);
    println!("  已删除: {}", result.deleted_items);
    println!("  已不存在: {}", result.absent_items);
    println!("  失败: {}", result.failed_items);
    println!("  释放空间: {}", utils::format_size(result.size_freed));

    if !result.errors.is_empty() {
        println!("\n失败项目:");
        for (path, error) in &result.errors {
            println!("  {} - {}", path, error);
        }
    }

    if result.has_permission_errors() {
        super::print_elevation_hint();
    }
}
