//! snapshot 命令 - 安装前后对比，生成并清理安装痕迹

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::modules::common::config::AppConfig;
use crate::modules::common::utils;
use crate::modules::registry;
use crate::modules::scanner::roots::SystemRoots;
use crate::modules::snapshot::models::{ChangeType, InstallationTrace};
use crate::modules::snapshot::{SnapshotScope, SystemSnapshot};

#[derive(Parser, Debug)]
pub struct SnapshotCommand {
    #[command(subcommand)]
    pub action: SnapshotAction,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// 安装前记录系统快照
    Capture {
        /// 快照输出路径
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 安装后与快照比较，保存安装痕迹
    Diff {
        /// 安装前的快照文件
        before: PathBuf,

        /// 安装的程序名称
        #[arg(long)]
        program: String,
    },

    /// 列出已保存的安装痕迹
    Traces,

    /// 按安装痕迹清理新增的文件和注册表键
    Clean {
        /// 安装痕迹文件
        trace: PathBuf,

        /// 确认删除 (不指定则预览)
        #[arg(long)]
        confirm: bool,

        /// 删除前不做备份
        #[arg(long)]
        no_backup: bool,
    },
}

pub async fn execute(cmd: SnapshotCommand, config: &AppConfig) -> Result<()> {
    match cmd.action {
        SnapshotAction::Capture { output } => {
            println!("正在记录系统快照...");
            let snapshot = capture(config).await?;
            snapshot.save(&output)?;
            println!(
                "已记录 {} 个文件, {} 个注册表键",
                snapshot.files.len(),
                snapshot.registry_keys.len()
            );
            println!("快照已保存到: {}", output.display());
        }
        SnapshotAction::Diff { before, program } => {
            let before = SystemSnapshot::load(&before)
                .with_context(|| format!("无法读取快照 {}", before.display()))?;

            println!("正在记录安装后的快照...");
            let after = capture(config).await?;
            let trace = after.trace_since(&before, &program);

            print_trace_summary(&trace);
            let path = trace.save(&config.traces_dir())?;
            println!("\n安装痕迹已保存到: {}", path.display());
        }
        SnapshotAction::Traces => {
            let traces = InstallationTrace::list(&config.traces_dir());
            if traces.is_empty() {
                println!("没有已保存的安装痕迹。");
            }
            for (path, trace) in traces {
                println!(
                    "  {} ({}) - {}",
                    trace.program_name,
                    trace.install_date.format("%Y-%m-%d %H:%M"),
                    path.display()
                );
            }
        }
        SnapshotAction::Clean {
            trace,
            confirm,
            no_backup,
        } => {
            let trace = InstallationTrace::load(&trace)
                .with_context(|| format!("无法读取安装痕迹 {}", trace.display()))?;
            let leftovers = trace.to_leftovers();

            println!("安装痕迹 \"{}\" 包含 {} 个可清理项\n", trace.program_name, leftovers.len());
            if leftovers.is_empty() {
                return Ok(());
            }

            if !confirm {
                println!("=== 预览模式 ===");
                println!("使用 --confirm 确认删除\n");
                super::print_leftovers(&leftovers);
                return Ok(());
            }

            let result = super::clean::clean_leftovers(config, leftovers, !no_backup).await?;
            super::clean::print_result(&result);
        }
    }

    Ok(())
}

async fn capture(config: &AppConfig) -> Result<SystemSnapshot> {
    let scope = SnapshotScope::system(&SystemRoots, &config.scan);

    let snapshot = tokio::task::spawn_blocking(move || {
        let registry = registry::system_registry();
        SystemSnapshot::capture(&scope, registry.as_ref())
    })
    .await?;

    Ok(snapshot)
}

fn print_trace_summary(trace: &InstallationTrace) {
    let count = |change_type: ChangeType| {
        trace
            .file_changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .count()
    };

    println!("\n=== 安装痕迹: {} ===", trace.program_name);
    println!("  新增文件: {}", count(ChangeType::Added));
    println!("  修改文件: {}", count(ChangeType::Modified));
    println!("  删除文件: {}", count(ChangeType::Deleted));
    println!("  注册表变更: {}", trace.registry_changes.len());
    println!("  新增大小: {}", utils::format_size(trace.total_size));
}
