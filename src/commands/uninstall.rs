//! uninstall 命令 - 备份注册信息、运行卸载程序，然后扫描并清理残留

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::modules::backup::{BackupCoordinator, BackupManager};
use crate::modules::common::config::AppConfig;
use crate::modules::lister::{self, models::ProgramRecord};
use crate::modules::registry::{self, parse_registry_path};
use crate::modules::scanner::models::{ScanDepths, ScanSelection};
use crate::modules::uninstaller::{self, UninstallPlan};

#[derive(Parser, Debug)]
pub struct UninstallCommand {
    /// 程序名称
    pub program: String,

    /// 指定卸载命令 (程序不在已安装列表中时使用)
    #[arg(long)]
    pub uninstall_string: Option<String>,

    /// 不备份注册表信息和残留
    #[arg(long)]
    pub no_backup: bool,

    /// 卸载后不扫描残留
    #[arg(long)]
    pub no_scan: bool,

    /// 直接清理扫描到的残留 (不指定则预览)
    #[arg(long)]
    pub confirm: bool,

    /// 等待卸载程序结束的超时时间 (秒)
    #[arg(long, default_value = "600")]
    pub timeout: u64,
}

pub async fn execute(cmd: UninstallCommand, config: &AppConfig) -> Result<()> {
    println!("=== 卸载程序: {} ===\n", cmd.program);

    // 1. 查找程序
    println!("[1/4] 查找程序...");
    let program = find_program(&cmd.program, cmd.uninstall_string.as_deref()).await?;
    println!("  - 程序: {}", program.name);
    if let Some(publisher) = &program.publisher {
        println!("  - 发布者: {}", publisher);
    }
    if let Some(version) = &program.version {
        println!("  - 版本: {}", version);
    }

    let Some(plan) = UninstallPlan::for_program(&program) else {
        bail!("\"{}\" 没有卸载命令，可使用 --uninstall-string 指定", program.name);
    };

    // 2. 备份 Uninstall 注册表项
    let backup = !cmd.no_backup && config.backup.enabled;
    if backup {
        println!("\n[2/4] 备份注册表信息...");
        backup_uninstall_key(config, &program).await?;
    } else {
        println!("\n[2/4] 跳过备份");
    }

    // 3. 执行卸载命令
    println!("\n[3/4] 执行卸载命令并等待结束...");
    println!("  - 命令: {}", plan.command_line);
    match uninstaller::run_uninstaller(&plan, Duration::from_secs(cmd.timeout)).await {
        Ok(outcome) if outcome.success => {
            println!(
                "  - 卸载完成，退出码 {:?}，耗时 {:.1} 秒",
                outcome.exit_code,
                outcome.duration.as_secs_f64()
            );
        }
        Ok(outcome) => {
            println!("  - 警告: 卸载程序返回失败，退出码 {:?}", outcome.exit_code);
        }
        Err(e) => {
            println!("  - 警告: {}", e);
        }
    }

    // 4. 扫描并清理残留
    if cmd.no_scan {
        println!("\n[4/4] 跳过残留扫描");
        return Ok(());
    }

    println!("\n[4/4] 扫描残留...");
    let leftovers = super::scan::scan_leftovers(
        &program.name,
        program.publisher.as_deref(),
        ScanSelection::from(&config.scan),
        ScanDepths::from(&config.scan),
    )
    .await?;

    if leftovers.is_empty() {
        println!("  未发现残留。");
        return Ok(());
    }

    println!("  找到 {} 个残留\n", leftovers.len());
    if !cmd.confirm {
        super::print_leftovers(&leftovers);
        println!("\n使用 --confirm 确认删除，或稍后运行 clean 命令");
        return Ok(());
    }

    let result = super::clean::clean_leftovers(config, leftovers, backup).await?;
    super::clean::print_result(&result);

    Ok(())
}

/// 在已安装程序中查找，找不到时只能使用手动指定的卸载命令
async fn find_program(query: &str, uninstall_string: Option<&str>) -> Result<ProgramRecord> {
    let query = query.to_string();

    let found = tokio::task::spawn_blocking({
        let query = query.clone();
        move || {
            let registry = registry::system_registry();
            let programs = lister::list_programs(registry.as_ref(), None);
            lister::find_program(&programs, &query).cloned()
        }
    })
    .await?;

    let program = match (found, uninstall_string) {
        (Some(mut program), Some(command)) => {
            program.uninstall_string = Some(command.to_string());
            program
        }
        (Some(program), None) => program,
        (None, Some(command)) => {
            let mut program = ProgramRecord::new(query.trim());
            program.uninstall_string = Some(command.to_string());
            program
        }
        (None, None) => bail!("未找到已安装程序: {}", query),
    };

    Ok(program)
}

/// 备份程序所在的 Uninstall 注册表项，失败只提示不中断
async fn backup_uninstall_key(config: &AppConfig, program: &ProgramRecord) -> Result<()> {
    let Some(key) = program.registry_key.clone() else {
        println!("  - 没有注册表信息可备份");
        return Ok(());
    };

    let config = config.clone();
    let label = format!("uninstall_{}", program.name);

    let saved = tokio::task::spawn_blocking(move || {
        let (hive, subpath) = parse_registry_path(&key)?;
        let registry = registry::system_registry();
        let manager = BackupManager::from_config(&config, registry.as_ref());
        manager.backup_registry_key(hive, subpath, &label)
    })
    .await?;

    match saved {
        Some(path) => println!("  - 已备份到: {}", path.display()),
        None => println!("  - 警告: 注册表信息备份失败，继续卸载"),
    }

    Ok(())
}
