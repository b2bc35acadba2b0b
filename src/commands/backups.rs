use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::modules::backup::BackupManager;
use crate::modules::common::config::AppConfig;
use crate::modules::registry;

#[derive(Parser, Debug)]
pub struct BackupsCommand {
    #[command(subcommand)]
    pub action: BackupsAction,
}

#[derive(Subcommand, Debug)]
pub enum BackupsAction {
    /// 列出所有备份
    List,

    /// 删除过期备份
    Prune {
        /// 保留天数 (默认取配置)
        #[arg(long)]
        keep_days: Option<u32>,
    },
}

pub async fn execute(cmd: BackupsCommand, config: &AppConfig) -> Result<()> {
    let registry = registry::system_registry();
    let manager = BackupManager::from_config(config, registry.as_ref());

    match cmd.action {
        BackupsAction::List => {
            let backups = manager.list_backups()?;
            if backups.is_empty() {
                println!("{} 中没有备份。", manager.root().display());
                return Ok(());
            }

            for backup in &backups {
                println!(
                    "  [{}] {} {} ({} 项) - {}",
                    backup.kind,
                    backup.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    backup.label,
                    backup.items.len(),
                    backup.path.display()
                );
            }
            println!("\n总计: {} 个备份", backups.len());
        }
        BackupsAction::Prune { keep_days } => {
            let keep_days = keep_days.unwrap_or(config.backup.keep_days);
            let removed = manager.cleanup_old_backups(keep_days)?;
            println!("已删除 {} 个超过 {} 天的备份", removed, keep_days);
        }
    }

    Ok(())
}
