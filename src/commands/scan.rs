use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::modules::common::config::{AppConfig, ScanConfig};
use crate::modules::registry;
use crate::modules::scanner::models::{Leftover, ScanDepths, ScanSelection};
use crate::modules::scanner::roots::SystemRoots;
use crate::modules::scanner::LeftoverScanner;

#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// 程序名称 (可以是已卸载的程序)
    pub program: String,

    /// 发布者，用于生成额外的搜索模式
    #[arg(long)]
    pub publisher: Option<String>,

    /// 跳过文件扫描
    #[arg(long)]
    pub no_files: bool,

    /// 跳过注册表扫描
    #[arg(long)]
    pub no_registry: bool,

    /// 跳过快捷方式扫描
    #[arg(long)]
    pub no_shortcuts: bool,

    /// 将结果保存为 JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ScanCommand {
    fn selection(&self, config: &ScanConfig) -> ScanSelection {
        let defaults = ScanSelection::from(config);
        ScanSelection {
            files: defaults.files && !self.no_files,
            registry: defaults.registry && !self.no_registry,
            shortcuts: defaults.shortcuts && !self.no_shortcuts,
        }
    }
}

pub async fn execute(cmd: ScanCommand, config: &AppConfig) -> Result<()> {
    println!("正在扫描 \"{}\" 的残留...\n", cmd.program);

    let leftovers = scan_leftovers(
        &cmd.program,
        cmd.publisher.as_deref(),
        cmd.selection(&config.scan),
        ScanDepths::from(&config.scan),
    )
    .await?;

    if leftovers.is_empty() {
        println!("未发现残留。");
        return Ok(());
    }

    println!("找到 {} 个残留:\n", leftovers.len());
    super::print_leftovers(&leftovers);

    if let Some(output) = &cmd.output {
        super::write_json(output, &leftovers)?;
    }

    Ok(())
}

/// 在阻塞线程中查找程序并扫描残留
pub(crate) async fn scan_leftovers(
    query: &str,
    publisher: Option<&str>,
    selection: ScanSelection,
    depths: ScanDepths,
) -> Result<Vec<Leftover>> {
    let query = query.to_string();
    let publisher = publisher.map(str::to_string);

    let leftovers = tokio::task::spawn_blocking(move || {
        let registry = registry::system_registry();
        let program = super::resolve_program(registry.as_ref(), &query, publisher.as_deref());

        let roots = SystemRoots;
        let scanner = LeftoverScanner::new(&roots, registry.as_ref()).with_depths(depths);
        scanner.scan_with_progress(&program, selection, &mut |phase, found| {
            tracing::debug!("扫描阶段 {:?} 完成，累计 {} 项", phase, found);
        })
    })
    .await?;

    Ok(leftovers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        scan: ScanCommand,
    }

    #[test]
    fn flags_only_narrow_the_configured_selection() {
        let cli = TestCli::parse_from(["scan", "Acme", "--no-registry"]);
        let mut config = ScanConfig::default();

        let selection = cli.scan.selection(&config);
        assert!(selection.files && selection.shortcuts && !selection.registry);

        config.scan_files = false;
        assert!(!cli.scan.selection(&config).files);
    }
}
