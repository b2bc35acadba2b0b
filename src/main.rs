use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use yu_cleaner_lib::commands;
use yu_cleaner_lib::modules::common::config::AppConfig;
use yu_cleaner_lib::modules::common::logging;
use yu_cleaner_lib::UninstallerError;

#[derive(Parser, Debug)]
#[command(name = "yu-cleaner")]
#[command(about = "Windows 卸载残留清理工具", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 配置文件路径
    #[arg(long, global = true, env = "YU_CLEANER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {}", e);
            process::exit(1);
        }
    };

    // 初始化日志
    logging::init_logging(cli.verbose, &config.logging);

    // 执行命令
    let result = match cli.command {
        commands::Command::List(cmd) => commands::list::execute(cmd, &config).await,
        commands::Command::Scan(cmd) => commands::scan::execute(cmd, &config).await,
        commands::Command::Clean(cmd) => commands::clean::execute(cmd, &config).await,
        commands::Command::Uninstall(cmd) => commands::uninstall::execute(cmd, &config).await,
        commands::Command::Snapshot(cmd) => commands::snapshot::execute(cmd, &config).await,
        commands::Command::Backups(cmd) => commands::backups::execute(cmd, &config).await,
    };

    if let Err(e) = result {
        if cli.verbose {
            tracing::error!("错误: {:?}", e);
        } else {
            eprintln!("错误: {}", e);
        }

        let permission_related = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<UninstallerError>())
            .any(UninstallerError::is_permission_related);
        if permission_related {
            eprintln!("请以管理员身份重新运行。");
        }
        process::exit(1);
    }

    Ok(())
}
