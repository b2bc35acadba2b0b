use anyhow::Result;
use clap::Parser;

use crate::modules::common::config::AppConfig;
use crate::modules::lister::{self, models::ProgramRecord};
use crate::modules::registry;

#[derive(Parser, Debug)]
pub struct ListCommand {
    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,

    /// 搜索关键词 (模糊匹配名称和发布者)
    #[arg(short, long)]
    pub search: Option<String>,
}

pub async fn execute(cmd: ListCommand, _config: &AppConfig) -> Result<()> {
    tracing::info!("列出已安装程序, search: {:?}", cmd.search);

    let search = cmd.search.clone();
    let programs = tokio::task::spawn_blocking(move || {
        let registry = registry::system_registry();
        lister::list_programs(registry.as_ref(), search.as_deref())
    })
    .await?;

    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&programs)?),
        _ => print_table(&programs),
    }

    Ok(())
}

fn print_table(programs: &[ProgramRecord]) {
    println!("\n{}", "=".repeat(90));
    println!("{:<45} {:<28} {:<15}", "名称", "发布者", "版本");
    println!("{}", "=".repeat(90));

    for p in programs {
        println!(
            "{:<45} {:<28} {:<15}",
            truncate_string(&p.name, 44),
            truncate_string(p.publisher.as_deref().unwrap_or_default(), 27),
            truncate_string(p.version.as_deref().unwrap_or_default(), 14),
        );
    }

    println!("{}", "=".repeat(90));
    println!("总计: {} 个程序\n", programs.len());
}

fn truncate_string(s: &str, max_len: usize) -> String {
    // 按字符截断，避免切断中文
    if s.chars().count() > max_len {
        let chars: String = s.chars().take(max_len.saturating_sub(2)).collect();
        format!("{}..", chars)
    } else {
        s.to_string()
    }
}
