use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::config::{self, LoggingConfig};

pub fn init_logging(verbose: bool, settings: &LoggingConfig) {
    let level = if verbose {
        "debug".to_string()
    } else {
        settings.level.to_lowercase()
    };

    let log_dir = settings.log_dir.clone().unwrap_or_else(get_log_dir);
    let _ = std::fs::create_dir_all(&log_dir);

    // 设置文件输出
    let file_appender = tracing_appender::rolling::daily(&log_dir, "yu-cleaner.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // 保持 guard 存活
    std::mem::forget(_guard);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "yu_cleaner={level},yu_cleaner_lib={level},warn"
        )))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let _ = subscriber.try_init();
}

pub fn get_log_dir() -> std::path::PathBuf {
    config::app_home().join("logs")
}
