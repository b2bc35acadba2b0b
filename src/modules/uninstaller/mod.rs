//! 执行程序自带的卸载命令
//!
//! MSI 安装包改用 `msiexec /x {产品代码}`，其他程序原样执行 `UninstallString`。
//! 不追加静默参数。

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;

use crate::modules::common::error::UninstallerError;
use crate::modules::lister::models::ProgramRecord;

/// MSI 返回 3010 表示成功但需要重启
const MSI_SUCCESS_CODES: [i32; 2] = [0, 3010];

fn product_code_regex() -> &'static Regex {
    static PRODUCT_CODE: OnceLock<Regex> = OnceLock::new();
    PRODUCT_CODE.get_or_init(|| {
        Regex::new(r"\{[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}\}")
            .expect("product code regex is valid")
    })
}

/// 待执行的卸载命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UninstallPlan {
    pub command_line: String,
    pub is_msi: bool,
}

impl UninstallPlan {
    /// 根据程序的 `UninstallString` 生成卸载命令，没有卸载命令时返回 None
    pub fn for_program(program: &ProgramRecord) -> Option<Self> {
        let raw = program.uninstall_string.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        let product_code = product_code_regex().find(raw).map(|m| m.as_str());
        let mentions_msiexec = raw.to_lowercase().contains("msiexec");

        match product_code {
            Some(code) if mentions_msiexec || raw.starts_with('{') => Some(Self {
                command_line: format!("msiexec.exe /x {} /norestart", code),
                is_msi: true,
            }),
            _ => Some(Self {
                command_line: raw.to_string(),
                is_msi: mentions_msiexec,
            }),
        }
    }

    /// 退出码是否表示卸载成功
    ///
    /// 很多非 MSI 卸载程序成功时也返回非 0，只有 MSI 的退出码可信。
    pub fn accepts(&self, exit_code: Option<i32>) -> bool {
        match exit_code {
            Some(code) if self.is_msi => MSI_SUCCESS_CODES.contains(&code),
            Some(_) => true,
            None => false,
        }
    }
}

/// 卸载命令执行结果
#[derive(Debug, Clone, Serialize)]
pub struct UninstallOutcome {
    pub command_line: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub duration: Duration,
}

/// 通过系统 shell 执行卸载命令并等待结束，超时后终止进程
pub async fn run_uninstaller(
    plan: &UninstallPlan,
    timeout: Duration,
) -> Result<UninstallOutcome, UninstallerError> {
    tracing::info!("执行卸载命令: {}", plan.command_line);
    let started = Instant::now();

    let child = shell_command(&plan.command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(UninstallerError::from_io)?;

    // 超时后 child 随 future 一起被丢弃并终止
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            tracing::error!("卸载命令超时 ({:?}): {}", timeout, plan.command_line);
            UninstallerError::UninstallTimeout(timeout)
        })?
        .map_err(UninstallerError::from_io)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        tracing::debug!("stdout: {}", stdout.trim());
    }
    if !stderr.trim().is_empty() {
        tracing::debug!("stderr: {}", stderr.trim());
    }

    let exit_code = output.status.code();
    let success = plan.accepts(exit_code);
    if success {
        tracing::info!("卸载命令结束，退出码 {:?}", exit_code);
    } else {
        tracing::warn!("卸载命令失败，退出码 {:?}", exit_code);
    }

    Ok(UninstallOutcome {
        command_line: plan.command_line.clone(),
        exit_code,
        success,
        duration: started.elapsed(),
    })
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("cmd");
    // UninstallString 自带引号，原样交给 cmd 解析
    command.arg("/C").raw_arg(command_line);
    command
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}
