//! 外部进程调用
//!
//! 所有对操作系统命令（ovs-vsctl、ip、tc、ping、iperf）的调用都经过 [`CommandRunner`]，
//! 这样拓扑和仿真逻辑既能真正执行，也能只记录命令（dry-run 与测试）。

mod recording;
mod system;

pub use recording::RecordingRunner;
pub use system::SystemRunner;

use std::fmt;

use thiserror::Error;

/// 一条 shell 命令；`netns` 为 Some 时在该主机的网络命名空间里执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub netns: Option<String>,
    pub line: String,
}

impl ShellCommand {
    /// 在根命名空间执行
    pub fn root(line: impl Into<String>) -> Self {
        Self {
            netns: None,
            line: line.into(),
        }
    }

    /// 在主机命名空间内执行
    pub fn on(netns: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            netns: Some(netns.into()),
            line: line.into(),
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.netns {
            Some(ns) => write!(f, "[{ns}] {}", self.line),
            None => f.write_str(&self.line),
        }
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    /// 退出码；被信号终止时为 None
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{cmd}` exited with status {status:?}: {stderr}")]
    Failed {
        cmd: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// 命令执行器
pub trait CommandRunner {
    /// 同步执行，等待结束并收集输出
    fn run(&mut self, cmd: &ShellCommand) -> Result<CmdOutput, ExecError>;

    /// 后台启动，不等待结束
    fn spawn(&mut self, cmd: &ShellCommand) -> Result<(), ExecError>;

    /// 结束所有仍在运行的后台进程
    fn kill_background(&mut self);
}

/// 执行命令，非零退出码视为错误
pub fn run_checked(
    runner: &mut dyn CommandRunner,
    cmd: &ShellCommand,
) -> Result<CmdOutput, ExecError> {
    let out = runner.run(cmd)?;
    if out.success() {
        Ok(out)
    } else {
        Err(ExecError::Failed {
            cmd: cmd.to_string(),
            status: out.status,
            stderr: out.stderr.trim().to_string(),
        })
    }
}

/// 当前进程是否以 root（有效 uid 为 0）运行
pub fn is_root() -> bool {
    // SAFETY: geteuid 没有前置条件，也不会失败
    unsafe { libc::geteuid() == 0 }
}
