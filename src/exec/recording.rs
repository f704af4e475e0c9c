//! 只记录、不执行的 runner（dry-run 与测试）

use tracing::info;

use super::{CmdOutput, CommandRunner, ExecError, ShellCommand};

type Responder = Box<dyn FnMut(&ShellCommand) -> CmdOutput>;

/// 记录所有命令，并用 responder 构造返回结果（默认：退出码 0、无输出）
pub struct RecordingRunner {
    commands: Vec<ShellCommand>,
    spawned: Vec<ShellCommand>,
    killed: usize,
    echo: bool,
    responder: Responder,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            spawned: Vec::new(),
            killed: 0,
            echo: false,
            responder: Box::new(|_| CmdOutput::ok("")),
        }
    }
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每条命令以 info 级别记录日志（dry-run 使用）
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn with_responder(mut self, f: impl FnMut(&ShellCommand) -> CmdOutput + 'static) -> Self {
        self.responder = Box::new(f);
        self
    }

    /// 同步执行过的命令（按顺序）
    pub fn commands(&self) -> &[ShellCommand] {
        &self.commands
    }

    /// 后台启动过的命令（按顺序）
    pub fn spawned(&self) -> &[ShellCommand] {
        &self.spawned
    }

    /// kill_background 时仍在"运行"的后台命令总数
    pub fn killed(&self) -> usize {
        self.killed
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.spawned.is_empty()
    }

    /// 同步命令中包含给定子串的条数
    pub fn count_matching(&self, needle: &str) -> usize {
        self.commands.iter().filter(|c| c.line.contains(needle)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, cmd: &ShellCommand) -> Result<CmdOutput, ExecError> {
        if self.echo {
            info!(%cmd, "dry-run");
        }
        self.commands.push(cmd.clone());
        Ok((self.responder)(cmd))
    }

    fn spawn(&mut self, cmd: &ShellCommand) -> Result<(), ExecError> {
        if self.echo {
            info!(%cmd, "dry-run (background)");
        }
        self.spawned.push(cmd.clone());
        Ok(())
    }

    fn kill_background(&mut self) {
        self.killed = self.spawned.len();
    }
}
