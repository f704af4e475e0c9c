//! 真实执行命令的 runner

use std::process::{Child, Command, Stdio};

use tracing::{debug, trace, warn};

use super::{CmdOutput, CommandRunner, ExecError, ShellCommand};

/// 通过 `sh -c`（或 `ip netns exec <ns> sh -c`）执行命令
#[derive(Debug, Default)]
pub struct SystemRunner {
    background: Vec<(String, Child)>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(cmd: &ShellCommand) -> Command {
        match &cmd.netns {
            Some(ns) => {
                let mut c = Command::new("ip");
                c.args(["netns", "exec", ns.as_str(), "sh", "-c", cmd.line.as_str()]);
                c
            }
            None => {
                let mut c = Command::new("sh");
                c.args(["-c", cmd.line.as_str()]);
                c
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &ShellCommand) -> Result<CmdOutput, ExecError> {
        trace!(%cmd, "执行命令");
        let output = Self::command(cmd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Spawn {
                cmd: cmd.to_string(),
                source,
            })?;
        let out = CmdOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(%cmd, status = ?out.status, "命令结束");
        Ok(out)
    }

    fn spawn(&mut self, cmd: &ShellCommand) -> Result<(), ExecError> {
        let child = Self::command(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                cmd: cmd.to_string(),
                source,
            })?;
        debug!(%cmd, pid = child.id(), "后台进程已启动");
        self.background.push((cmd.to_string(), child));
        Ok(())
    }

    fn kill_background(&mut self) {
        for (cmd, mut child) in self.background.drain(..) {
            if let Err(e) = child.kill() {
                // 进程可能已经自行退出
                trace!(%cmd, error = %e, "kill 失败");
            }
            if let Err(e) = child.wait() {
                warn!(%cmd, error = %e, "回收后台进程失败");
            }
        }
    }
}

impl Drop for SystemRunner {
    fn drop(&mut self) {
        self.kill_background();
    }
}
