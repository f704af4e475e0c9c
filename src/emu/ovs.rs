//! Open vSwitch 命令
//!
//! 每个交换机对应一个 OVS bridge，bridge 名与交换机名相同。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::exec::{CommandRunner, ShellCommand};

/// OVS `protocols=` 可接受的 OpenFlow 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpenFlowVersion {
    OpenFlow10,
    OpenFlow11,
    OpenFlow12,
    #[default]
    OpenFlow13,
    OpenFlow14,
    OpenFlow15,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown OpenFlow version {0:?} (expected OpenFlow10..OpenFlow15)")]
pub struct UnknownVersion(String);

impl OpenFlowVersion {
    pub const ALL: [OpenFlowVersion; 6] = [
        OpenFlowVersion::OpenFlow10,
        OpenFlowVersion::OpenFlow11,
        OpenFlowVersion::OpenFlow12,
        OpenFlowVersion::OpenFlow13,
        OpenFlowVersion::OpenFlow14,
        OpenFlowVersion::OpenFlow15,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpenFlowVersion::OpenFlow10 => "OpenFlow10",
            OpenFlowVersion::OpenFlow11 => "OpenFlow11",
            OpenFlowVersion::OpenFlow12 => "OpenFlow12",
            OpenFlowVersion::OpenFlow13 => "OpenFlow13",
            OpenFlowVersion::OpenFlow14 => "OpenFlow14",
            OpenFlowVersion::OpenFlow15 => "OpenFlow15",
        }
    }
}

impl fmt::Display for OpenFlowVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenFlowVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVersion(s.to_string()))
    }
}

/// 由交换机名中的数字推导 datapath id（`s12` -> `000000000000000c`）
pub fn dpid_for(switch: &str) -> Option<String> {
    let digits: String = switch.chars().filter(|c| c.is_ascii_digit()).collect();
    let n: u64 = digits.parse().ok()?;
    Some(format!("{n:016x}"))
}

/// 创建 bridge 并接到远端控制器
pub fn add_bridge(switch: &str, controller_target: &str) -> String {
    let mut line = format!("ovs-vsctl --may-exist add-br {switch}");
    if let Some(dpid) = dpid_for(switch) {
        line.push_str(&format!(
            " -- set bridge {switch} other-config:datapath-id={dpid}"
        ));
    }
    line.push_str(&format!(
        " -- set-fail-mode {switch} secure -- set-controller {switch} {controller_target}"
    ));
    line
}

pub fn add_port(switch: &str, intf: &str) -> String {
    format!("ovs-vsctl --may-exist add-port {switch} {intf}")
}

pub fn del_bridge(switch: &str) -> String {
    format!("ovs-vsctl --if-exists del-br {switch}")
}

/// 固定 bridge 使用的 OpenFlow 版本
pub fn set_protocols(switch: &str, version: OpenFlowVersion) -> String {
    format!("ovs-vsctl set bridge {switch} protocols={version}")
}

/// 为每台交换机发出一条设置协议版本的命令。
///
/// 不检查退出码，也不重试；失败只记 debug 日志。返回发出的命令数。
pub fn pin_protocols(
    switches: &[String],
    runner: &mut dyn CommandRunner,
    version: OpenFlowVersion,
) -> usize {
    let mut issued = 0;
    for sw in switches {
        let cmd = ShellCommand::root(set_protocols(sw, version));
        match runner.run(&cmd) {
            Ok(out) if !out.success() => {
                debug!(switch = %sw, status = ?out.status, "设置协议版本失败，忽略")
            }
            Err(e) => debug!(switch = %sw, error = %e, "设置协议版本命令无法执行，忽略"),
            Ok(_) => {}
        }
        issued += 1;
    }
    issued
}
