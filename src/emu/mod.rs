//! 网络仿真引擎
//!
//! 用网络命名空间（主机）、Open vSwitch bridge（交换机）、veth 对（链路）和 tc（带宽/时延）
//! 把静态拓扑实例化成可交互的仿真网络，交换机由远端 SDN 控制器管理。

mod controller;
mod net;
pub mod ovs;
mod ping;
pub mod tc;

pub use controller::Controller;
pub use net::EmuNet;
pub use ovs::OpenFlowVersion;
pub use ping::{PingReport, parse_ping};

use thiserror::Error;

use crate::exec::ExecError;
use crate::topo::TopoError;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error(transparent)]
    Topo(#[from] TopoError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("unknown host {0:?}")]
    UnknownHost(String),
    #[error("network is not started")]
    NotStarted,
    #[error("need at least {need} hosts, topology has {have}")]
    TooFewHosts { need: usize, have: usize },
}
