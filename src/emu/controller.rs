//! 远端控制器地址

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// 远端 OpenFlow 控制器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub name: String,
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            name: "controller".to_string(),
            ip: Ipv4Addr::LOCALHOST,
            port: 6633,
        }
    }
}

impl Controller {
    /// `ovs-vsctl set-controller` 使用的目标地址
    pub fn target(&self) -> String {
        format!("tcp:{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.target())
    }
}
