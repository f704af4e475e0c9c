//! 拓扑模块
//!
//! 静态拓扑数据模型，以及冗余双路径的 12 节点环网拓扑。

mod delay;
pub mod loop_mesh;
mod topology;

pub use delay::{Delay, DelayParseError};
pub use topology::{
    Link, LinkDesc, LinkParams, MAX_INTF_LEN, MAX_NODE_NAME_LEN, NodeKind, TopoError, Topology,
    TopologyDesc, intf_name, validate_node_name,
};
