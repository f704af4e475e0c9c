//! 链路整形：htb 限速 + netem 时延
//!
//! 与 TCLink 的做法一致，在链路两端的接口上各配置一次。

use crate::topo::LinkParams;

/// 为接口生成 tc 命令序列
pub fn shape(intf: &str, params: &LinkParams) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    let has_delay = params.delay.as_micros() > 0;

    if params.bw_mbit > 0 {
        lines.push(format!(
            "tc qdisc replace dev {intf} root handle 5:0 htb default 1"
        ));
        lines.push(format!(
            "tc class add dev {intf} parent 5:0 classid 5:1 htb rate {}Mbit burst 15k",
            params.bw_mbit
        ));
        if has_delay {
            lines.push(format!(
                "tc qdisc add dev {intf} parent 5:1 handle 10: netem delay {}",
                params.delay
            ));
        }
    } else if has_delay {
        lines.push(format!(
            "tc qdisc replace dev {intf} root handle 10: netem delay {}",
            params.delay
        ));
    }
    lines
}
