//! 诊断测试：全连通 ping 与 iperf 带宽测试
//!
//! 两者都只是调用外部工具并保留原始输出，不做解析或判定。

use tracing::{debug, info};

use crate::emu::{EmuError, EmuNet, PingReport};

/// 全连通 ping，直接委托给仿真网络
pub fn ping_test(net: &mut EmuNet<'_>) -> Result<PingReport, EmuError> {
    debug!("Start Test all network");
    net.ping_all(1)
}

/// iperf UDP 测试参数
#[derive(Debug, Clone)]
pub struct IperfOpts {
    pub duration_s: u32,
    pub interval_s: u32,
    /// iperf `-b` 参数，例如 `20m`
    pub bandwidth: String,
    /// 第一个服务端（与客户端不同 pod）的输出文件
    pub different_pod_result: String,
    /// 第二个服务端（与客户端同 pod）的输出文件
    pub same_pod_result: String,
}

impl Default for IperfOpts {
    fn default() -> Self {
        Self {
            duration_s: 10,
            interval_s: 1,
            bandwidth: "20m".to_string(),
            different_pod_result: "iperf_server_differentPod_result".to_string(),
            same_pod_result: "iperf_server_samePod_result".to_string(),
        }
    }
}

/// 一次客户端运行的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IperfRun {
    pub client: String,
    pub server: String,
    pub command: String,
    pub output: String,
}

/// 前两台主机后台运行 UDP 服务端，第三台主机依次向两者发流量。
///
/// 服务端进程一直运行到网络停止。
pub fn iperf_test(net: &mut EmuNet<'_>, opts: &IperfOpts) -> Result<Vec<IperfRun>, EmuError> {
    debug!("Start iperfTEST");
    let hosts = net.topology().hosts();
    if hosts.len() < 3 {
        return Err(EmuError::TooFewHosts {
            need: 3,
            have: hosts.len(),
        });
    }
    let (h0, h1, h2) = (hosts[0].clone(), hosts[1].clone(), hosts[2].clone());

    let server = |file: &str| format!("iperf -s -u -i {} > {file}", opts.interval_s);
    net.host_popen(&h0, &server(&opts.different_pod_result))?;
    net.host_popen(&h1, &server(&opts.same_pod_result))?;

    let mut runs = Vec::with_capacity(2);
    for target in [&h0, &h1] {
        let ip = net.host_ip(target)?;
        let command = format!(
            "iperf -c {ip} -u -t {} -i {} -b {}",
            opts.duration_s, opts.interval_s, opts.bandwidth
        );
        info!(client = %h2, server = %target, %command, "iperf client");
        let out = net.host_cmd(&h2, &command)?;
        runs.push(IperfRun {
            client: h2.clone(),
            server: target.clone(),
            command,
            output: out.stdout,
        });
    }
    Ok(runs)
}
