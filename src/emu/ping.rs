//! 全连通 ping 测试结果

use std::fmt;

/// 解析 ping 输出中的 `N packets transmitted, M received`
///
/// 输出中找不到统计行时返回 None（例如 ping 无法启动）。
pub fn parse_ping(output: &str) -> Option<(u32, u32)> {
    let line = output
        .lines()
        .find(|l| l.contains("packets transmitted"))?;
    let mut parts = line.split(',');
    let sent = parts.next()?.split_whitespace().next()?.parse().ok()?;
    let received = parts
        .next()
        .filter(|p| p.contains("received"))?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some((sent, received))
}

/// pingAll 汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PingReport {
    /// 每个源主机一行：`h1 -> h2 h3 X ...`（X 表示不可达）
    pub lines: Vec<String>,
    pub sent: u32,
    pub received: u32,
}

impl PingReport {
    pub fn dropped(&self) -> u32 {
        self.sent.saturating_sub(self.received)
    }

    /// 丢包率（百分比）；没有发送任何包时为 0
    pub fn drop_pct(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.dropped()) / f64::from(self.sent)
    }
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Ping: testing ping reachability")?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        write!(
            f,
            "*** Results: {:.0}% dropped ({}/{} received)",
            self.drop_pct(),
            self.received,
            self.sent
        )
    }
}
