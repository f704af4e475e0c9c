//! 链路时延
//!
//! 以微秒为精度保存时延，文本形式与 tc/netem 接受的写法一致（`25ms`、`250us`）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 链路单向时延（微秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delay(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelayParseError {
    #[error("empty delay string")]
    Empty,
    #[error("invalid delay {0:?}: expected a number with an optional us/ms/s suffix")]
    Invalid(String),
}

impl Delay {
    pub const ZERO: Delay = Delay(0);

    pub fn from_micros(us: u64) -> Delay {
        Delay(us)
    }
    pub fn from_millis(ms: u64) -> Delay {
        Delay(ms.saturating_mul(1_000))
    }
    pub fn from_secs(s: u64) -> Delay {
        Delay(s.saturating_mul(1_000_000))
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 1_000 == 0 {
            write!(f, "{}ms", self.0 / 1_000)
        } else {
            write!(f, "{}us", self.0)
        }
    }
}

impl FromStr for Delay {
    type Err = DelayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DelayParseError::Empty);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| DelayParseError::Invalid(s.to_string()))?;
        // 不带单位时按毫秒处理
        match unit.trim() {
            "" | "ms" => Ok(Delay::from_millis(value)),
            "us" => Ok(Delay::from_micros(value)),
            "s" => Ok(Delay::from_secs(value)),
            _ => Err(DelayParseError::Invalid(s.to_string())),
        }
    }
}

impl TryFrom<String> for Delay {
    type Error = DelayParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Delay> for String {
    fn from(value: Delay) -> Self {
        value.to_string()
    }
}
