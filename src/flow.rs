//! The data contract between the dashboard and the classification engine.
//!
//! A [`FlowDescriptor`] is one observed network flow: protocol, ports,
//! size/rate figures, and duration. Callers own descriptors until they hand
//! them to the engine, which clones the values it keeps into its result
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport/application protocol of a flow.
///
/// The variant order is meaningful: [`Protocol::ordinal`] is fed to the
/// feature normalizer as `ordinal / 3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
}

impl Protocol {
    /// 0-based position in the protocol enumeration.
    pub fn ordinal(self) -> usize {
        match self {
            Protocol::Tcp => 0,
            Protocol::Udp => 1,
            Protocol::Http => 2,
            Protocol::Https => 3,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        };
        write!(f, "{}", s)
    }
}

/// Number of traffic categories the classifier distinguishes.
pub const CATEGORY_COUNT: usize = 8;

/// Traffic category assigned by the classifier.
///
/// The variant order is load-bearing: it is both the synthetic generator's
/// category index and the classifier's output-dimension index. Do not reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficCategory {
    Web,
    Video,
    FileTransfer,
    Gaming,
    Voip,
    Database,
    Email,
    Unknown,
}

impl TrafficCategory {
    /// All categories, in output-head order.
    pub const ALL: [TrafficCategory; CATEGORY_COUNT] = [
        TrafficCategory::Web,
        TrafficCategory::Video,
        TrafficCategory::FileTransfer,
        TrafficCategory::Gaming,
        TrafficCategory::Voip,
        TrafficCategory::Database,
        TrafficCategory::Email,
        TrafficCategory::Unknown,
    ];

    /// Ordinal position of this category in [`TrafficCategory::ALL`].
    pub fn index(self) -> usize {
        match self {
            TrafficCategory::Web => 0,
            TrafficCategory::Video => 1,
            TrafficCategory::FileTransfer => 2,
            TrafficCategory::Gaming => 3,
            TrafficCategory::Voip => 4,
            TrafficCategory::Database => 5,
            TrafficCategory::Email => 6,
            TrafficCategory::Unknown => 7,
        }
    }

    /// Category at ordinal `idx`, or `None` when out of range.
    pub fn from_index(idx: usize) -> Option<TrafficCategory> {
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for TrafficCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrafficCategory::Web => "web",
            TrafficCategory::Video => "video",
            TrafficCategory::FileTransfer => "file_transfer",
            TrafficCategory::Gaming => "gaming",
            TrafficCategory::Voip => "voip",
            TrafficCategory::Database => "database",
            TrafficCategory::Email => "email",
            TrafficCategory::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One observed network flow, as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowDescriptor {
    /// When the flow was observed (or generated).
    pub timestamp: DateTime<Utc>,
    /// Representative packet size in bytes.
    pub packet_size: u32,
    pub protocol: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
    /// Throughput in bytes per second.
    pub bytes_per_sec: f64,
    /// Throughput in packets per second.
    pub packets_per_sec: f64,
    /// Connection duration in seconds.
    pub duration_secs: f64,
}
