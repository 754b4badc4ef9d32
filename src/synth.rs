//! Synthetic flow generation for model training.
//!
//! Each traffic category gets a [`CategoryProfile`]: a set of uniform ranges
//! (and candidate port/protocol lists) its flows are drawn from. The exact
//! numbers are an implementation parameter, not a contract — what matters is
//! that the eight categories stay separable in feature space, so a classifier
//! trained on this generator can tell them apart well above chance.

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::flow::{FlowDescriptor, Protocol, TrafficCategory};

/// How a profile draws a port.
#[derive(Clone, Copy, Debug)]
pub enum PortSpec {
    /// Uniform over an inclusive range.
    Range(u16, u16),
    /// Uniform over a fixed list of well-known ports.
    Choice(&'static [u16]),
}

impl PortSpec {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u16 {
        match *self {
            PortSpec::Range(lo, hi) => rng.gen_range(lo..=hi),
            // Lists are compile-time constants and never empty.
            PortSpec::Choice(ports) => ports.choose(rng).copied().unwrap_or(0),
        }
    }

    fn contains(&self, port: u16) -> bool {
        match *self {
            PortSpec::Range(lo, hi) => (lo..=hi).contains(&port),
            PortSpec::Choice(ports) => ports.contains(&port),
        }
    }
}

/// Uniform field ranges for one traffic category.
#[derive(Clone, Copy, Debug)]
pub struct CategoryProfile {
    /// Packet size range, bytes (inclusive).
    pub packet_size: (u32, u32),
    pub protocols: &'static [Protocol],
    pub src_ports: PortSpec,
    pub dst_ports: PortSpec,
    /// Bytes/sec range.
    pub bytes_per_sec: (f64, f64),
    /// Packets/sec range.
    pub packets_per_sec: (f64, f64),
    /// Duration range, seconds.
    pub duration_secs: (f64, f64),
}

impl CategoryProfile {
    /// Whether `flow` lies inside every range of this profile.
    pub fn contains(&self, flow: &FlowDescriptor) -> bool {
        (self.packet_size.0..=self.packet_size.1).contains(&flow.packet_size)
            && self.protocols.contains(&flow.protocol)
            && self.src_ports.contains(flow.src_port)
            && self.dst_ports.contains(flow.dst_port)
            && (self.bytes_per_sec.0..=self.bytes_per_sec.1).contains(&flow.bytes_per_sec)
            && (self.packets_per_sec.0..=self.packets_per_sec.1).contains(&flow.packets_per_sec)
            && (self.duration_secs.0..=self.duration_secs.1).contains(&flow.duration_secs)
    }
}

const EPHEMERAL: PortSpec = PortSpec::Range(32768, 65535);

/// Per-category profiles, indexed by [`TrafficCategory::index`].
const PROFILES: [CategoryProfile; 8] = [
    // Web: large packets toward 80/443, moderate throughput, short-ish pages.
    CategoryProfile {
        packet_size: (800, 1500),
        protocols: &[Protocol::Http, Protocol::Https],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Choice(&[80, 443]),
        bytes_per_sec: (100_000.0, 2_000_000.0),
        packets_per_sec: (50.0, 500.0),
        duration_secs: (1.0, 120.0),
    },
    // Video: full-size packets, sustained high throughput, long sessions.
    CategoryProfile {
        packet_size: (1000, 1500),
        protocols: &[Protocol::Https, Protocol::Udp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Choice(&[443]),
        bytes_per_sec: (2_000_000.0, 8_000_000.0),
        packets_per_sec: (200.0, 1500.0),
        duration_secs: (60.0, 3600.0),
    },
    // File transfer: maxed packets, bulk throughput on FTP/SSH/SMB ports.
    CategoryProfile {
        packet_size: (1200, 1500),
        protocols: &[Protocol::Tcp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Choice(&[21, 22, 445]),
        bytes_per_sec: (5_000_000.0, 10_000_000.0),
        packets_per_sec: (500.0, 2000.0),
        duration_secs: (10.0, 600.0),
    },
    // Gaming: tiny packets, high ports near a game-server range, long sessions.
    CategoryProfile {
        packet_size: (60, 200),
        protocols: &[Protocol::Udp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Range(27000, 28000),
        bytes_per_sec: (10_000.0, 200_000.0),
        packets_per_sec: (20.0, 120.0),
        duration_secs: (600.0, 7200.0),
    },
    // VoIP: small constant-rate packets on SIP signalling ports.
    CategoryProfile {
        packet_size: (100, 320),
        protocols: &[Protocol::Udp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Range(5060, 5200),
        bytes_per_sec: (20_000.0, 100_000.0),
        packets_per_sec: (30.0, 100.0),
        duration_secs: (30.0, 1800.0),
    },
    // Database: mid-size packets on well-known SQL ports, bursty queries.
    CategoryProfile {
        packet_size: (300, 900),
        protocols: &[Protocol::Tcp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Choice(&[1433, 3306, 5432]),
        bytes_per_sec: (100_000.0, 1_000_000.0),
        packets_per_sec: (50.0, 400.0),
        duration_secs: (1.0, 300.0),
    },
    // Email: moderate packets on SMTP/IMAP ports, short exchanges.
    CategoryProfile {
        packet_size: (400, 1200),
        protocols: &[Protocol::Tcp],
        src_ports: EPHEMERAL,
        dst_ports: PortSpec::Choice(&[25, 465, 587, 993]),
        bytes_per_sec: (50_000.0, 500_000.0),
        packets_per_sec: (10.0, 100.0),
        duration_secs: (1.0, 60.0),
    },
    // Unknown: everything drawn from the full range.
    CategoryProfile {
        packet_size: (40, 1500),
        protocols: &[Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https],
        src_ports: PortSpec::Range(1, 65535),
        dst_ports: PortSpec::Range(1, 65535),
        bytes_per_sec: (1_000.0, 10_000_000.0),
        packets_per_sec: (1.0, 2000.0),
        duration_secs: (0.0, 3600.0),
    },
];

/// The uniform ranges used for `category`.
pub fn profile(category: TrafficCategory) -> &'static CategoryProfile {
    &PROFILES[category.index()]
}

/// Produces labeled synthetic flows for training.
///
/// Every call samples independently; two flows for the same category are not
/// expected to be equal. Timestamps are set to the generation instant.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticFlowGenerator;

impl SyntheticFlowGenerator {
    pub fn new() -> Self {
        SyntheticFlowGenerator
    }

    /// Sample one flow descriptor from `category`'s profile.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        category: TrafficCategory,
        rng: &mut R,
    ) -> FlowDescriptor {
        let p = profile(category);
        FlowDescriptor {
            timestamp: Utc::now(),
            packet_size: rng.gen_range(p.packet_size.0..=p.packet_size.1),
            protocol: p.protocols.choose(rng).copied().unwrap_or(Protocol::Tcp),
            src_port: p.src_ports.sample(rng),
            dst_port: p.dst_ports.sample(rng),
            bytes_per_sec: rng.gen_range(p.bytes_per_sec.0..=p.bytes_per_sec.1),
            packets_per_sec: rng.gen_range(p.packets_per_sec.0..=p.packets_per_sec.1),
            duration_secs: rng.gen_range(p.duration_secs.0..=p.duration_secs.1),
        }
    }
}
