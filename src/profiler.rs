//! Parser for `system_profiler SPAirPortDataType` text output.
//!
//! The tool prints one block per interface. Below each interface the
//! associated network sits under `Current Network Information:` and the
//! rest of the scan under `Other Local Wi-Fi Networks:`. Network names are
//! indented 12 spaces, their properties 14.

use std::collections::HashMap;

use log::{debug, warn};

use crate::network::{AssociatedInterface, Band, ObservedNetwork, Security};
use crate::snapshot::Snapshot;

const CURRENT_HEADER: &str = "Current Network Information:";
const OTHERS_HEADER: &str = "Other Local Wi-Fi Networks:";

const INTERFACE_INDENT: usize = 8;
const NETWORK_INDENT: usize = 12;
const PROPERTY_INDENT: usize = 14;

const DEFAULT_DBM: i32 = -100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Current,
    Others,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilerReport {
    pub networks: Vec<ObservedNetwork>,
    /// The network listed under the current-network section, also present
    /// in `networks`.
    pub current: Option<ObservedNetwork>,
}

impl ProfilerReport {
    pub fn into_snapshot(self) -> Snapshot {
        let interface = self.current.map(|c| AssociatedInterface {
            ssid: c.ssid.clone(),
            bssid: c.bssid.clone(),
            rssi: c.rssi,
            noise: c.noise,
            channel: Some(c.channel),
            band: Some(c.band),
            bandwidth_mhz: Some(c.bandwidth_mhz),
        });
        Snapshot::new(self.networks, interface)
    }
}

struct PendingNetwork {
    name: String,
    section: Section,
    properties: HashMap<String, String>,
}

pub struct ProfilerParser {
    report: ProfilerReport,
    section: Section,
    pending: Option<PendingNetwork>,
    seen_names: HashMap<String, usize>,
}

impl ProfilerParser {
    pub fn new() -> Self {
        Self {
            report: ProfilerReport::default(),
            section: Section::None,
            pending: None,
            seen_names: HashMap::new(),
        }
    }

    pub fn parse(output: &str) -> ProfilerReport {
        let mut parser = Self::new();
        for (index, line) in output.lines().enumerate() {
            parser.feed_line(index, line);
        }
        parser.finish()
    }

    fn feed_line(&mut self, index: usize, line: &str) {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start_matches(' ').len();

        if trimmed == CURRENT_HEADER {
            debug!("Entering current network section at line {}", index);
            self.flush();
            self.section = Section::Current;
            return;
        }
        if trimmed == OTHERS_HEADER {
            debug!("Entering other networks section at line {}", index);
            self.flush();
            self.section = Section::Others;
            return;
        }

        // A new interface block closes whatever section was open.
        if (INTERFACE_INDENT..NETWORK_INDENT).contains(&indent) && trimmed.ends_with(':') {
            self.flush();
            self.section = Section::None;
            return;
        }

        if self.section == Section::None {
            return;
        }

        if (NETWORK_INDENT..PROPERTY_INDENT).contains(&indent) && trimmed.ends_with(':') {
            self.flush();
            self.pending = Some(PendingNetwork {
                name: trimmed.trim_end_matches(':').to_string(),
                section: self.section,
                properties: HashMap::new(),
            });
        } else if indent >= PROPERTY_INDENT {
            if let (Some(pending), Some((key, value))) = (self.pending.as_mut(), trimmed.split_once(": ")) {
                pending.properties.insert(key.to_string(), value.to_string());
            }
        }
    }

    fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.properties.is_empty() {
            debug!("Skipping '{}' with no properties", pending.name);
            return;
        }

        let id = self.unique_id(&pending.name);
        let network = build_network(id, &pending.name, &pending.properties);
        debug!(
            "Parsed '{}': rssi {} ch {} ({})",
            pending.name, network.rssi, network.channel, network.band
        );

        if pending.section == Section::Current && self.report.current.is_none() {
            self.report.current = Some(network.clone());
        }
        self.report.networks.push(network);
    }

    /// Mesh nodes often repeat an SSID; later entries get a `#n` suffix.
    fn unique_id(&mut self, name: &str) -> String {
        let count = self.seen_names.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            name.to_string()
        } else {
            format!("{}#{}", name, count)
        }
    }

    fn finish(mut self) -> ProfilerReport {
        self.flush();
        self.report
    }
}

impl Default for ProfilerParser {
    fn default() -> Self {
        Self::new()
    }
}

fn build_network(id: String, name: &str, properties: &HashMap<String, String>) -> ObservedNetwork {
    let (rssi, noise) = properties
        .get("Signal / Noise")
        .and_then(|s| parse_signal_noise(s))
        .unwrap_or_else(|| {
            debug!("'{}' has no usable Signal / Noise, using {} dBm", name, DEFAULT_DBM);
            (DEFAULT_DBM, DEFAULT_DBM)
        });

    let (channel, band, bandwidth_mhz) = properties
        .get("Channel")
        .map(|s| parse_channel(s))
        .unwrap_or((0, Band::TwoPointFourGHz, 20));

    let security = properties
        .get("Security")
        .map(|s| Security::from_label(s))
        .unwrap_or(Security::Unknown);

    ObservedNetwork {
        id,
        ssid: Some(name.to_string()),
        bssid: None,
        rssi,
        noise,
        channel,
        band,
        bandwidth_mhz,
        security,
    }
}

/// `-52 dBm / -94 dBm`
fn parse_signal_noise(value: &str) -> Option<(i32, i32)> {
    let (signal, noise) = value.split_once(" / ")?;
    let parse = |s: &str| s.trim().trim_end_matches("dBm").trim().parse::<i32>().ok();
    match (parse(signal), parse(noise)) {
        (Some(signal), Some(noise)) => Some((signal, noise)),
        (Some(signal), None) => Some((signal, DEFAULT_DBM)),
        (None, Some(noise)) => Some((DEFAULT_DBM, noise)),
        (None, None) => None,
    }
}

/// `36 (5GHz, 80MHz)`; band and width fall back to 2.4 GHz / 20 MHz.
fn parse_channel(value: &str) -> (u16, Band, u16) {
    let mut parts = value.splitn(2, " (");
    let channel = parts
        .next()
        .and_then(|c| c.trim().parse::<u16>().ok())
        .unwrap_or_else(|| {
            warn!("Unparseable channel '{}'", value);
            0
        });

    let mut band = Band::TwoPointFourGHz;
    let mut bandwidth = 20;

    if let Some(details) = parts.next() {
        let details = details.trim_end_matches(')');
        if let Some((band_str, width_str)) = details.split_once(", ") {
            if band_str.contains("2GHz") {
                band = Band::TwoPointFourGHz;
            } else if band_str.contains("5GHz") {
                band = Band::FiveGHz;
            } else if band_str.contains("6GHz") {
                band = Band::SixGHz;
            }
            if let Ok(width) = width_str.trim().trim_end_matches("MHz").parse::<u16>() {
                bandwidth = width;
            }
        }
    }

    (channel, band, bandwidth)
}
