use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::network::{AssociatedInterface, Band, ObservedNetwork, Security};

/// A single point-in-time scan: every access point seen plus the device's
/// own link, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub networks: Vec<ObservedNetwork>,
    #[serde(default)]
    pub interface: Option<AssociatedInterface>,
}

impl Snapshot {
    pub fn new(networks: Vec<ObservedNetwork>, interface: Option<AssociatedInterface>) -> Self {
        Self {
            captured_at: Utc::now(),
            networks,
            interface,
        }
    }

    pub fn find(&self, id: &str) -> Option<&ObservedNetwork> {
        self.networks
            .iter()
            .find(|n| n.id == id || n.bssid.as_deref() == Some(id))
    }

    /// Resolve the associated network: BSSID first, then normalized SSID,
    /// then the network on the interface's channel closest in RSSI.
    pub fn current_network(&self) -> Option<&ObservedNetwork> {
        let iface = self.interface.as_ref()?;

        if let Some(bssid) = iface.bssid.as_deref() {
            if let Some(network) = self.networks.iter().find(|n| n.bssid.as_deref() == Some(bssid)) {
                return Some(network);
            }
        }

        if let Some(ssid) = iface.ssid.as_deref().filter(|s| !s.is_empty()) {
            let target = normalize_ssid(ssid);
            if let Some(network) = self
                .networks
                .iter()
                .find(|n| n.ssid.as_deref().map(normalize_ssid).as_deref() == Some(target.as_str()))
            {
                return Some(network);
            }
        }

        let channel = iface.channel?;
        self.networks
            .iter()
            .filter(|n| n.channel == channel)
            .min_by_key(|n| n.rssi.abs_diff(iface.rssi))
    }

    /// Merge the live interface into the network list: tag the matching
    /// entry with the interface BSSID, or append a synthesized entry when
    /// the scan did not include the associated network.
    pub fn enrich(&mut self) {
        let Some(iface) = self.interface.as_ref() else {
            return;
        };
        let (Some(ssid), Some(bssid)) = (iface.ssid.clone(), iface.bssid.clone()) else {
            return;
        };

        let target = normalize_ssid(&ssid);
        let matching = self
            .networks
            .iter_mut()
            .find(|n| n.ssid.as_deref().map(normalize_ssid).as_deref() == Some(target.as_str()));

        match matching {
            Some(network) => {
                debug!("Enriched '{}' with BSSID {}", ssid, bssid);
                network.ssid = Some(ssid);
                network.bssid = Some(bssid);
            }
            None => {
                debug!("Associated network '{}' not in scan, synthesizing entry", ssid);
                let synthesized = ObservedNetwork {
                    id: bssid.clone(),
                    ssid: Some(ssid),
                    bssid: Some(bssid),
                    rssi: iface.rssi,
                    noise: iface.noise,
                    channel: iface.channel.unwrap_or(0),
                    band: iface.band.unwrap_or(Band::TwoPointFourGHz),
                    bandwidth_mhz: iface.bandwidth_mhz.unwrap_or(20),
                    security: Security::Unknown,
                };
                self.networks.push(synthesized);
            }
        }
    }

    /// Keep only networks in `band`.
    pub fn filter_band(&mut self, band: Band) {
        self.networks.retain(|n| n.band == band);
    }

    /// Networks ordered strongest first.
    pub fn sorted_by_signal(&self) -> Vec<&ObservedNetwork> {
        let mut sorted: Vec<_> = self.networks.iter().collect();
        sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        sorted
    }
}

pub fn normalize_ssid(ssid: &str) -> String {
    ssid.trim_matches(|c: char| c.is_whitespace() || c == '"')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(ssid: Option<&str>, bssid: Option<&str>, channel: Option<u16>) -> AssociatedInterface {
        AssociatedInterface {
            ssid: ssid.map(str::to_string),
            bssid: bssid.map(str::to_string),
            rssi: -58,
            noise: -91,
            channel,
            band: channel.map(|_| Band::FiveGHz),
            bandwidth_mhz: Some(80),
        }
    }

    fn networks() -> Vec<ObservedNetwork> {
        vec![
            ObservedNetwork::new("home", -50, -90, 36, Band::FiveGHz).with_ssid("Home"),
            ObservedNetwork::new("cafe", -60, -90, 36, Band::FiveGHz)
                .with_ssid("Cafe")
                .with_bssid("11:22:33:44:55:66"),
            ObservedNetwork::new("office", -75, -90, 6, Band::TwoPointFourGHz).with_ssid("Office"),
        ]
    }

    #[test]
    fn test_normalize_ssid() {
        assert_eq!(normalize_ssid("  \"My Net\" \n"), "my net");
    }

    #[test]
    fn test_current_by_bssid() {
        let snapshot = Snapshot::new(networks(), Some(iface(Some("Home"), Some("11:22:33:44:55:66"), None)));
        assert_eq!(snapshot.current_network().unwrap().id, "cafe");
    }

    #[test]
    fn test_current_by_ssid() {
        let snapshot = Snapshot::new(networks(), Some(iface(Some("\"office\""), None, None)));
        assert_eq!(snapshot.current_network().unwrap().id, "office");
    }

    #[test]
    fn test_current_by_nearest_rssi() {
        let snapshot = Snapshot::new(networks(), Some(iface(None, None, Some(36))));
        assert_eq!(snapshot.current_network().unwrap().id, "cafe");
    }

    #[test]
    fn test_no_interface_no_current() {
        let snapshot = Snapshot::new(networks(), None);
        assert!(snapshot.current_network().is_none());
        let snapshot = Snapshot::new(networks(), Some(iface(None, None, None)));
        assert!(snapshot.current_network().is_none());
    }

    #[test]
    fn test_enrich_tags_matching_entry() {
        let mut snapshot = Snapshot::new(networks(), Some(iface(Some("home"), Some("aa:aa:aa:aa:aa:aa"), Some(36))));
        snapshot.enrich();
        assert_eq!(snapshot.networks.len(), 3);
        assert_eq!(snapshot.networks[0].bssid.as_deref(), Some("aa:aa:aa:aa:aa:aa"));
        assert_eq!(snapshot.current_network().unwrap().id, "home");
    }

    #[test]
    fn test_enrich_synthesizes_missing_entry() {
        let mut snapshot = Snapshot::new(networks(), Some(iface(Some("Hidden"), Some("bb:bb:bb:bb:bb:bb"), Some(149))));
        snapshot.enrich();
        assert_eq!(snapshot.networks.len(), 4);
        let iface_snr = snapshot.interface.as_ref().unwrap().snr();
        let synthesized = snapshot.find("bb:bb:bb:bb:bb:bb").unwrap();
        assert_eq!(synthesized.channel, 149);
        assert_eq!(synthesized.band, Band::FiveGHz);
        assert_eq!(synthesized.bandwidth_mhz, 80);
        assert_eq!(synthesized.snr(), iface_snr);
        assert_eq!(iface_snr, 33);
    }

    #[test]
    fn test_filter_and_sort() {
        let mut snapshot = Snapshot::new(networks(), None);
        let order: Vec<_> = snapshot.sorted_by_signal().iter().map(|n| n.id.clone()).collect();
        assert_eq!(order, vec!["home", "cafe", "office"]);
        snapshot.filter_band(Band::TwoPointFourGHz);
        assert_eq!(snapshot.networks.len(), 1);
    }

    #[test]
    fn test_snapshot_json_without_timestamp() {
        let json = r#"{"networks":[{"id":"a","rssi":-40,"noise":-90,"channel":1,"band":"2.4GHz"}]}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.networks.len(), 1);
        assert!(snapshot.interface.is_none());
    }
}
