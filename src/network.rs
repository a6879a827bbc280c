use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WifiOptError;

/// Frequency band an access point operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2.4GHz")]
    TwoPointFourGHz,
    #[serde(rename = "5GHz")]
    FiveGHz,
    #[serde(rename = "6GHz")]
    SixGHz,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Band::TwoPointFourGHz => "2.4 GHz",
            Band::FiveGHz => "5 GHz",
            Band::SixGHz => "6 GHz",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Band {
    type Err = WifiOptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "");
        match normalized.as_str() {
            "2" | "2.4" | "2.4ghz" | "2_4" | "2ghz" => Ok(Band::TwoPointFourGHz),
            "5" | "5ghz" => Ok(Band::FiveGHz),
            "6" | "6ghz" => Ok(Band::SixGHz),
            _ => Err(WifiOptError::InvalidParameter(format!("unknown band '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    Open,
    Wep,
    WpaPersonal,
    WpaWpa2Personal,
    Wpa2Personal,
    Wpa2Wpa3Personal,
    Wpa3Personal,
    WpaEnterprise,
    Wpa2Enterprise,
    Wpa3Enterprise,
    Owe,
    Unknown,
}

impl Security {
    /// Lenient mapping from the labels discovery tools print.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase();
        let enterprise = l.contains("enterprise");

        if l.is_empty() {
            Security::Unknown
        } else if l == "open" || l == "none" {
            Security::Open
        } else if l.contains("owe") {
            Security::Owe
        } else if l.contains("wep") {
            Security::Wep
        } else if enterprise {
            // Mixed enterprise modes report as the strongest member; a bare
            // "Enterprise" is WPA3.
            if l.contains("wpa3") || !l.contains("wpa") {
                Security::Wpa3Enterprise
            } else if l.contains("wpa2") {
                Security::Wpa2Enterprise
            } else {
                Security::WpaEnterprise
            }
        } else if l.contains("wpa2/wpa3") || l.contains("wpa2/3") {
            Security::Wpa2Wpa3Personal
        } else if l.contains("wpa3") {
            Security::Wpa3Personal
        } else if l.contains("wpa/wpa2") {
            Security::WpaWpa2Personal
        } else if l.contains("wpa2") {
            Security::Wpa2Personal
        } else if l.contains("wpa") {
            Security::WpaPersonal
        } else {
            Security::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Security::Open => "Open",
            Security::Wep => "WEP",
            Security::WpaPersonal => "WPA Personal",
            Security::WpaWpa2Personal => "WPA/WPA2 Personal",
            Security::Wpa2Personal => "WPA2 Personal",
            Security::Wpa2Wpa3Personal => "WPA2/WPA3 Personal",
            Security::Wpa3Personal => "WPA3 Personal",
            Security::WpaEnterprise => "WPA Enterprise",
            Security::Wpa2Enterprise => "WPA2 Enterprise",
            Security::Wpa3Enterprise => "WPA3 Enterprise",
            Security::Owe => "OWE",
            Security::Unknown => "Unknown",
        }
    }
}

impl Default for Security {
    fn default() -> Self {
        Security::Unknown
    }
}

/// One access point seen in a snapshot. Built once by the discovery adapter
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedNetwork {
    /// Stable key, normally the BSSID.
    pub id: String,
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub bssid: Option<String>,
    pub rssi: i32,
    pub noise: i32,
    pub channel: u16,
    pub band: Band,
    #[serde(default = "default_bandwidth")]
    pub bandwidth_mhz: u16,
    #[serde(default)]
    pub security: Security,
}

fn default_bandwidth() -> u16 {
    20
}

impl ObservedNetwork {
    pub fn new(id: impl Into<String>, rssi: i32, noise: i32, channel: u16, band: Band) -> Self {
        Self {
            id: id.into(),
            ssid: None,
            bssid: None,
            rssi,
            noise,
            channel,
            band,
            bandwidth_mhz: default_bandwidth(),
            security: Security::Unknown,
        }
    }

    pub fn with_ssid(mut self, ssid: impl Into<String>) -> Self {
        self.ssid = Some(ssid.into());
        self
    }

    pub fn with_bssid(mut self, bssid: impl Into<String>) -> Self {
        self.bssid = Some(bssid.into());
        self
    }

    pub fn with_bandwidth(mut self, bandwidth_mhz: u16) -> Self {
        self.bandwidth_mhz = bandwidth_mhz;
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn snr(&self) -> i32 {
        self.rssi - self.noise
    }

    pub fn display_name(&self) -> &str {
        self.ssid.as_deref().unwrap_or("<hidden>")
    }
}

/// The device's own link as reported by the wireless interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedInterface {
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub bssid: Option<String>,
    pub rssi: i32,
    pub noise: i32,
    #[serde(default)]
    pub channel: Option<u16>,
    #[serde(default)]
    pub band: Option<Band>,
    #[serde(default)]
    pub bandwidth_mhz: Option<u16>,
}

impl AssociatedInterface {
    pub fn snr(&self) -> i32 {
        self.rssi - self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_parsing() {
        assert_eq!("2.4".parse::<Band>().unwrap(), Band::TwoPointFourGHz);
        assert_eq!("2_4".parse::<Band>().unwrap(), Band::TwoPointFourGHz);
        assert_eq!("5GHz".parse::<Band>().unwrap(), Band::FiveGHz);
        assert_eq!(" 6 ghz ".parse::<Band>().unwrap(), Band::SixGHz);
        assert!("60GHz".parse::<Band>().is_err());
    }

    #[test]
    fn test_band_serialization() {
        let json = serde_json::to_string(&Band::TwoPointFourGHz).unwrap();
        assert_eq!(json, "\"2.4GHz\"");
        let band: Band = serde_json::from_str("\"5GHz\"").unwrap();
        assert_eq!(band, Band::FiveGHz);
    }

    #[test]
    fn test_security_labels() {
        assert_eq!(Security::from_label("WPA2 Personal"), Security::Wpa2Personal);
        assert_eq!(Security::from_label("WPA3 Personal"), Security::Wpa3Personal);
        assert_eq!(Security::from_label("WPA2/WPA3 Personal"), Security::Wpa2Wpa3Personal);
        assert_eq!(Security::from_label("WPA/WPA2"), Security::WpaWpa2Personal);
        assert_eq!(Security::from_label("WPA2 Enterprise"), Security::Wpa2Enterprise);
        assert_eq!(Security::from_label("None"), Security::Open);
        assert_eq!(Security::from_label("Dynamic WEP"), Security::Wep);
        assert_eq!(Security::from_label("something else"), Security::Unknown);
    }

    #[test]
    fn test_mixed_enterprise_labels() {
        assert_eq!(Security::from_label("WPA2/WPA3 Enterprise"), Security::Wpa3Enterprise);
        assert_eq!(Security::from_label("WPA/WPA2 Enterprise"), Security::Wpa2Enterprise);
        assert_eq!(Security::from_label("WPA Enterprise"), Security::WpaEnterprise);
        assert_eq!(Security::from_label("Enterprise"), Security::Wpa3Enterprise);
        assert_eq!(Security::from_label("WPA2/WPA3 Personal"), Security::Wpa2Wpa3Personal);
    }

    #[test]
    fn test_snr_is_derived() {
        let network = ObservedNetwork::new("aa:bb", -60, -92, 6, Band::TwoPointFourGHz)
            .with_security(Security::Wpa3Personal);
        assert_eq!(network.snr(), 32);
        assert_eq!(network.security.label(), "WPA3 Personal");
        assert_eq!(network.display_name(), "<hidden>");
    }

    #[test]
    fn test_network_deserialize_defaults() {
        let json = r#"{"id":"x","rssi":-50,"noise":-90,"channel":36,"band":"5GHz"}"#;
        let network: ObservedNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(network.bandwidth_mhz, 20);
        assert_eq!(network.security, Security::Unknown);
        assert!(network.ssid.is_none());
    }
}
