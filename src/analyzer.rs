use serde::Serialize;
use tracing::debug;

use crate::network::{Band, ObservedNetwork};

/// Networks louder than this count as "nearby".
pub const NEIGHBOR_RSSI_FLOOR: i32 = -80;

const WEAK_SIGNAL_RSSI: i32 = -70;
const NOISY_FLOOR: i32 = -85;

const CHANNELS_2_4: [u16; 3] = [1, 6, 11];
const CHANNELS_5: [u16; 8] = [36, 40, 44, 48, 149, 153, 157, 161];
const CHANNELS_6: [u16; 8] = [1, 5, 9, 13, 17, 21, 25, 29];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkAnalysis {
    pub current_network: Option<ObservedNetwork>,
    pub performance_score: f64,
    pub signal_quality: SignalQuality,
    pub interference_factors: Vec<InterferenceFactor>,
    pub recommendations: Vec<Recommendation>,
    pub detailed_metrics: DetailedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedMetrics {
    /// Percentage, 0..=100.
    pub channel_utilization: f64,
    pub neighboring_networks: usize,
    pub same_channel_networks: usize,
    pub overlapping_channels: usize,
    pub average_neighbor_rssi: f64,
    pub channel_congestion_level: CongestionLevel,
}

impl Default for DetailedMetrics {
    fn default() -> Self {
        Self {
            channel_utilization: 0.0,
            neighboring_networks: 0,
            same_channel_networks: 0,
            overlapping_channels: 0,
            average_neighbor_rssi: 0.0,
            channel_congestion_level: CongestionLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl CongestionLevel {
    pub fn from_same_channel_count(count: usize) -> Self {
        match count {
            0..=1 => CongestionLevel::Low,
            2..=4 => CongestionLevel::Moderate,
            5..=8 => CongestionLevel::High,
            _ => CongestionLevel::Severe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl SignalQuality {
    pub fn from_rssi(rssi: i32) -> Self {
        match rssi {
            -30..=0 => SignalQuality::Excellent,
            -50..=-31 => SignalQuality::Good,
            -70..=-51 => SignalQuality::Fair,
            -80..=-71 => SignalQuality::Poor,
            _ => SignalQuality::VeryPoor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::Poor => "Poor",
            SignalQuality::VeryPoor => "Very poor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent signal strength, stable connection",
            SignalQuality::Good => "Good signal strength, stable performance",
            SignalQuality::Fair => "Fair signal strength, occasional fluctuations possible",
            SignalQuality::Poor => "Poor signal strength, performance may suffer",
            SignalQuality::VeryPoor => "Very poor signal strength, consider moving closer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterferenceFactor {
    #[serde(rename = "type")]
    pub kind: InterferenceType,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceType {
    ChannelOverlap,
    HighDensity,
    WeakSignal,
    NoisyEnvironment,
    BandwidthLimitation,
    FrequencyBandCongestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub expected_improvement: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    ChannelChange,
    BandChange,
    PositionOptimization,
    DeviceUpgrade,
    EnvironmentalChange,
    ConfigurationChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A quieter channel found for the current band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOption {
    pub channel: u16,
    pub networks_on_channel: usize,
    /// Rough gain in percent, 20 per network avoided.
    pub improvement_percent: usize,
}

pub struct NetworkAnalyzer;

impl NetworkAnalyzer {
    /// Analyse the associated network against the rest of the snapshot.
    /// `None` means "not associated" and yields a neutral analysis.
    pub fn analyze(current: Option<&ObservedNetwork>, all_networks: &[ObservedNetwork]) -> NetworkAnalysis {
        let Some(network) = current else {
            debug!("No associated network, returning neutral analysis");
            return NetworkAnalysis {
                current_network: None,
                performance_score: 0.0,
                signal_quality: SignalQuality::VeryPoor,
                interference_factors: Vec::new(),
                recommendations: Vec::new(),
                detailed_metrics: DetailedMetrics::default(),
            };
        };

        let analysis = NetworkAnalysis {
            current_network: Some(network.clone()),
            performance_score: Self::performance_score(network, all_networks),
            signal_quality: SignalQuality::from_rssi(network.rssi),
            interference_factors: Self::interference_factors(network, all_networks),
            recommendations: Self::recommendations(network, all_networks),
            detailed_metrics: Self::detailed_metrics(network, all_networks),
        };

        debug!(
            "Analysed '{}': score {:.1}, {} factors, {} recommendations",
            network.id,
            analysis.performance_score,
            analysis.interference_factors.len(),
            analysis.recommendations.len()
        );
        analysis
    }

    /// Weighted 0..=100 score: signal 40%, SNR 30%, congestion 20%, bandwidth 10%.
    pub fn performance_score(network: &ObservedNetwork, all_networks: &[ObservedNetwork]) -> f64 {
        let same_channel = same_channel_count(network, all_networks);

        let score = signal_score(network.rssi) * 0.4
            + snr_score(network.snr()) * 0.3
            + congestion_score(same_channel) * 0.2
            + bandwidth_score(network.bandwidth_mhz) * 0.1;

        score.clamp(0.0, 100.0)
    }

    pub fn interference_factors(
        network: &ObservedNetwork,
        all_networks: &[ObservedNetwork],
    ) -> Vec<InterferenceFactor> {
        let mut factors = Vec::new();

        if network.rssi < WEAK_SIGNAL_RSSI {
            factors.push(InterferenceFactor {
                kind: InterferenceType::WeakSignal,
                severity: if network.rssi < -80 { Severity::Critical } else { Severity::High },
                description: format!(
                    "Current signal strength is {} dBm, below the ideal range",
                    network.rssi
                ),
                impact: "May cause unstable connections and reduced throughput".to_string(),
            });
        }

        if network.noise > NOISY_FLOOR {
            factors.push(InterferenceFactor {
                kind: InterferenceType::NoisyEnvironment,
                severity: if network.noise > -80 { Severity::High } else { Severity::Moderate },
                description: format!("Ambient noise level is {} dBm, which is high", network.noise),
                impact: "Degrades signal quality and lowers transfer efficiency".to_string(),
            });
        }

        let same_channel = same_channel_count(network, all_networks);
        if same_channel > 2 {
            factors.push(InterferenceFactor {
                kind: InterferenceType::ChannelOverlap,
                severity: if same_channel > 5 { Severity::High } else { Severity::Moderate },
                description: format!(
                    "{} other networks share channel {}",
                    same_channel, network.channel
                ),
                impact: "Channel contention can lower speed and raise latency".to_string(),
            });
        }

        let nearby = neighbors(network, all_networks).count();
        if nearby > 10 {
            factors.push(InterferenceFactor {
                kind: InterferenceType::HighDensity,
                severity: if nearby > 20 { Severity::High } else { Severity::Moderate },
                description: format!("{} strong networks detected nearby", nearby),
                impact: "A dense environment increases competition for airtime".to_string(),
            });
        }

        factors
    }

    pub fn recommendations(
        network: &ObservedNetwork,
        all_networks: &[ObservedNetwork],
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if network.rssi < WEAK_SIGNAL_RSSI {
            recommendations.push(Recommendation {
                kind: RecommendationType::PositionOptimization,
                priority: Priority::High,
                title: "Optimize device position".to_string(),
                description: "Move closer to the router or adjust its antenna orientation"
                    .to_string(),
                expected_improvement: "Signal strength can improve by 5-15 dBm".to_string(),
            });
        }

        if let Some(option) = Self::better_channel(network, all_networks) {
            recommendations.push(Recommendation {
                kind: RecommendationType::ChannelChange,
                priority: Priority::Medium,
                title: format!("Switch to channel {}", option.channel),
                description: format!(
                    "Channel {} is congested, channel {} has {} networks on it",
                    network.channel, option.channel, option.networks_on_channel
                ),
                expected_improvement: format!(
                    "Less interference, roughly {}% better performance",
                    option.improvement_percent
                ),
            });
        }

        if network.band == Band::TwoPointFourGHz {
            let five_ghz = all_networks.iter().filter(|n| n.band == Band::FiveGHz).count();
            if five_ghz < 5 {
                recommendations.push(Recommendation {
                    kind: RecommendationType::BandChange,
                    priority: Priority::Medium,
                    title: "Switch to the 5 GHz band".to_string(),
                    description: format!(
                        "Only {} networks were seen on 5 GHz, it offers more room",
                        five_ghz
                    ),
                    expected_improvement: "50-100% faster with lower latency".to_string(),
                });
            }
        }

        if network.bandwidth_mhz < 80 && network.band != Band::TwoPointFourGHz {
            recommendations.push(Recommendation {
                kind: RecommendationType::ConfigurationChange,
                priority: Priority::Low,
                title: "Enable a wider channel bandwidth".to_string(),
                description: format!(
                    "Current bandwidth is {} MHz, consider 80 MHz or 160 MHz",
                    network.bandwidth_mhz
                ),
                expected_improvement: "Up to 2-4x theoretical throughput".to_string(),
            });
        }

        recommendations
    }

    pub fn detailed_metrics(network: &ObservedNetwork, all_networks: &[ObservedNetwork]) -> DetailedMetrics {
        let same_channel = same_channel_count(network, all_networks);
        let neighbor_rssi: Vec<i32> = neighbors(network, all_networks).map(|n| n.rssi).collect();

        let average_neighbor_rssi = if neighbor_rssi.is_empty() {
            0.0
        } else {
            neighbor_rssi.iter().sum::<i32>() as f64 / neighbor_rssi.len() as f64
        };

        DetailedMetrics {
            channel_utilization: (same_channel as f64 * 15.0).min(100.0),
            neighboring_networks: neighbor_rssi.len(),
            same_channel_networks: same_channel,
            overlapping_channels: overlapping_count(network, all_networks),
            average_neighbor_rssi,
            channel_congestion_level: CongestionLevel::from_same_channel_count(same_channel),
        }
    }

    /// Candidate in the current band with strictly fewer networks than the
    /// current channel. First candidate wins ties.
    pub fn better_channel(network: &ObservedNetwork, all_networks: &[ObservedNetwork]) -> Option<ChannelOption> {
        let current_count = same_channel_count(network, all_networks);
        let candidates: &[u16] = match network.band {
            Band::TwoPointFourGHz => &CHANNELS_2_4,
            Band::FiveGHz => &CHANNELS_5,
            Band::SixGHz => &CHANNELS_6,
        };

        let mut lowest = current_count;
        let mut best = None;
        for &channel in candidates {
            let count = all_networks.iter().filter(|n| n.channel == channel).count();
            if count < lowest {
                lowest = count;
                best = Some(channel);
            }
        }

        best.map(|channel| ChannelOption {
            channel,
            networks_on_channel: lowest,
            improvement_percent: (current_count - lowest) * 20,
        })
    }
}

fn others<'a>(
    network: &'a ObservedNetwork,
    all_networks: &'a [ObservedNetwork],
) -> impl Iterator<Item = &'a ObservedNetwork> + 'a {
    all_networks.iter().filter(move |n| n.id != network.id)
}

fn same_channel_count(network: &ObservedNetwork, all_networks: &[ObservedNetwork]) -> usize {
    others(network, all_networks).filter(|n| n.channel == network.channel).count()
}

fn neighbors<'a>(
    network: &'a ObservedNetwork,
    all_networks: &'a [ObservedNetwork],
) -> impl Iterator<Item = &'a ObservedNetwork> + 'a {
    others(network, all_networks).filter(|n| n.rssi > NEIGHBOR_RSSI_FLOOR)
}

fn overlapping_count(network: &ObservedNetwork, all_networks: &[ObservedNetwork]) -> usize {
    // 2.4 GHz channels are 5 MHz apart, a 20 MHz signal bleeds four channels over.
    let reach = match network.band {
        Band::TwoPointFourGHz => 4,
        Band::FiveGHz | Band::SixGHz => 1,
    };
    others(network, all_networks)
        .filter(|n| n.channel.abs_diff(network.channel) <= reach)
        .count()
}

fn signal_score(rssi: i32) -> f64 {
    match rssi {
        -30..=0 => 100.0,
        -50..=-31 => 80.0,
        -70..=-51 => 60.0,
        -80..=-71 => 40.0,
        -90..=-81 => 20.0,
        _ => 0.0,
    }
}

fn snr_score(snr: i32) -> f64 {
    match snr {
        40.. => 100.0,
        25..=39 => 80.0,
        15..=24 => 60.0,
        10..=14 => 40.0,
        5..=9 => 20.0,
        _ => 0.0,
    }
}

fn congestion_score(same_channel: usize) -> f64 {
    match same_channel {
        0 => 100.0,
        1 => 80.0,
        2..=3 => 60.0,
        4..=6 => 40.0,
        7..=10 => 20.0,
        _ => 0.0,
    }
}

fn bandwidth_score(bandwidth_mhz: u16) -> f64 {
    match bandwidth_mhz {
        160.. => 100.0,
        80..=159 => 80.0,
        40..=79 => 60.0,
        20..=39 => 40.0,
        _ => 20.0,
    }
}
