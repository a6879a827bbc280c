use serde::Serialize;
use tracing::{debug, trace};

use crate::network::{Band, ObservedNetwork};

const RSSI_FLOOR: i32 = -100;
const RSSI_CEILING: i32 = -30;

/// Channels the 2.4 GHz recommendation snaps to.
pub const NON_OVERLAPPING_2_4: [u16; 3] = [1, 6, 11];

const CANDIDATES_2_4: [u16; 11] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
// Non-DFS 20 MHz primaries.
const CANDIDATES_5: [u16; 8] = [36, 40, 44, 48, 149, 153, 157, 161];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelRecommendation {
    pub band_2_4: Option<u16>,
    pub band_5: Option<u16>,
}

/// Interference seen from one candidate channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelScore {
    pub channel: u16,
    pub score: f64,
    pub overlaps: usize,
}

impl ChannelScore {
    fn beats(&self, other: &ChannelScore) -> bool {
        self.score < other.score || (self.score == other.score && self.overlaps < other.overlaps)
    }
}

pub struct ChannelRecommender;

impl ChannelRecommender {
    pub fn recommend(networks: &[ObservedNetwork]) -> ChannelRecommendation {
        let recommendation = ChannelRecommendation {
            band_2_4: Self::best_channel(Band::TwoPointFourGHz, networks),
            band_5: Self::best_channel(Band::FiveGHz, networks),
        };
        debug!(
            "Recommended channels: 2.4 GHz = {:?}, 5 GHz = {:?}",
            recommendation.band_2_4, recommendation.band_5
        );
        recommendation
    }

    /// Quietest candidate channel in `band`, or `None` when the band has no
    /// candidates.
    pub fn best_channel(band: Band, networks: &[ObservedNetwork]) -> Option<u16> {
        let scores = Self::channel_scores(band, networks);

        let mut best: Option<ChannelScore> = None;
        for candidate in &scores {
            if best.map_or(true, |b| candidate.beats(&b)) {
                best = Some(*candidate);
            }
        }
        let best = best?;

        if band != Band::TwoPointFourGHz || NON_OVERLAPPING_2_4.contains(&best.channel) {
            return Some(best.channel);
        }

        trace!("Channel {} is not in 1/6/11, re-ranking preferred channels", best.channel);
        let band_networks = Self::networks_in(band, networks);
        NON_OVERLAPPING_2_4
            .iter()
            .map(|&channel| Self::score_channel(band, channel, &band_networks))
            .min_by(|a, b| a.score.total_cmp(&b.score).then(a.overlaps.cmp(&b.overlaps)))
            .map(|s| s.channel)
    }

    /// Score every candidate of `band`, in candidate order.
    pub fn channel_scores(band: Band, networks: &[ObservedNetwork]) -> Vec<ChannelScore> {
        let band_networks = Self::networks_in(band, networks);
        Self::candidate_channels(band)
            .iter()
            .map(|&channel| Self::score_channel(band, channel, &band_networks))
            .collect()
    }

    pub fn candidate_channels(band: Band) -> &'static [u16] {
        match band {
            Band::TwoPointFourGHz => &CANDIDATES_2_4,
            Band::FiveGHz => &CANDIDATES_5,
            Band::SixGHz => &[],
        }
    }

    fn networks_in(band: Band, networks: &[ObservedNetwork]) -> Vec<&ObservedNetwork> {
        networks.iter().filter(|n| n.band == band).collect()
    }

    fn score_channel(band: Band, channel: u16, band_networks: &[&ObservedNetwork]) -> ChannelScore {
        let mut score = 0.0;
        let mut overlaps = 0;

        for network in band_networks {
            let half = (Self::bandwidth_units(network.bandwidth_mhz, band) / 2).max(1);
            let distance = network.channel.abs_diff(channel) as u32;
            if distance <= half {
                overlaps += 1;
                let falloff = 1.0 - distance as f64 / half as f64;
                score += normalized_signal(network.rssi) * falloff.max(0.0);
            }
        }

        ChannelScore { channel, score, overlaps }
    }

    /// Occupied width in channel-number units.
    fn bandwidth_units(bandwidth_mhz: u16, band: Band) -> u32 {
        let base = (bandwidth_mhz as u32 / 20).max(1);
        let multiplier = match band {
            Band::TwoPointFourGHz | Band::FiveGHz => 4,
            Band::SixGHz => 8,
        };
        base * multiplier
    }
}

/// Map RSSI from [-100, -30] dBm onto [0, 1], clamped.
pub fn normalized_signal(rssi: i32) -> f64 {
    let clamped = rssi.clamp(RSSI_FLOOR, RSSI_CEILING);
    (clamped - RSSI_FLOOR) as f64 / (RSSI_CEILING - RSSI_FLOOR) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ap(id: &str, rssi: i32, channel: u16, band: Band) -> ObservedNetwork {
        ObservedNetwork::new(id, rssi, -92, channel, band)
    }

    #[test]
    fn test_normalized_signal_clamps() {
        assert_eq!(normalized_signal(-120), 0.0);
        assert_eq!(normalized_signal(-100), 0.0);
        assert_eq!(normalized_signal(-30), 1.0);
        assert_eq!(normalized_signal(-10), 1.0);
        assert!((normalized_signal(-65) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_picks_first_candidates() {
        let recommendation = ChannelRecommender::recommend(&[]);
        assert_eq!(recommendation.band_2_4, Some(1));
        assert_eq!(recommendation.band_5, Some(36));
    }

    #[test]
    fn test_six_ghz_has_no_recommendation() {
        let networks = vec![ap("a", -50, 37, Band::SixGHz)];
        assert_eq!(ChannelRecommender::best_channel(Band::SixGHz, &networks), None);
        assert!(ChannelRecommender::channel_scores(Band::SixGHz, &networks).is_empty());
    }

    #[test]
    fn test_avoids_busy_channel_on_2_4() {
        let networks = vec![
            ap("a", -40, 1, Band::TwoPointFourGHz),
            ap("b", -45, 1, Band::TwoPointFourGHz),
            ap("c", -50, 11, Band::TwoPointFourGHz),
        ];
        assert_eq!(ChannelRecommender::best_channel(Band::TwoPointFourGHz, &networks), Some(6));
    }

    #[test]
    fn test_2_4_result_snaps_to_preferred_channel() {
        // Channels 1 and 11 are loud, 6 has a weaker neighbour: the global
        // minimum lands between them, but the answer must be 1, 6 or 11.
        let networks = vec![
            ap("a", -30, 1, Band::TwoPointFourGHz),
            ap("b", -30, 11, Band::TwoPointFourGHz),
            ap("c", -80, 6, Band::TwoPointFourGHz),
        ];
        let best = ChannelRecommender::best_channel(Band::TwoPointFourGHz, &networks).unwrap();
        assert!(NON_OVERLAPPING_2_4.contains(&best));
        assert_eq!(best, 6);
    }

    #[test]
    fn test_5ghz_result_is_a_candidate() {
        let networks = vec![
            ap("a", -40, 36, Band::FiveGHz),
            ap("b", -50, 149, Band::FiveGHz).with_bandwidth(80),
        ];
        let best = ChannelRecommender::best_channel(Band::FiveGHz, &networks).unwrap();
        assert!(ChannelRecommender::candidate_channels(Band::FiveGHz).contains(&best));
        assert_eq!(best, 40);
    }

    #[test]
    fn test_other_band_networks_are_ignored() {
        let networks = vec![ap("a", -30, 36, Band::FiveGHz), ap("b", -30, 1, Band::SixGHz)];
        assert_eq!(ChannelRecommender::best_channel(Band::TwoPointFourGHz, &networks), Some(1));
        assert_eq!(ChannelRecommender::best_channel(Band::FiveGHz, &networks), Some(40));
    }

    #[test]
    fn test_triangular_falloff() {
        let networks = vec![ap("a", -30, 6, Band::TwoPointFourGHz)];
        let scores = ChannelRecommender::channel_scores(Band::TwoPointFourGHz, &networks);
        // 20 MHz on 2.4 GHz spans 4 units, half width 2.
        let on = scores.iter().find(|s| s.channel == 6).unwrap();
        let near = scores.iter().find(|s| s.channel == 7).unwrap();
        let edge = scores.iter().find(|s| s.channel == 8).unwrap();
        let far = scores.iter().find(|s| s.channel == 9).unwrap();
        assert_eq!(on.score, 1.0);
        assert!((near.score - 0.5).abs() < 1e-9);
        assert_eq!(edge.score, 0.0);
        assert_eq!(edge.overlaps, 1);
        assert_eq!(far.overlaps, 0);
    }

    #[test]
    fn test_overlap_count_breaks_score_ties() {
        // Channels 1 and 11 sit on the edge of a neighbour's window: score 0, one overlap.
        let networks = vec![
            ap("a", -30, 3, Band::TwoPointFourGHz),
            ap("b", -30, 9, Band::TwoPointFourGHz),
        ];
        let scores = ChannelRecommender::channel_scores(Band::TwoPointFourGHz, &networks);
        let ch1 = scores.iter().find(|s| s.channel == 1).unwrap();
        let ch6 = scores.iter().find(|s| s.channel == 6).unwrap();
        assert_eq!((ch1.score, ch1.overlaps), (0.0, 1));
        assert_eq!((ch6.score, ch6.overlaps), (0.0, 0));
        assert_eq!(ChannelRecommender::best_channel(Band::TwoPointFourGHz, &networks), Some(6));
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let networks = vec![
            ap("a", -55, 3, Band::TwoPointFourGHz).with_bandwidth(40),
            ap("b", -62, 44, Band::FiveGHz).with_bandwidth(80),
            ap("c", -70, 157, Band::FiveGHz),
        ];
        assert_eq!(
            ChannelRecommender::recommend(&networks),
            ChannelRecommender::recommend(&networks)
        );
    }
}
