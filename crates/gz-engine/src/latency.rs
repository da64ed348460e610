//! Reported latency and the matching initial write heads.
//!
//! Each strategy is a trade-off between how early the subdivided notes can
//! be heard and whether the first beat pair lines up with the dry signal.

use arrayvec::ArrayVec;
use gz_dsp::constants::MAX_LEVELS;

/// How far the dry signal is delayed, and where each level starts writing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LatencyStrategy {
    /// Three beats of latency.
    #[default]
    ThreeBeats,
    /// Earliest latency at which beat A still lines up with beat C.
    EarliestAWithC,
    /// Earliest latency at which beat A is heard before beat C.
    EarliestABeforeC,
}

impl LatencyStrategy {
    /// Latency in samples for the given fractional beat length and the
    /// rounded note length of each active level.
    pub fn latency_samples(self, samples_per_beat: f64, note_lengths: &[usize]) -> usize {
        let two_beats = (2.0 * samples_per_beat).ceil() as usize;
        match self {
            LatencyStrategy::ThreeBeats => (3.0 * samples_per_beat).ceil() as usize,
            LatencyStrategy::EarliestAWithC => two_beats + note_lengths.iter().sum::<usize>(),
            LatencyStrategy::EarliestABeforeC => {
                let all_but_last = note_lengths.len().saturating_sub(1);
                two_beats + note_lengths[..all_but_last].iter().sum::<usize>()
            }
        }
    }

    /// Initial write position of each level in the shared output ring,
    /// relative to a read cursor at 0.
    pub fn initial_write_positions(
        self,
        samples_per_beat: f64,
        note_lengths: &[usize],
    ) -> ArrayVec<i64, MAX_LEVELS> {
        let two_beats = (2.0 * samples_per_beat).round() as i64;
        let last = note_lengths.last().copied().unwrap_or(0) as i64;
        let base = match self {
            LatencyStrategy::ThreeBeats => two_beats + last,
            LatencyStrategy::EarliestAWithC => two_beats,
            LatencyStrategy::EarliestABeforeC => two_beats - last,
        };
        (0..note_lengths.len())
            .map(|level| {
                let later: usize = note_lengths[level + 1..].iter().sum();
                base + later as i64
            })
            .collect()
    }
}

impl std::str::FromStr for LatencyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "three-beats" => Ok(LatencyStrategy::ThreeBeats),
            "earliest-a-with-c" => Ok(LatencyStrategy::EarliestAWithC),
            "earliest-a-before-c" => Ok(LatencyStrategy::EarliestABeforeC),
            other => Err(format!("unknown latency strategy `{other}`")),
        }
    }
}

/// Rounded note length of each of the first `levels` levels.
pub fn note_lengths(samples_per_beat: f64, levels: usize) -> ArrayVec<usize, MAX_LEVELS> {
    (0..levels)
        .map(|level| (samples_per_beat / (1u64 << (level + 1)) as f64).round() as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPB: f64 = 22050.0;

    #[test]
    fn note_lengths_halve_per_level() {
        assert_eq!(note_lengths(SPB, 4).as_slice(), &[11025, 5513, 2756, 1378]);
    }

    #[test]
    fn three_beats_latency() {
        let notes = note_lengths(SPB, 4);
        assert_eq!(LatencyStrategy::ThreeBeats.latency_samples(SPB, &notes), 66150);
        let w = LatencyStrategy::ThreeBeats.initial_write_positions(SPB, &notes);
        assert_eq!(w.as_slice(), &[44100 + 1378 + 5513 + 2756 + 1378, 44100 + 1378 + 2756 + 1378, 44100 + 1378 + 1378, 44100 + 1378]);
    }

    #[test]
    fn earliest_a_with_c_sums_every_note() {
        let notes = note_lengths(SPB, 4);
        let latency = LatencyStrategy::EarliestAWithC.latency_samples(SPB, &notes);
        assert_eq!(latency, 44100 + 11025 + 5513 + 2756 + 1378);
        let w = LatencyStrategy::EarliestAWithC.initial_write_positions(SPB, &notes);
        assert_eq!(w[3], 44100);
        assert_eq!(w[0], 44100 + 5513 + 2756 + 1378);
    }

    #[test]
    fn earliest_a_before_c_skips_last_level() {
        let notes = note_lengths(SPB, 4);
        let latency = LatencyStrategy::EarliestABeforeC.latency_samples(SPB, &notes);
        assert_eq!(latency, 44100 + 11025 + 5513 + 2756);
        let w = LatencyStrategy::EarliestABeforeC.initial_write_positions(SPB, &notes);
        assert_eq!(w[3], 44100 - 1378);
    }

    #[test]
    fn latency_stays_below_three_beats() {
        for bpm in [30.0, 97.0, 120.0, 1000.0] {
            let spb = 44100.0 * 60.0 / bpm;
            let notes = note_lengths(spb, 4);
            for strategy in [
                LatencyStrategy::ThreeBeats,
                LatencyStrategy::EarliestAWithC,
                LatencyStrategy::EarliestABeforeC,
            ] {
                assert!(strategy.latency_samples(spb, &notes) <= (3.0 * spb).ceil() as usize);
            }
        }
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("earliest-a-with-c".parse(), Ok(LatencyStrategy::EarliestAWithC));
        assert!("soon".parse::<LatencyStrategy>().is_err());
    }
}
