//! Load patterns — pure functions from elapsed time to a target worker
//! count and a 0-100 load level.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names accepted by `/pattern/{name}` and `PATTERN_MODE`.
pub const VALID_PATTERNS: &[&str] = &["wave", "spike", "random", "manual"];

/// The waveform selecting how the target worker count varies over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPattern {
    /// Smooth sinusoidal ramp with period = cycle duration.
    Wave,
    /// Two short high plateaus per cycle, low otherwise.
    Spike,
    /// Independent uniform draw each tick, no smoothing.
    Random,
    /// Externally set worker count.
    Manual,
}

#[derive(Debug, Error)]
#[error("invalid pattern {0:?}; must be one of: wave, spike, random, manual")]
pub struct UnknownPattern(pub String);

impl FromStr for LoadPattern {
    type Err = UnknownPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wave" => Ok(Self::Wave),
            "spike" => Ok(Self::Spike),
            "random" => Ok(Self::Random),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownPattern(other.to_string())),
        }
    }
}

impl fmt::Display for LoadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wave => "wave",
            Self::Spike => "spike",
            Self::Random => "random",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// A computed scaling target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Desired worker count.
    pub workers: u32,
    /// Load level percentage; `None` for manual (the gauge is left as-is).
    pub load_level: Option<u32>,
}

impl LoadPattern {
    /// Compute the target worker count for this pattern.
    ///
    /// `elapsed_secs` is time since controller start; `manual` is the
    /// externally set count used only by [`LoadPattern::Manual`].
    pub fn target(
        self,
        elapsed_secs: f64,
        cycle_secs: u64,
        base: u32,
        max: u32,
        manual: u32,
        rng: &mut impl Rng,
    ) -> Target {
        if self == Self::Manual {
            return Target {
                workers: manual,
                load_level: None,
            };
        }

        // A zero cycle would make the phase NaN.
        let cycle = cycle_secs.max(1) as f64;
        let phase = (elapsed_secs % cycle) / cycle;

        match self {
            Self::Wave => {
                let factor = (f64::sin(2.0 * PI * phase) + 1.0) / 2.0;
                factor_target(base, max, factor)
            }
            Self::Spike => {
                if phase < 0.1 || (0.5..0.6).contains(&phase) {
                    Target {
                        workers: max,
                        load_level: Some(100),
                    }
                } else {
                    Target {
                        workers: scale(base, max, 0.2),
                        load_level: Some(20),
                    }
                }
            }
            Self::Random => factor_target(base, max, rng.gen_range(0.0..1.0)),
            Self::Manual => unreachable!(),
        }
    }
}

fn factor_target(base: u32, max: u32, factor: f64) -> Target {
    Target {
        workers: scale(base, max, factor),
        load_level: Some((factor * 100.0).round() as u32),
    }
}

fn scale(base: u32, max: u32, factor: f64) -> u32 {
    // No validation of max >= base: a negative span just clamps at zero.
    let target = base as f64 + (max as f64 - base as f64) * factor;
    target.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> impl Rng {
        rand::thread_rng()
    }

    fn wave_at(elapsed: f64) -> Target {
        LoadPattern::Wave.target(elapsed, 120, 10, 50, 0, &mut rng())
    }

    #[test]
    fn parse_valid_names() {
        assert_eq!("wave".parse::<LoadPattern>().unwrap(), LoadPattern::Wave);
        assert_eq!("spike".parse::<LoadPattern>().unwrap(), LoadPattern::Spike);
        assert_eq!("random".parse::<LoadPattern>().unwrap(), LoadPattern::Random);
        assert_eq!("manual".parse::<LoadPattern>().unwrap(), LoadPattern::Manual);
    }

    #[test]
    fn parse_invalid_name_lists_valid_set() {
        let err = "sawtooth".parse::<LoadPattern>().unwrap_err();
        let msg = err.to_string();
        for name in VALID_PATTERNS {
            assert!(msg.contains(name), "{msg} missing {name}");
        }
    }

    #[test]
    fn wave_quarter_cycle_peaks() {
        // base=10, max=50, cycle=120, elapsed=30 ⇒ phase=0.25, factor=1.0.
        let t = wave_at(30.0);
        assert_eq!(t.workers, 50);
        assert_eq!(t.load_level, Some(100));
    }

    #[test]
    fn wave_stays_within_bounds() {
        for i in 0..240 {
            let t = wave_at(i as f64 * 0.5);
            assert!(t.workers >= 10 && t.workers <= 50, "workers {}", t.workers);
            let level = t.load_level.unwrap();
            assert!(level <= 100, "level {level}");
        }
    }

    #[test]
    fn wave_is_sinusoidal() {
        // Non-decreasing on phase [0, 0.25], non-increasing on [0.25, 0.75],
        // non-decreasing again on [0.75, 1).
        let targets: Vec<u32> = (0..120).map(|i| wave_at(i as f64).workers).collect();
        for i in 1..30 {
            assert!(targets[i] >= targets[i - 1], "rising leg at {i}");
        }
        for i in 31..90 {
            assert!(targets[i] <= targets[i - 1], "falling leg at {i}");
        }
        for i in 91..120 {
            assert!(targets[i] >= targets[i - 1], "second rising leg at {i}");
        }
    }

    #[test]
    fn spike_plateaus_are_exact() {
        let spike = |elapsed: f64| LoadPattern::Spike.target(elapsed, 100, 10, 50, 0, &mut rng());

        // phase < 0.1 and 0.5 <= phase < 0.6 are high plateaus.
        for elapsed in [0.0, 5.0, 9.9, 50.0, 55.0, 59.9] {
            let t = spike(elapsed);
            assert_eq!(t.workers, 50, "elapsed {elapsed}");
            assert_eq!(t.load_level, Some(100));
        }

        // Everything else is base + round(0.2 * (max - base)) = 18.
        for elapsed in [10.0, 25.0, 49.9, 60.0, 80.0, 99.0] {
            let t = spike(elapsed);
            assert_eq!(t.workers, 18, "elapsed {elapsed}");
            assert_eq!(t.load_level, Some(20));
        }
    }

    #[test]
    fn random_stays_within_bounds() {
        let mut rng = rng();
        for i in 0..100 {
            let t = LoadPattern::Random.target(i as f64, 120, 10, 50, 0, &mut rng);
            assert!(t.workers >= 10 && t.workers <= 50);
            assert!(t.load_level.unwrap() <= 100);
        }
    }

    #[test]
    fn manual_ignores_elapsed_time() {
        for elapsed in [0.0, 17.0, 3600.0] {
            let t = LoadPattern::Manual.target(elapsed, 120, 10, 50, 7, &mut rng());
            assert_eq!(t.workers, 7);
            assert_eq!(t.load_level, None);
        }
    }

    #[test]
    fn zero_cycle_does_not_panic() {
        let t = LoadPattern::Wave.target(30.0, 0, 10, 50, 0, &mut rng());
        assert!(t.workers >= 10 && t.workers <= 50);
    }

    #[test]
    fn inverted_bounds_accepted_as_is() {
        // max < base is not validated; the span is just negative.
        let t = LoadPattern::Wave.target(30.0, 120, 50, 10, 0, &mut rng());
        assert_eq!(t.workers, 10);
    }

    #[test]
    fn serde_roundtrip_lowercase() {
        let json = serde_json::to_string(&LoadPattern::Spike).unwrap();
        assert_eq!(json, "\"spike\"");
        let p: LoadPattern = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(p, LoadPattern::Manual);
    }
}
