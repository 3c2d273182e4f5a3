//! Process resource sampling from `/proc`.
//!
//! Reads resident set size from `/proc/self/status` and CPU time from
//! `/proc/self/stat`. Parsing is split from file I/O so the parsers can
//! be tested on captured text. Sampling failures are never fatal; the
//! apps log them and skip the gauge update.

use std::time::Instant;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("missing field {field} in {path}")]
    MissingField {
        field: &'static str,
        path: &'static str,
    },

    #[error("malformed value for {field} in {path}")]
    Malformed {
        field: &'static str,
        path: &'static str,
    },
}

const STATUS_PATH: &str = "/proc/self/status";
const STAT_PATH: &str = "/proc/self/stat";
const MEMINFO_PATH: &str = "/proc/meminfo";

/// Resident set size of this process, in bytes.
pub fn rss_bytes() -> Result<u64, ProcError> {
    let contents = std::fs::read_to_string(STATUS_PATH).map_err(|e| ProcError::Io {
        path: STATUS_PATH,
        source: e,
    })?;
    parse_status_rss_bytes(&contents)
}

fn parse_status_rss_bytes(contents: &str) -> Result<u64, ProcError> {
    for line in contents.lines() {
        if !line.starts_with("VmRSS:") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let _ = fields.next();
        let value = fields.next().ok_or(ProcError::MissingField {
            field: "VmRSS",
            path: STATUS_PATH,
        })?;
        let kb: u64 = value.parse().map_err(|_| ProcError::Malformed {
            field: "VmRSS",
            path: STATUS_PATH,
        })?;
        return Ok(kb * 1024);
    }

    Err(ProcError::MissingField {
        field: "VmRSS",
        path: STATUS_PATH,
    })
}

/// Total system memory in bytes, from `/proc/meminfo`.
pub fn meminfo_total_bytes() -> Result<u64, ProcError> {
    let contents = std::fs::read_to_string(MEMINFO_PATH).map_err(|e| ProcError::Io {
        path: MEMINFO_PATH,
        source: e,
    })?;
    parse_meminfo_total_bytes(&contents)
}

fn parse_meminfo_total_bytes(contents: &str) -> Result<u64, ProcError> {
    for line in contents.lines() {
        if !line.starts_with("MemTotal:") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let _ = fields.next();
        let value = fields.next().ok_or(ProcError::MissingField {
            field: "MemTotal",
            path: MEMINFO_PATH,
        })?;
        let kb: u64 = value.parse().map_err(|_| ProcError::Malformed {
            field: "MemTotal",
            path: MEMINFO_PATH,
        })?;
        return Ok(kb * 1024);
    }

    Err(ProcError::MissingField {
        field: "MemTotal",
        path: MEMINFO_PATH,
    })
}

/// Estimates CPU cores in use from `/proc/self/stat` tick deltas.
///
/// The first call establishes a baseline and returns 0.0; subsequent
/// calls return `delta_cpu_time / delta_wall_time`, i.e. ~1.0 for one
/// fully busy core.
pub struct CpuSampler {
    prev: Option<(Instant, u64)>,
    tick_hz: f64,
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler {
    pub fn new() -> Self {
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        let tick_hz = if ticks > 0 { ticks as f64 } else { 100.0 };
        Self {
            prev: None,
            tick_hz,
        }
    }

    /// Estimated cores in use since the previous sample.
    pub fn sample(&mut self) -> Result<f64, ProcError> {
        let contents = std::fs::read_to_string(STAT_PATH).map_err(|e| ProcError::Io {
            path: STAT_PATH,
            source: e,
        })?;
        let ticks = parse_stat_cpu_ticks(&contents)?;
        let now = Instant::now();

        let estimate = match self.prev {
            Some((prev_at, prev_ticks)) => {
                let wall = now.duration_since(prev_at).as_secs_f64();
                if wall > 0.0 {
                    let cpu_secs = ticks.saturating_sub(prev_ticks) as f64 / self.tick_hz;
                    cpu_secs / wall
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        self.prev = Some((now, ticks));
        Ok(estimate)
    }
}

/// Sum of utime and stime (fields 14 and 15) from `/proc/self/stat`.
///
/// The comm field may contain spaces, so fields are counted from the
/// last closing parenthesis.
fn parse_stat_cpu_ticks(contents: &str) -> Result<u64, ProcError> {
    let rest = contents
        .rfind(')')
        .map(|i| &contents[i + 1..])
        .ok_or(ProcError::Malformed {
            field: "comm",
            path: STAT_PATH,
        })?;

    // After the comm field: state is field 3, utime field 14, stime field 15.
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime = fields.get(11).ok_or(ProcError::MissingField {
        field: "utime",
        path: STAT_PATH,
    })?;
    let stime = fields.get(12).ok_or(ProcError::MissingField {
        field: "stime",
        path: STAT_PATH,
    })?;

    let utime: u64 = utime.parse().map_err(|_| ProcError::Malformed {
        field: "utime",
        path: STAT_PATH,
    })?;
    let stime: u64 = stime.parse().map_err(|_| ProcError::Malformed {
        field: "stime",
        path: STAT_PATH,
    })?;

    Ok(utime + stime)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_STATUS: &str = "\
Name:\tloadlab\n\
Umask:\t0022\n\
State:\tS (sleeping)\n\
VmPeak:\t   21000 kB\n\
VmSize:\t   20000 kB\n\
VmRSS:\t    8192 kB\n\
VmData:\t    1200 kB\n";

    #[test]
    fn parses_rss_from_status() {
        let rss = parse_status_rss_bytes(SAMPLE_STATUS).unwrap();
        assert_eq!(rss, 8192 * 1024);
    }

    #[test]
    fn missing_rss_is_an_error() {
        let err = parse_status_rss_bytes("Name:\tloadlab\n").unwrap_err();
        assert!(matches!(err, ProcError::MissingField { field: "VmRSS", .. }));
    }

    #[test]
    fn parses_cpu_ticks_from_stat() {
        // comm with a space and parens to exercise the rfind(')') path.
        let stat = "12345 (load lab (x)) S 1 12345 12345 0 -1 4194304 500 0 0 0 \
                    150 75 0 0 20 0 4 0 100000 20000000 2048 18446744073709551615";
        let ticks = parse_stat_cpu_ticks(stat).unwrap();
        assert_eq!(ticks, 150 + 75);
    }

    #[test]
    fn truncated_stat_is_an_error() {
        let err = parse_stat_cpu_ticks("12345 (loadlab) S 1 2 3").unwrap_err();
        assert!(matches!(err, ProcError::MissingField { field: "utime", .. }));
    }

    #[test]
    fn sampler_first_sample_is_zero() {
        let mut sampler = CpuSampler::new();
        // Running under test on Linux, /proc/self/stat is available.
        let estimate = sampler.sample().unwrap();
        assert_eq!(estimate, 0.0);
    }

    #[test]
    fn rss_bytes_reads_self() {
        let rss = rss_bytes().unwrap();
        assert!(rss > 0);
    }

    #[test]
    fn parses_meminfo_total() {
        let contents = "MemTotal:       16384000 kB\nMemFree:         1024000 kB\n";
        let total = parse_meminfo_total_bytes(contents).unwrap();
        assert_eq!(total, 16_384_000 * 1024);
    }
}
