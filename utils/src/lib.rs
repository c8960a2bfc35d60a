#[macro_use]
extern crate anyhow;

use std::{fmt, io::BufRead, str::FromStr};

use clap::ArgMatches;

/// LogLevel
///
/// Minimum level of messages that will be logged.  `none` switches logging off.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel {
    pub level: usize,
}

const LEVEL_NAMES: [&str; 6] = ["error", "warn", "info", "debug", "trace", "none"];

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|x| *x == s)
            .map(|level| LogLevel { level })
            .ok_or("no match")
    }
}

impl LogLevel {
    pub fn is_none(&self) -> bool {
        self.level >= LEVEL_NAMES.len() - 1
    }

    /// Verbosity as expected by stderrlog
    pub fn verbosity(&self) -> usize {
        if self.is_none() {
            0
        } else {
            self.level
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self { level: 2 }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(LEVEL_NAMES.get(self.level).copied().unwrap_or("unknown"))
    }
}

/// Initialize logging from command line arguments
///
/// Expects the options `loglevel`, `timestamp` and `quiet` to be defined in the clap model
pub fn init_log(m: &ArgMatches) -> anyhow::Result<()> {
    let level = m.get_one::<LogLevel>("loglevel").copied().unwrap_or_default();
    let quiet = level.is_none() || m.get_flag("quiet");
    let ts = m
        .get_one::<stderrlog::Timestamp>("timestamp")
        .copied()
        .unwrap_or(stderrlog::Timestamp::Off);

    stderrlog::new()
        .quiet(quiet)
        .verbosity(level.verbosity())
        .timestamp(ts)
        .init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))
}

/// Read in next line and split on tabs after trimming white space
pub fn get_next_line<'a, R: BufRead>(
    rdr: &mut R,
    buf: &'a mut String,
) -> anyhow::Result<Option<Vec<&'a str>>> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(buf.trim().split('\t').collect()))
    }
}

/// Locate named columns in a header line
///
/// Returns the column index of each name in `names`, in the same order.
/// Fails with the first name that is not found.
pub fn find_columns(header: &[&str], names: &[&str]) -> Result<Vec<usize>, String> {
    names
        .iter()
        .map(|n| {
            header
                .iter()
                .position(|h| h == n)
                .ok_or_else(|| (*n).to_owned())
        })
        .collect()
}
