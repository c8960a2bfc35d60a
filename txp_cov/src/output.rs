use std::{io::Write, path::Path};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::coverage::CoverageMap;

/// Write a coverage value in plain decimal notation
///
/// Display gives the shortest digits that round trip and never uses an exponent
/// (2e-5 is written 0.00002).  Whole numbers get a trailing .0
fn write_weight<W: Write>(wrt: &mut W, x: f64) -> std::io::Result<()> {
    if x.fract() == 0.0 {
        write!(wrt, "\t{:.1}", x)
    } else {
        write!(wrt, "\t{}", x)
    }
}

/// Write coverage as a single newline terminated line: the target name followed by one
/// tab separated value per base of the target.  Bases without coverage are written as 0.0
pub fn write_coverage<W: Write>(
    wrt: &mut W,
    target: &str,
    len: usize,
    cov: &CoverageMap,
) -> std::io::Result<()> {
    write!(wrt, "{}", target)?;
    for i in 0..len {
        write_weight(wrt, cov.get(i).unwrap_or(0.0))?;
    }
    writeln!(wrt)
}

pub fn output_coverage(
    path: &Path,
    target: &str,
    len: usize,
    cov: &CoverageMap,
) -> anyhow::Result<()> {
    debug!("Writing coverage for {} to {}", target, path.display());
    let mut wrt = CompressIo::new()
        .path(path)
        .bufwriter()
        .with_context(|| format!("Could not open output file {}", path.display()))?;

    write_coverage(&mut wrt, target, len, cov)
        .and_then(|_| wrt.flush())
        .with_context(|| format!("Error writing coverage to {}", path.display()))
}
