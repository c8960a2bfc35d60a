use std::{borrow::Borrow, collections::BTreeMap};

use crate::{
    abundance::AbundanceTable, alignment::AlignmentGroup, error::CovError,
    resolve::target_fraction,
};

/// Sparse per-base coverage of the target sequence
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoverageMap {
    cov: BTreeMap<usize, f64>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, offset: usize, weight: f64) {
        *self.cov.entry(offset).or_insert(0.0) += weight
    }

    pub fn get(&self, offset: usize) -> Option<f64> {
        self.cov.get(&offset).copied()
    }

    pub fn len(&self) -> usize {
        self.cov.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cov.is_empty()
    }

    /// Number of covered offsets at or beyond `len`
    pub fn n_beyond(&self, len: usize) -> usize {
        self.cov.range(len..).count()
    }
}

/// Counts collected while accumulating coverage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccumStats {
    pub groups: usize,
    pub on_target: usize,
    pub degenerate: usize,
    pub added: usize,
}

impl AccumStats {
    pub fn log(&self) {
        debug!(
            "Groups resolved: {}; aligned to target: {}; zero abundance: {}; contributing: {}",
            self.groups, self.on_target, self.degenerate, self.added
        );
    }
}

/// Resolve a group and add its share to the coverage
///
/// Groups without an alignment to the target leave the coverage untouched
pub fn add_group(
    cov: &mut CoverageMap,
    stats: &mut AccumStats,
    table: &AbundanceTable,
    g: &AlignmentGroup,
) -> Result<(), CovError> {
    stats.groups += 1;
    if let Some(pos) = g.target_pos() {
        stats.on_target += 1;
        let w = target_fraction(table, g.candidates(), table.target())?;
        if w > 0.0 {
            cov.add(pos, w);
            stats.added += 1;
        } else {
            trace!("Read {} has no abundance on any candidate", g.read_id());
            stats.degenerate += 1;
        }
    }
    Ok(())
}

/// Fold a sequence of alignment groups into a new coverage map
pub fn accumulate<I>(
    groups: I,
    table: &AbundanceTable,
) -> Result<(CoverageMap, AccumStats), CovError>
where
    I: IntoIterator,
    I::Item: Borrow<AlignmentGroup>,
{
    groups.into_iter().try_fold(
        (CoverageMap::new(), AccumStats::default()),
        |(mut cov, mut stats), g| {
            add_group(&mut cov, &mut stats, table, g.borrow())?;
            Ok((cov, stats))
        },
    )
}
