use crate::{abundance::AbundanceTable, config::SeqId, error::CovError};

/// Fraction of a read assigned to `target`
///
/// The read is shared between every sequence it aligned to in proportion to their
/// abundances.  Candidates are summed as given, so a sequence hit twice counts twice.
/// If the total abundance is zero the read contributes nothing and 0 is returned.
pub fn target_fraction(
    table: &AbundanceTable,
    candidates: &[SeqId],
    target: &str,
) -> Result<f64, CovError> {
    let mut total = 0.0;
    let mut on_target = 0.0;
    for c in candidates {
        let x = table
            .abundance(c)
            .ok_or_else(|| CovError::UnknownSequence(c.to_string()))?;
        if c.as_ref() == target {
            on_target += x;
        }
        total += x;
    }
    Ok(if total > 0.0 { on_target / total } else { 0.0 })
}
