use std::{
    collections::{hash_map::Entry, HashMap},
    io::BufRead,
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::{find_columns, get_next_line};

use crate::{config::SeqId, error::CovError};

/// Columns required from the quantification table
const NAME_COL: &str = "Name";
const LENGTH_COL: &str = "Length";
const ABUNDANCE_COL: &str = "NumReads";

/// AbundanceTable
///
/// Estimated read count for every sequence in the quantification, plus the
/// length of the target sequence.  Built once before processing and read only afterwards.
///
#[derive(Debug)]
pub struct AbundanceTable {
    target: SeqId,
    target_len: usize,
    abundance: HashMap<SeqId, f64>,
}

impl AbundanceTable {
    pub fn target(&self) -> &SeqId {
        &self.target
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn abundance(&self, seq: &str) -> Option<f64> {
        self.abundance.get(seq).copied()
    }

    pub fn len(&self) -> usize {
        self.abundance.len()
    }

    /// Parse a tab separated table with a header line.
    /// `source` is only used to label error messages
    pub fn from_reader<R: BufRead>(
        mut rdr: R,
        target: &str,
        source: &str,
    ) -> anyhow::Result<Self> {
        let mut buf = String::new();

        let (name_ix, len_ix, ab_ix) = match get_next_line(&mut rdr, &mut buf)
            .with_context(|| format!("Error reading header from {}", source))?
        {
            Some(hdr) => {
                let ix = find_columns(&hdr, &[NAME_COL, LENGTH_COL, ABUNDANCE_COL])
                    .map_err(CovError::MissingColumn)?;
                (ix[0], ix[1], ix[2])
            }
            None => return Err(anyhow!("Abundance table {} is empty", source)),
        };
        let min_fields = name_ix.max(len_ix).max(ab_ix) + 1;

        let mut abundance = HashMap::new();
        let mut tgt = None;
        let mut line = 1;

        while let Some(fields) = get_next_line(&mut rdr, &mut buf)
            .with_context(|| format!("Error after reading {} lines from {}", line, source))?
        {
            line += 1;
            // Skip short lines
            if fields.len() < min_fields {
                trace!("{}:{} Skipping short line", source, line);
                continue;
            }
            let name = fields[name_ix];
            let x = fields[ab_ix]
                .parse::<f64>()
                .with_context(|| format!("{}:{} Error reading abundance", source, line))?;
            if !x.is_finite() || x < 0.0 {
                return Err(CovError::InvalidAbundance {
                    name: name.to_owned(),
                    value: x,
                })
                .with_context(|| format!("{}:{}", source, line));
            }
            let key: SeqId = Arc::from(name);
            if name == target {
                let l = fields[len_ix]
                    .parse::<usize>()
                    .with_context(|| format!("{}:{} Error reading length", source, line))?;
                tgt = Some((Arc::clone(&key), l));
            }
            match abundance.entry(key) {
                Entry::Occupied(_) => {
                    return Err(CovError::DuplicateSequence(name.to_owned()))
                        .with_context(|| format!("{}:{}", source, line))
                }
                Entry::Vacant(e) => {
                    e.insert(x);
                }
            }
        }

        let (target, target_len) =
            tgt.ok_or_else(|| CovError::TargetNotFound(target.to_owned()))?;

        debug!(
            "Read {} sequences from {}; target {} has length {}",
            abundance.len(),
            source,
            target,
            target_len
        );

        Ok(Self {
            target,
            target_len,
            abundance,
        })
    }
}

/// Read abundance table (Salmon quant.sf format, possibly compressed) from file
pub fn read_abundance_table<P: AsRef<Path>>(
    fname: P,
    target: &str,
) -> anyhow::Result<AbundanceTable> {
    let fname = fname.as_ref();
    debug!("Reading in abundance table from {}", fname.display());

    let rdr = CompressIo::new()
        .path(fname)
        .bufreader()
        .with_context(|| format!("Error opening abundance table {}", fname.display()))?;

    AbundanceTable::from_reader(rdr, target, &fname.display().to_string())
}
