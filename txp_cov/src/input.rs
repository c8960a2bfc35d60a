use std::{path::Path, sync::Arc};

use anyhow::Context;
use rust_htslib::bam::{self, Read};

use crate::{alignment::AlignmentRecord, config::SeqId, error::CovError};

/// Open SAM/BAM/CRAM file for sequential reading
fn open_input(
    name: &Path,
    reference: Option<&Path>,
    threads: usize,
) -> anyhow::Result<bam::Reader> {
    debug!(
        "Try to open input file {} with reference {:?}",
        name.display(),
        reference
    );

    let mut rdr = bam::Reader::from_path(name)
        .with_context(|| format!("Failed to open input file {}", name.display()))?;

    if let Some(r) = reference {
        rdr.set_reference(r)
            .with_context(|| format!("Could not set reference {} for input", r.display()))?;
    }

    if threads > 1 {
        debug!("Using {} threads for decompression", threads);
        rdr.set_threads(threads)
            .with_context(|| "Failed to set up decompression threads")?;
    }
    Ok(rdr)
}

/// Reads alignment records in file order
///
/// Reference names are taken from the file header and shared between records
pub struct AlignmentReader {
    rdr: bam::Reader,
    rec: bam::Record,
    names: Vec<SeqId>,
}

impl AlignmentReader {
    pub fn open(name: &Path, reference: Option<&Path>, threads: usize) -> anyhow::Result<Self> {
        let rdr = open_input(name, reference, threads)?;
        let names: Vec<SeqId> = rdr
            .header()
            .target_names()
            .iter()
            .map(|s| Arc::from(&*String::from_utf8_lossy(s)))
            .collect();
        debug!("{} reference sequences in header", names.len());
        Ok(Self {
            rdr,
            rec: bam::Record::new(),
            names,
        })
    }
}

/// Convert an htslib record using the reference names from the header
///
/// Unmapped records (flag 0x4 or no reference id) carry no target.  A mapped record with a
/// negative position cannot be placed on the target and is rejected
fn alignment_record(rec: &bam::Record, names: &[SeqId]) -> anyhow::Result<AlignmentRecord> {
    let read_id = String::from_utf8_lossy(rec.qname()).into_owned();
    if rec.is_unmapped() || rec.tid() < 0 {
        return Ok(AlignmentRecord::unmapped(read_id));
    }
    let tid = rec.tid() as usize;
    let target = names
        .get(tid)
        .cloned()
        .ok_or_else(|| anyhow!("Read {} aligned to unknown reference id {}", read_id, tid))?;
    let pos = rec.pos();
    let start = usize::try_from(pos).map_err(|_| CovError::InvariantViolation {
        read: read_id.clone(),
        target: target.to_string(),
        pos,
    })?;
    Ok(AlignmentRecord::new(read_id, Some(target), start))
}

impl Iterator for AlignmentReader {
    type Item = anyhow::Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rdr.read(&mut self.rec) {
            None => None,
            Some(Err(e)) => Some(Err(e).with_context(|| "Error reading alignment record")),
            Some(Ok(())) => Some(alignment_record(&self.rec, &self.names)),
        }
    }
}
