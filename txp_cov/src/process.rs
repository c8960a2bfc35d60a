use std::{mem, thread};

use anyhow::Context;
use crossbeam_channel::{bounded, Sender};

use crate::{
    abundance::AbundanceTable,
    alignment::{AlignmentGroup, AlignmentRecord, Groups},
    config::{Config, SeqId},
    coverage::{accumulate, CoverageMap},
    input::AlignmentReader,
    output::output_coverage,
};

const PROGRESS_INTERVAL: usize = 100_000;
const BATCH_SIZE: usize = 1024;
const CHANNEL_DEPTH: usize = 16;

/// Group records by read and pass on, in batches, the groups with an alignment to the target.
/// Returns the number of reads seen
fn read_groups<I>(
    records: I,
    target: &SeqId,
    snd: Sender<Vec<AlignmentGroup>>,
) -> anyhow::Result<usize>
where
    I: Iterator<Item = anyhow::Result<AlignmentRecord>>,
{
    debug!("Reader task starting up");
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut n_reads = 0;
    let mut n_records = 0;
    let mut n_off_target = 0;

    for g in Groups::new(records, target) {
        let g = g.with_context(|| format!("Error after reading {} reads", n_reads))?;
        n_reads += 1;
        n_records += g.n_records();
        if n_reads % PROGRESS_INTERVAL == 0 {
            info!("Done {} reads", n_reads);
        }
        // Groups never aligned to the target cannot add coverage
        if g.target_pos().is_none() {
            n_off_target += 1;
            continue;
        }
        batch.push(g);
        if batch.len() == BATCH_SIZE {
            snd.send(mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE)))?;
        }
    }
    if !batch.is_empty() {
        snd.send(batch)?;
    }
    debug!(
        "Reader task finished: {} records from {} reads, {} reads not aligned to target",
        n_records, n_reads, n_off_target
    );
    Ok(n_reads)
}

/// Strategy
///
/// One thread reads the alignments and splits them into groups (one per read), which
/// must stay a single ordered pass.  Completed groups touching the target are sent in
/// batches over a channel to the calling thread, which resolves them and adds them to the
/// coverage map.  With a single sender and receiver the groups arrive in input order.
///
/// `open` is called on the reader thread to set up the record source
pub fn compute_coverage<F, I>(open: F, table: &AbundanceTable) -> anyhow::Result<CoverageMap>
where
    F: FnOnce() -> anyhow::Result<I> + Send,
    I: Iterator<Item = anyhow::Result<AlignmentRecord>>,
{
    let target = table.target();
    thread::scope(|sc| {
        let (snd, recv) = bounded(CHANNEL_DEPTH);
        let jh = sc.spawn(move || read_groups(open()?, target, snd));

        let res = accumulate(recv.iter().flatten(), table);
        // Unblock the reader if we stopped early
        drop(recv);
        let rd = jh
            .join()
            .map_err(|_| anyhow!("Alignment reader thread panicked"))?;

        let (cov, stats) = res.with_context(|| "Error resolving alignment groups")?;
        let n_reads = rd?;
        info!("Finished processing {} reads", n_reads);
        stats.log();
        Ok(cov)
    })
}

pub fn process_alignments(cfg: &Config) -> anyhow::Result<()> {
    let table = cfg.abundance();
    debug!(
        "Starting processing for {} ({} sequences in abundance table)",
        table.target(),
        table.len()
    );
    let cov = compute_coverage(
        || AlignmentReader::open(cfg.input(), cfg.reference(), cfg.threads()),
        table,
    )?;

    if cov.is_empty() {
        warn!("No coverage found for {}", table.target())
    } else {
        debug!("{} positions covered", cov.len())
    }
    let n = cov.n_beyond(table.target_len());
    if n > 0 {
        warn!(
            "{} covered positions lie beyond the end of {} (length {}) and are not reported",
            n,
            table.target(),
            table.target_len()
        );
    }
    output_coverage(cfg.output(), table.target(), table.target_len(), &cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alignment::tests::rec, error::CovError, output::write_coverage};
    use crossbeam_channel::unbounded;
    use std::{io::Cursor, sync::Arc};

    const QUANT: &str = "Name\tLength\tEffectiveLength\tTPM\tNumReads\nT1\t3\t3\t1\t4\nT2\t8\t8\t1\t4\n";

    fn run(recs: Vec<AlignmentRecord>) -> anyhow::Result<String> {
        let table = AbundanceTable::from_reader(Cursor::new(QUANT), "T1", "test")?;
        let cov = compute_coverage(
            move || Ok(recs.into_iter().map(Ok::<_, anyhow::Error>)),
            &table,
        )?;
        let mut v = Vec::new();
        write_coverage(&mut v, table.target(), table.target_len(), &cov)?;
        Ok(String::from_utf8(v)?)
    }

    #[test]
    fn multimapping_read_is_shared() {
        let s = run(vec![
            rec("read1", Some("T1"), 0),
            rec("read1", Some("T2"), 2),
            rec("read2", Some("T1"), 0),
        ])
        .unwrap();
        assert_eq!(s, "T1\t1.0\t0.0\t0.0\n");
    }

    #[test]
    fn read_without_target_alignment_adds_nothing() {
        let s = run(vec![
            rec("read1", Some("T2"), 0),
            rec("read2", Some("T1"), 0),
        ])
        .unwrap();
        assert_eq!(s, "T1\t1.0\t0.0\t0.0\n");
    }

    #[test]
    fn many_reads_span_batches() {
        // Enough reads to need several batches; each alternates between the two targets
        let mut v = Vec::new();
        for i in 0..(3 * BATCH_SIZE + 7) {
            let id = format!("r{}", i);
            v.push(rec(&id, Some("T1"), i % 3));
            if i % 2 == 1 {
                v.push(rec(&id, Some("T2"), 0));
            }
        }
        let s = run(v).unwrap();
        let fields: Vec<f64> = s
            .trim_end()
            .split('\t')
            .skip(1)
            .map(|x| x.parse().unwrap())
            .collect();
        assert_eq!(fields.len(), 3);
        let total: f64 = fields.iter().sum();
        let n = 3 * BATCH_SIZE + 7;
        let expected = (n / 2) as f64 * 0.5 + (n - n / 2) as f64;
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn only_target_groups_are_sent() {
        let target: SeqId = Arc::from("T1");
        let recs = vec![
            rec("read1", Some("T2"), 0),
            rec("read2", Some("T2"), 1),
            rec("read2", Some("T1"), 2),
            rec("read3", None, 0),
            rec("read4", Some("T1"), 0),
        ];
        let (snd, recv) = unbounded();
        let n = read_groups(recs.into_iter().map(Ok), &target, snd).unwrap();
        assert_eq!(n, 4);
        let ids: Vec<String> = recv
            .iter()
            .flatten()
            .map(|g| g.read_id().to_owned())
            .collect();
        assert_eq!(ids, vec!["read2", "read4"]);
    }

    #[test]
    fn reader_errors_abort() {
        let table = AbundanceTable::from_reader(Cursor::new(QUANT), "T1", "test").unwrap();
        let recs = vec![
            Ok(rec("read1", Some("T1"), 0)),
            Err(anyhow!("corrupt record")),
        ];
        assert!(compute_coverage(move || Ok(recs.into_iter()), &table).is_err());
        assert!(compute_coverage(
            || Err::<std::iter::Empty<anyhow::Result<AlignmentRecord>>, _>(anyhow!("no file")),
            &table
        )
        .is_err());
    }

    #[test]
    fn unknown_sequence_aborts() {
        let e = run(vec![rec("read1", Some("T1"), 0), rec("read1", Some("T7"), 0)]).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<CovError>(),
            Some(CovError::UnknownSequence(_))
        ));
    }
}
