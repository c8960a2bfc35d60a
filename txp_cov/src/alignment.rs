use std::sync::Arc;

use crate::config::SeqId;

/// One alignment of a read
///
/// target_id - aligned sequence, None for unmapped records
/// start - 0 based leftmost position on target_id (ignored if unmapped)
///
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    read_id: String,
    target_id: Option<SeqId>,
    start: usize,
}

impl AlignmentRecord {
    pub fn new(read_id: String, target_id: Option<SeqId>, start: usize) -> Self {
        Self {
            read_id,
            target_id,
            start,
        }
    }

    pub fn unmapped(read_id: String) -> Self {
        Self::new(read_id, None, 0)
    }
}

/// All consecutive alignment records of one read
///
/// candidates - every sequence the read aligned to, in input order and including repeats
/// target_pos - start of the last alignment to the target sequence, if any
///
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentGroup {
    read_id: String,
    candidates: Vec<SeqId>,
    target_pos: Option<usize>,
    n_records: usize,
}

impl AlignmentGroup {
    fn new(read_id: String) -> Self {
        Self {
            read_id,
            candidates: Vec::new(),
            target_pos: None,
            n_records: 0,
        }
    }

    pub fn read_id(&self) -> &str {
        &self.read_id
    }

    pub fn candidates(&self) -> &[SeqId] {
        &self.candidates
    }

    pub fn target_pos(&self) -> Option<usize> {
        self.target_pos
    }

    pub fn n_records(&self) -> usize {
        self.n_records
    }
}

/// Splits an ordered record stream into groups of adjacent records with the same read id
///
/// Records of one read must be contiguous in the input; reads are never re-sorted,
/// so a read id that reappears later starts a new group.
pub struct GroupBuilder {
    target: SeqId,
    current: Option<AlignmentGroup>,
}

impl GroupBuilder {
    pub fn new(target: &SeqId) -> Self {
        Self {
            target: Arc::clone(target),
            current: None,
        }
    }

    /// Add a record.  If it starts a new read, the previous group is returned
    pub fn push(&mut self, rec: AlignmentRecord) -> Option<AlignmentGroup> {
        let same_read = self
            .current
            .as_ref()
            .map(|g| g.read_id == rec.read_id)
            .unwrap_or(false);
        let finished = if same_read {
            None
        } else {
            self.current
                .replace(AlignmentGroup::new(rec.read_id.clone()))
        };

        if let Some(g) = self.current.as_mut() {
            g.n_records += 1;
            if let Some(tid) = rec.target_id {
                if tid == self.target {
                    // Later alignments to the target overwrite earlier ones
                    g.target_pos = Some(rec.start);
                }
                g.candidates.push(tid);
            }
        }
        finished
    }

    /// Finalize the group in progress at the end of the input
    pub fn finish(&mut self) -> Option<AlignmentGroup> {
        self.current.take()
    }
}

/// Iterator adapter turning a fallible record stream into a stream of groups
pub struct Groups<I> {
    records: I,
    builder: GroupBuilder,
    done: bool,
}

impl<I, E> Groups<I>
where
    I: Iterator<Item = Result<AlignmentRecord, E>>,
{
    pub fn new(records: I, target: &SeqId) -> Self {
        Self {
            records,
            builder: GroupBuilder::new(target),
            done: false,
        }
    }
}

impl<I, E> Iterator for Groups<I>
where
    I: Iterator<Item = Result<AlignmentRecord, E>>,
{
    type Item = Result<AlignmentGroup, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for r in self.records.by_ref() {
            match r {
                Ok(rec) => {
                    if let Some(g) = self.builder.push(rec) {
                        return Some(Ok(g));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.done = true;
        self.builder.finish().map(Ok)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn rec(read: &str, target: Option<&str>, start: usize) -> AlignmentRecord {
        AlignmentRecord::new(read.to_owned(), target.map(Arc::from), start)
    }

    fn groups(recs: Vec<AlignmentRecord>, target: &str) -> Vec<AlignmentGroup> {
        let target: SeqId = Arc::from(target);
        Groups::new(recs.into_iter().map(Ok::<_, ()>), &target)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn names(g: &AlignmentGroup) -> Vec<&str> {
        g.candidates().iter().map(|s| s.as_ref()).collect()
    }

    #[test]
    fn adjacent_records_are_grouped() {
        let v = groups(
            vec![
                rec("r1", Some("T1"), 0),
                rec("r1", Some("T2"), 5),
                rec("r2", Some("T2"), 7),
                rec("r3", None, 0),
            ],
            "T1",
        );
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].read_id(), "r1");
        assert_eq!(names(&v[0]), vec!["T1", "T2"]);
        assert_eq!(v[0].target_pos(), Some(0));
        assert_eq!(v[1].target_pos(), None);
        // Unmapped records count but add no candidate
        assert_eq!(v[2].n_records(), 1);
        assert!(v[2].candidates().is_empty());
    }

    #[test]
    fn trailing_group_is_emitted() {
        let v = groups(vec![rec("r1", Some("T1"), 3)], "T1");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].target_pos(), Some(3));
        assert!(groups(Vec::new(), "T1").is_empty());
    }

    #[test]
    fn last_target_offset_wins_and_repeats_are_kept() {
        let v = groups(
            vec![
                rec("r1", Some("T1"), 10),
                rec("r1", Some("T2"), 1),
                rec("r1", Some("T1"), 20),
                rec("r1", Some("T2"), 1),
            ],
            "T1",
        );
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].target_pos(), Some(20));
        assert_eq!(names(&v[0]), vec!["T1", "T2", "T1", "T2"]);
    }

    #[test]
    fn non_adjacent_reads_are_separate_groups() {
        let v = groups(
            vec![
                rec("r1", Some("T1"), 0),
                rec("r2", Some("T1"), 1),
                rec("r1", Some("T1"), 2),
            ],
            "T1",
        );
        let ids: Vec<_> = v.iter().map(|g| g.read_id()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r1"]);
        assert_eq!(v[2].target_pos(), Some(2));
    }

    #[test]
    fn errors_stop_the_stream() {
        let target: SeqId = Arc::from("T1");
        let recs = vec![
            Ok(rec("r1", Some("T1"), 0)),
            Err("bad record"),
            Ok(rec("r2", None, 0)),
        ];
        let mut it = Groups::new(recs.into_iter(), &target);
        assert_eq!(it.next(), Some(Err("bad record")));
        assert_eq!(it.next(), None);
    }
}
