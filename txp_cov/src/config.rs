use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::abundance::AbundanceTable;

/// Config
///
/// Configuration info for the program
/// This is generated from the command line arguments
/// Once set it is read only
///
/// input - path to SAM/BAM/CRAM alignment file
/// reference - optional reference FASTA (needed for some CRAM files)
/// output - path to output file
/// abundance - abundance table, already checked to contain the target
/// threads - number of htslib decompression threads
///
pub struct Config {
    input: PathBuf,
    reference: Option<PathBuf>,
    output: PathBuf,
    abundance: AbundanceTable,
    threads: usize,
}

impl Config {
    pub fn new(input: PathBuf, output: PathBuf, abundance: AbundanceTable) -> Self {
        Self {
            input,
            reference: None,
            output,
            abundance,
            threads: 1,
        }
    }

    pub fn set_reference(&mut self, p: PathBuf) {
        self.reference = Some(p)
    }

    pub fn set_threads(&mut self, n: usize) {
        self.threads = n.max(1)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn reference(&self) -> Option<&Path> {
        self.reference.as_deref()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn abundance(&self) -> &AbundanceTable {
        &self.abundance
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

pub type SeqId = Arc<str>;
