use std::{num::NonZeroUsize, path::PathBuf};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    Command,
};

use anyhow::Context;

use utils::{init_log, LogLevel};

use crate::{abundance::read_abundance_table, config::Config};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("info")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(NonZeroUsize))
                .value_name("INT")
                .help("Set number of decompression threads [default: available cores]"),
        )
        .arg(
            Arg::new("reference")
                .short('r')
                .long("reference")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Reference FASTA file (for CRAM input)"),
        )
        .arg(
            Arg::new("sam")
                .short('a')
                .long("sam")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("Input SAM/BAM/CRAM file with all alignments of a read on consecutive lines"),
        )
        .arg(
            Arg::new("sf")
                .short('s')
                .long("sf")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("Abundance table (quant.sf) with Name, Length and NumReads columns"),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("Output file"),
        )
        .arg(
            Arg::new("tid")
                .short('T')
                .long("tid")
                .value_parser(value_parser!(String))
                .value_name("STRING")
                .required(true)
                .help("Name of target sequence to generate coverage for"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m)?;

    debug!("Processing command line options");

    let nt = m
        .get_one::<NonZeroUsize>("threads")
        .map(|x| usize::from(*x))
        .unwrap_or_else(num_cpus::get);

    let target = m.get_one::<String>("tid").expect("Missing target id");

    // Load abundances now so that a missing target is reported before any alignments are read
    let sf = m.get_one::<PathBuf>("sf").expect("Missing abundance table");
    let abundance = read_abundance_table(sf, target)
        .with_context(|| format!("Could not load abundance table {}", sf.display()))?;

    let mut cfg = Config::new(
        m.get_one::<PathBuf>("sam")
            .expect("Missing input file")
            .to_owned(),
        m.get_one::<PathBuf>("out")
            .expect("Missing output file")
            .to_owned(),
        abundance,
    );

    if let Some(p) = m.get_one::<PathBuf>("reference") {
        cfg.set_reference(p.to_owned())
    }

    cfg.set_threads(nt);

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_is_consistent() {
        cli_model().debug_assert();
    }

    #[test]
    fn all_inputs_are_required() {
        let r = cli_model().try_get_matches_from(["txp_cov", "--sam", "in.bam", "--tid", "T1"]);
        assert!(r.is_err());
        let m = cli_model()
            .try_get_matches_from([
                "txp_cov", "-a", "in.bam", "-s", "quant.sf", "-o", "out.txt", "-T", "T1",
            ])
            .unwrap();
        assert_eq!(m.get_one::<String>("tid").map(|s| s.as_str()), Some("T1"));
        assert_eq!(
            m.get_one::<LogLevel>("loglevel").map(|l| l.to_string()),
            Some("info".to_owned())
        );
    }
}
