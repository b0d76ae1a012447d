//! Subcommand modules for the `dpseg` binary.

pub mod parse;
pub mod prob;
pub mod table;

use clap::*;
use dpseg::libs::domain::reader;
use dpseg::libs::domain::{DistMap, Evidence, EvidenceSet, Params, TableSet};

pub fn arg_tables() -> Arg {
    Arg::new("tables")
        .long("tables")
        .num_args(1)
        .help("Lookup tables replacing the built-in calibrations (kind<TAB>bound<TAB>prob)")
}

/// Evidence files and the chain length.
pub fn evidence_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("length")
            .long("length")
            .short('l')
            .required(true)
            .num_args(1)
            .value_parser(value_parser!(usize))
            .help("Number of residues in the chain"),
    )
    .arg(
        Arg::new("pae")
            .long("pae")
            .required(true)
            .num_args(1)
            .help("Predicted aligned error, AlphaFold JSON or a plain matrix"),
    )
    .arg(
        Arg::new("pdb")
            .long("pdb")
            .num_args(1)
            .help("Coordinates in PDB format; distances are taken between closest atoms"),
    )
    .arg(
        Arg::new("dist")
            .long("dist")
            .num_args(1)
            .help("Residue-pair distances, i<TAB>j<TAB>distance"),
    )
    .group(
        ArgGroup::new("coords")
            .args(["pdb", "dist"])
            .required(true),
    )
    .arg(
        Arg::new("disorder")
            .long("disorder")
            .num_args(1)
            .help("Disordered residues, one runlist per line"),
    )
    .arg(
        Arg::new("hh")
            .long("hh")
            .num_args(1)
            .help("Homology hits, template<TAB>score<TAB>runlist"),
    )
    .arg(
        Arg::new("dali")
            .long("dali")
            .num_args(1)
            .help("Structure-alignment hits, template<TAB>score<TAB>runlist"),
    )
    .arg(arg_tables())
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .short('p')
            .num_args(1)
            .default_value("1")
            .value_parser(value_parser!(usize))
            .help("Number of threads for the probability matrix"),
    )
}

/// Segmentation tunables, defaults as in `Params::default()`.
pub fn param_args(cmd: Command) -> Command {
    let usize_arg = |id: &'static str, long: &'static str, default: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .num_args(1)
            .default_value(default)
            .value_parser(value_parser!(usize))
            .help(help)
    };
    let f64_arg = |id: &'static str, long: &'static str, default: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .num_args(1)
            .default_value(default)
            .value_parser(value_parser!(f64))
            .help(help)
    };

    cmd.arg(usize_arg("min_sep", "min-sep", "5", "Minimum sequence separation of a scored pair"))
        .arg(usize_arg("seg_width", "seg-width", "5", "Width of the initial segments"))
        .arg(usize_arg("seg_min", "seg-min", "3", "Ordered residues a segment needs"))
        .arg(f64_arg("merge_prob", "merge-prob", "0.64", "Mean probability a threshold merge must exceed"))
        .arg(usize_arg("small_pairs", "small-pairs", "20", "Clusters with at most this many pairs always merge"))
        .arg(f64_arg("tolerance", "tolerance", "1.1", "Similarity multiplier against the weaker cohesion"))
        .arg(usize_arg("min_domain", "min-domain", "25", "Minimum residues of a domain"))
        .arg(usize_arg("gap_short", "gap-short", "10", "Gaps up to this length are always filled"))
        .arg(usize_arg("gap_long", "gap-long", "20", "Gaps up to this length are filled when unclaimed"))
        .arg(usize_arg("gap_claim", "gap-claim", "10", "Residues another domain needs to claim a gap"))
        .arg(usize_arg("min_exclusive", "min-exclusive", "10", "Residues a domain keeps after overlap removal"))
}

pub fn load_params(args: &ArgMatches) -> Params {
    let get_usize = |id: &str| *args.get_one::<usize>(id).unwrap();
    let get_f64 = |id: &str| *args.get_one::<f64>(id).unwrap();

    Params {
        min_sep: get_usize("min_sep"),
        seg_width: get_usize("seg_width"),
        seg_min: get_usize("seg_min"),
        merge_prob: get_f64("merge_prob"),
        small_pairs: get_usize("small_pairs"),
        tolerance: get_f64("tolerance"),
        min_domain: get_usize("min_domain"),
        gap_short: get_usize("gap_short"),
        gap_long: get_usize("gap_long"),
        gap_claim: get_usize("gap_claim"),
        min_exclusive: get_usize("min_exclusive"),
        ..Params::default()
    }
}

pub fn load_tables(args: &ArgMatches) -> anyhow::Result<TableSet> {
    let tables = match args.get_one::<String>("tables") {
        Some(infile) => TableSet::from_reader(intspan::reader(infile))?,
        None => TableSet::default(),
    };
    Ok(tables)
}

pub fn load_evidence(args: &ArgMatches) -> anyhow::Result<EvidenceSet> {
    let length = *args.get_one::<usize>("length").unwrap();

    let pae = reader::read_pae(intspan::reader(args.get_one::<String>("pae").unwrap()), length)?;

    let dist = match args.get_one::<String>("pdb") {
        Some(infile) => {
            let atoms = reader::read_pdb_atoms(intspan::reader(infile))?;
            log::info!("{} atoms from {}", atoms.len(), infile);
            DistMap::from_atoms(length, &atoms)?
        }
        None => reader::read_dist_tsv(intspan::reader(args.get_one::<String>("dist").unwrap()), length)?,
    };

    let disorder = match args.get_one::<String>("disorder") {
        Some(infile) => reader::read_disorder(intspan::reader(infile), length)?,
        None => intspan::IntSpan::new(),
    };

    let hits = |id: &str, evidence: Evidence| -> anyhow::Result<_> {
        let hits = match args.get_one::<String>(id) {
            Some(infile) => reader::read_hits(intspan::reader(infile), evidence, length)?,
            None => vec![],
        };
        log::info!("{} {}", hits.len(), evidence);
        Ok(hits)
    };
    let hh = hits("hh", Evidence::Homology)?;
    let dali = hits("dali", Evidence::Structure)?;

    Ok(EvidenceSet {
        length,
        disorder,
        dist,
        pae,
        hh,
        dali,
    })
}

pub fn init_pool(args: &ArgMatches) -> anyhow::Result<()> {
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;
    Ok(())
}
