use clap::*;
use dpseg::libs::domain::ProbMatrix;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("prob")
        .about("Prints the fused residue-pair probabilities")
        .after_help(
            r###"
Writes `i<TAB>j<TAB>p` for every scored pair with i < j, four decimals.

Pairs closer than --min-sep along the chain, and pairs of two disordered residues, carry
no probability and are not printed. Useful when checking a new set of lookup tables.

Examples:
1. dpseg prob --length 120 --pdb tests/parse/model.pdb --pae tests/parse/pae.json

2. dpseg prob --length 120 --dist pairs.tsv --pae pae.txt --tables my.tables

"###,
        )
        .arg(
            Arg::new("min_sep")
                .long("min-sep")
                .num_args(1)
                .default_value("5")
                .value_parser(value_parser!(usize))
                .help("Minimum sequence separation of a scored pair"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );
    super::evidence_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    super::init_pool(args)?;

    let tables = super::load_tables(args)?;
    let mut params = dpseg::libs::domain::Params::default();
    params.min_sep = *args.get_one::<usize>("min_sep").unwrap();
    let evidence = super::load_evidence(args)?;

    let prob = ProbMatrix::build(&evidence, &tables, &params)?;

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    for (i, j, p) in prob.pairs() {
        writer.write_fmt(format_args!("{}\t{}\t{:.4}\n", i, j, p))?;
    }

    Ok(())
}
