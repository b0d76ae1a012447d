use clap::*;
use dpseg::libs::domain::parse_domains;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("parse")
        .about("Splits a chain into structural domains")
        .after_help(
            r###"
Fuses four lines of evidence into one probability per residue pair, then clusters residues
into domains.

Evidence:
* --pdb or --dist: residue-pair distances
* --pae: predicted aligned error, N x N
* --disorder: residues left out of every domain
* --hh, --dali: homology and structure-alignment hits, optional

Output:
* One line per domain, `label<TAB>ranges`, e.g. `D2<TAB>130-250,260-280`
* Domains are numbered by their first residue
* No domain is a valid result; the output is then empty
* --copy writes the same content to a second file

Examples:
1. Distances from coordinates:
   dpseg parse --length 120 --pdb tests/parse/model.pdb --pae tests/parse/pae.json

2. With disorder and hits, also written as a second file:
   dpseg parse --length 120 --pdb tests/parse/model.pdb --pae tests/parse/pae.json \
       --disorder tests/parse/disorder.txt --hh tests/parse/hh.tsv \
       -o domains.tsv --copy domains.final

"###,
        );
    let cmd = super::evidence_args(cmd);
    super::param_args(cmd)
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
        .arg(
            Arg::new("copy")
                .long("copy")
                .num_args(1)
                .help("Also write an identical copy to this file"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    super::init_pool(args)?;

    let tables = super::load_tables(args)?;
    let params = super::load_params(args);
    let evidence = super::load_evidence(args)?;

    let domains = parse_domains(&evidence, &tables, &params)?;

    let mut out_string = String::new();
    for domain in &domains {
        out_string += &format!("{}\t{}\n", domain.label, domain.ranges());
    }

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    writer.write_all(out_string.as_bytes())?;

    if let Some(copy) = args.get_one::<String>("copy") {
        let mut writer = intspan::writer(copy);
        writer.write_all(out_string.as_bytes())?;
    }

    Ok(())
}
