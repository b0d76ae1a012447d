use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("table")
        .about("Prints the active probability lookup tables")
        .after_help(
            r###"
Each line is `kind<TAB>bound<TAB>prob`, kind one of dist, pae, hh, dali.

* dist, pae: the first bound with value <= bound applies
* hh, dali: the first bound with score >= bound applies
* A `*` bound is the floor, used when no bound applies

The output is itself a valid --tables file. Kinds missing from a --tables file keep their
built-in calibration.

Examples:
1. dpseg table

2. dpseg table --tables my.tables

"###,
        )
        .arg(super::arg_tables())
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let tables = super::load_tables(args)?;

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    for line in tables.to_lines() {
        writer.write_fmt(format_args!("{}\n", line))?;
    }

    Ok(())
}
