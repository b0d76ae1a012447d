extern crate clap;
use clap::*;

mod cmd_dpseg;

fn main() -> anyhow::Result<()> {
    let app = Command::new("dpseg")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`dpseg` - Domain segmentation of folded protein chains")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log progress of each stage to stderr"),
        )
        .subcommand(cmd_dpseg::parse::make_subcommand())
        .subcommand(cmd_dpseg::prob::make_subcommand())
        .subcommand(cmd_dpseg::table::make_subcommand())
        .after_help(
            r###"Subcommands:

* parse - Split a chain into domains from distance, PAE, disorder and hits
* prob  - Dump the fused residue-pair probabilities
* table - Print the active probability lookup tables

Logging:
* Warnings go to stderr by default; `-v` adds per-stage progress
* RUST_LOG overrides both, e.g. `RUST_LOG=debug` shows every merge

"###,
        );

    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("parse", sub_matches)) => cmd_dpseg::parse::execute(sub_matches),
        Some(("prob", sub_matches)) => cmd_dpseg::prob::execute(sub_matches),
        Some(("table", sub_matches)) => cmd_dpseg::table::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
