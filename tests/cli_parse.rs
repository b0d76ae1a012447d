use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn command_invalid() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("dpseg")?;
    cmd.arg("foobar");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("recognized"));

    Ok(())
}

#[test]
fn command_parse_two_domains() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("dpseg")?;
    let output = cmd
        .arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pdb")
        .arg("tests/parse/model.pdb")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .arg("--disorder")
        .arg("tests/parse/disorder.txt")
        .arg("--hh")
        .arg("tests/parse/hh.tsv")
        .arg("--dali")
        .arg("tests/parse/dali.tsv")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert_eq!(stdout, "D1\t1-55\nD2\t66-120\n");

    Ok(())
}

#[test]
fn command_parse_linker_joins_a_domain() -> anyhow::Result<()> {
    // without a disorder set the linker is ordered and sticks to the first domain
    let mut cmd = Command::cargo_bin("dpseg")?;
    let output = cmd
        .arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pdb")
        .arg("tests/parse/model.pdb")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("D1\t1-65\n"));
    assert!(stdout.contains("D2\t66-120\n"));

    Ok(())
}

#[test]
fn command_parse_copy() -> anyhow::Result<()> {
    let tempdir = tempfile::TempDir::new()?;
    let outfile = tempdir.path().join("domains.tsv");
    let copy = tempdir.path().join("domains.final");

    let mut cmd = Command::cargo_bin("dpseg")?;
    cmd.arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pdb")
        .arg("tests/parse/model.pdb")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .arg("--disorder")
        .arg("tests/parse/disorder.txt")
        .arg("-o")
        .arg(outfile.to_str().unwrap())
        .arg("--copy")
        .arg(copy.to_str().unwrap())
        .assert()
        .success();

    let first = std::fs::read(&outfile)?;
    let second = std::fs::read(&copy)?;
    assert_eq!(first, second);
    assert_eq!(String::from_utf8(first)?, "D1\t1-55\nD2\t66-120\n");

    Ok(())
}

#[test]
fn command_parse_no_domain() -> anyhow::Result<()> {
    // a minimum size above the chain length leaves nothing, which is not an error
    let mut cmd = Command::cargo_bin("dpseg")?;
    let output = cmd
        .arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pdb")
        .arg("tests/parse/model.pdb")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .arg("--min-domain")
        .arg("200")
        .output()?;

    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn command_parse_shape_mismatch() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("dpseg")?;
    cmd.arg("parse")
        .arg("--length")
        .arg("100")
        .arg("--dist")
        .arg("tests/parse/pairs.tsv")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PAE: expected a 100x100 matrix"));

    Ok(())
}

#[test]
fn command_parse_needs_coordinates() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("dpseg")?;
    cmd.arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pdb"));

    Ok(())
}

#[test]
fn command_parse_bad_hits() -> anyhow::Result<()> {
    let tempdir = tempfile::TempDir::new()?;
    let hits = tempdir.path().join("hh.tsv");
    std::fs::write(&hits, "e1a0aA1\t150\t3-52\ne9z9zZ9\t80\t100-130\n")?;

    let mut cmd = Command::cargo_bin("dpseg")?;
    cmd.arg("parse")
        .arg("--length")
        .arg("120")
        .arg("--pdb")
        .arg("tests/parse/model.pdb")
        .arg("--pae")
        .arg("tests/parse/pae.json")
        .arg("--hh")
        .arg(hits.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("homology hits: residue 130"));

    Ok(())
}
