use super::error::{Evidence, Result, SegError};
use super::evidence::{DistMap, Hit, PaeMatrix};
use intspan::IntSpan;
use serde::Deserialize;
use std::io::{BufRead, Read};

/// Parses a runlist such as `1-20,25,40-60`.
///
/// ```
/// use dpseg::libs::domain::reader::parse_runlist;
/// use dpseg::libs::domain::Evidence;
/// let ints = parse_runlist("141-160,5", Evidence::Disorder, 1).unwrap();
/// assert_eq!(ints.spans(), vec![(5, 5), (141, 160)]);
/// assert!(parse_runlist("9-x", Evidence::Disorder, 1).is_err());
/// ```
pub fn parse_runlist(runlist: &str, evidence: Evidence, line: usize) -> Result<IntSpan> {
    let mut ints = IntSpan::new();
    for run in runlist.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let bad = || SegError::malformed(evidence, line, format!("bad range '{}'", run));
        let (lower, upper) = match run.split_once('-') {
            Some((lower, upper)) => (
                lower.trim().parse::<i32>().map_err(|_| bad())?,
                upper.trim().parse::<i32>().map_err(|_| bad())?,
            ),
            None => {
                let n = run.parse::<i32>().map_err(|_| bad())?;
                (n, n)
            }
        };
        if lower > upper {
            return Err(bad());
        }
        ints.merge(&IntSpan::from_pair(lower, upper));
    }
    Ok(ints)
}

fn check_range(ints: &IntSpan, evidence: Evidence, length: usize) -> Result<()> {
    if ints.is_empty() {
        return Ok(());
    }
    for residue in [ints.min(), ints.max()] {
        if residue < 1 || residue as usize > length {
            return Err(SegError::ResidueOutOfRange {
                evidence,
                residue: residue as i64,
                length,
            });
        }
    }
    Ok(())
}

/// Disorder set: one runlist per line.
pub fn read_disorder<R: BufRead>(reader: R, length: usize) -> Result<IntSpan> {
    let mut disorder = IntSpan::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SegError::io(Evidence::Disorder, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let ints = parse_runlist(line, Evidence::Disorder, idx + 1)?;
        check_range(&ints, Evidence::Disorder, length)?;
        disorder.merge(&ints);
    }
    Ok(disorder)
}

/// Atoms of the first chain of the first model in a PDB file, as `(residue, [x, y, z])`.
///
/// Hydrogens are skipped. Residue numbers must be positive and free of insertion codes.
pub fn read_pdb_atoms<R: BufRead>(reader: R) -> Result<Vec<(usize, [f64; 3])>> {
    let mut atoms = vec![];
    let mut chain: Option<String> = None;
    let mut skipped = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SegError::io(Evidence::Distance, e))?;
        if line.starts_with("ENDMDL") {
            break;
        }
        if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
            continue;
        }
        if line.len() < 54 || !line.is_ascii() {
            return Err(SegError::malformed(
                Evidence::Distance,
                idx + 1,
                "coordinate record is too short",
            ));
        }
        let element = line.get(76..78).map(str::trim).unwrap_or("");
        if element == "H" {
            continue;
        }

        let field = |from: usize, to: usize| line[from..to].trim();
        let chain_id = field(21, 22).to_string();
        match &chain {
            None => chain = Some(chain_id),
            Some(first) if *first != chain_id => {
                skipped += 1;
                continue;
            }
            Some(_) => {}
        }
        let residue: i64 = field(22, 26).parse().map_err(|_| {
            SegError::malformed(Evidence::Distance, idx + 1, "bad residue number")
        })?;
        if residue < 1 {
            return Err(SegError::malformed(
                Evidence::Distance,
                idx + 1,
                format!("residue number {} is not positive", residue),
            ));
        }
        if !field(26, 27).is_empty() {
            return Err(SegError::malformed(
                Evidence::Distance,
                idx + 1,
                format!("insertion code on residue {}", residue),
            ));
        }
        let mut coord = [0.0; 3];
        for (k, (from, to)) in [(30, 38), (38, 46), (46, 54)].into_iter().enumerate() {
            coord[k] = field(from, to).parse().map_err(|_| {
                SegError::malformed(Evidence::Distance, idx + 1, "bad coordinate")
            })?;
        }
        atoms.push((residue as usize, coord));
    }
    if skipped > 0 {
        log::warn!(
            "kept chain '{}' only, skipped {} records of other chains",
            chain.unwrap_or_default(),
            skipped
        );
    }
    Ok(atoms)
}

/// Distances from `i<TAB>j<TAB>distance` lines; pairs never listed stay missing.
pub fn read_dist_tsv<R: BufRead>(reader: R, length: usize) -> Result<DistMap> {
    let mut map = DistMap::new(length, f64::INFINITY);
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SegError::io(Evidence::Distance, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(SegError::malformed(
                Evidence::Distance,
                idx + 1,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        }
        let residue = |s: &str| -> Result<usize> {
            let r: i64 = s.trim().parse().map_err(|_| {
                SegError::malformed(Evidence::Distance, idx + 1, "bad residue number")
            })?;
            if r < 1 || r as usize > length {
                return Err(SegError::ResidueOutOfRange {
                    evidence: Evidence::Distance,
                    residue: r,
                    length,
                });
            }
            Ok(r as usize)
        };
        let i = residue(fields[0])?;
        let j = residue(fields[1])?;
        let d: f64 = fields[2].trim().parse().map_err(|_| {
            SegError::malformed(Evidence::Distance, idx + 1, "bad distance")
        })?;
        if d.is_nan() || d < 0.0 {
            return Err(SegError::InvalidScore {
                evidence: Evidence::Distance,
                i,
                j,
                value: d,
            });
        }
        if i != j {
            map.set(i, j, d);
        }
    }
    Ok(map)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaeRecord {
    Matrix {
        predicted_aligned_error: Vec<Vec<f64>>,
    },
    Triplets {
        residue1: Vec<usize>,
        residue2: Vec<usize>,
        distance: Vec<f64>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaeDocument {
    List(Vec<PaeRecord>),
    Single(PaeRecord),
}

impl PaeRecord {
    fn into_rows(self, length: usize) -> Result<Vec<Vec<f64>>> {
        match self {
            PaeRecord::Matrix {
                predicted_aligned_error,
            } => Ok(predicted_aligned_error),
            PaeRecord::Triplets {
                residue1,
                residue2,
                distance,
            } => {
                if residue1.len() != distance.len() || residue2.len() != distance.len() {
                    return Err(SegError::ShapeMismatch {
                        evidence: Evidence::Pae,
                        expected: length,
                        found: format!(
                            "{}/{}/{} residue1/residue2/distance entries",
                            residue1.len(),
                            residue2.len(),
                            distance.len()
                        ),
                    });
                }
                let n = residue1.iter().chain(residue2.iter()).copied().max().unwrap_or(0);
                if n * n != distance.len() {
                    return Err(SegError::ShapeMismatch {
                        evidence: Evidence::Pae,
                        expected: length,
                        found: format!("{} entries for {} residues", distance.len(), n),
                    });
                }
                let mut rows = vec![vec![0.0; n]; n];
                let mut filled = vec![vec![false; n]; n];
                for ((&i, &j), &d) in residue1.iter().zip(residue2.iter()).zip(distance.iter()) {
                    if i == 0 || j == 0 {
                        return Err(SegError::ResidueOutOfRange {
                            evidence: Evidence::Pae,
                            residue: 0,
                            length,
                        });
                    }
                    rows[i - 1][j - 1] = d;
                    filled[i - 1][j - 1] = true;
                }
                for (i, row) in filled.iter().enumerate() {
                    if let Some(j) = row.iter().position(|&f| !f) {
                        return Err(SegError::ShapeMismatch {
                            evidence: Evidence::Pae,
                            expected: length,
                            found: format!("no entry for residue pair ({}, {})", i + 1, j + 1),
                        });
                    }
                }
                Ok(rows)
            }
        }
    }
}

/// PAE from AlphaFold JSON (current or legacy layout) or a whitespace-separated matrix.
pub fn read_pae<R: Read>(mut reader: R, length: usize) -> Result<PaeMatrix> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| SegError::io(Evidence::Pae, e))?;

    let trimmed = text.trim_start();
    let rows = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let doc: PaeDocument = serde_json::from_str(trimmed)
            .map_err(|e| SegError::malformed(Evidence::Pae, e.line(), e.to_string()))?;
        let record = match doc {
            PaeDocument::Single(record) => record,
            PaeDocument::List(records) => records.into_iter().next().ok_or_else(|| {
                SegError::malformed(Evidence::Pae, 1, "empty list of PAE records")
            })?,
        };
        record.into_rows(length)?
    } else {
        let mut rows = vec![];
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|v| v.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| SegError::malformed(Evidence::Pae, idx + 1, "bad number"))?;
            rows.push(row);
        }
        rows
    };

    PaeMatrix::from_rows(length, rows)
}

/// Hits from `template<TAB>score<TAB>query_runlist` lines.
pub fn read_hits<R: BufRead>(reader: R, evidence: Evidence, length: usize) -> Result<Vec<Hit>> {
    let mut hits = vec![];
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SegError::io(evidence, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(SegError::malformed(
                evidence,
                idx + 1,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        }
        let score: f64 = fields[1]
            .trim()
            .parse()
            .map_err(|_| SegError::malformed(evidence, idx + 1, "bad score"))?;
        let residues = parse_runlist(fields[2], evidence, idx + 1)?;
        check_range(&residues, evidence, length)?;

        hits.push(Hit {
            template: fields[0].trim().to_string(),
            score,
            residues,
        });
    }
    Ok(hits)
}
