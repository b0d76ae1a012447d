use super::error::{Evidence, Result, SegError};
use intspan::IntSpan;
use std::collections::BTreeMap;

/// Values for unordered residue pairs `(i, j)`, `i != j`, 1-based.
///
/// Stored as the packed upper triangle of an `n x n` matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct PairTable<T> {
    n: usize,
    values: Vec<T>,
}

impl<T: Copy> PairTable<T> {
    pub fn new(n: usize, fill: T) -> Self {
        Self {
            n,
            values: vec![fill; n * n.saturating_sub(1) / 2],
        }
    }

    /// Builds the table from rows, `rows[i - 1]` holding `(i, i + 1) ..= (i, n)`.
    pub(crate) fn from_rows(n: usize, rows: Vec<Vec<T>>) -> Self {
        let values: Vec<T> = rows.into_iter().flatten().collect();
        debug_assert_eq!(values.len(), n * n.saturating_sub(1) / 2);
        Self { n, values }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (a, b) = if i < j { (i - 1, j - 1) } else { (j - 1, i - 1) };
        a * self.n - a * (a + 1) / 2 + (b - a - 1)
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.values[self.index(i, j)]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let idx = self.index(i, j);
        self.values[idx] = value;
    }
}

/// Sorted members of a set of residues.
pub(crate) fn members(ints: &IntSpan) -> Vec<usize> {
    ints.spans()
        .into_iter()
        .flat_map(|(lower, upper)| lower..=upper)
        .map(|r| r as usize)
        .collect()
}

/// Residue-pair distances in Å; pairs never measured are `+inf`.
pub type DistMap = PairTable<f64>;

impl DistMap {
    /// Minimum inter-atomic distance between every two residues.
    ///
    /// `atoms` holds `(residue, [x, y, z])`; residues without atoms stay missing.
    pub fn from_atoms(n: usize, atoms: &[(usize, [f64; 3])]) -> Result<Self> {
        let mut by_residue: BTreeMap<usize, Vec<[f64; 3]>> = BTreeMap::new();
        for &(residue, coord) in atoms {
            if residue == 0 || residue > n {
                return Err(SegError::ResidueOutOfRange {
                    evidence: Evidence::Distance,
                    residue: residue as i64,
                    length: n,
                });
            }
            by_residue.entry(residue).or_default().push(coord);
        }

        let mut map = DistMap::new(n, f64::INFINITY);
        let residues: Vec<(usize, &Vec<[f64; 3]>)> =
            by_residue.iter().map(|(r, coords)| (*r, coords)).collect();
        for (x, &(ri, atoms_i)) in residues.iter().enumerate() {
            for &(rj, atoms_j) in residues.iter().skip(x + 1) {
                let mut best = f64::INFINITY;
                for a in atoms_i.iter() {
                    for b in atoms_j.iter() {
                        let d2 = (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2);
                        if d2 < best {
                            best = d2;
                        }
                    }
                }
                map.set(ri, rj, best.sqrt());
            }
        }

        Ok(map)
    }
}

/// Square predicted-aligned-error matrix, row-major, 1-based access.
#[derive(Clone, Debug, PartialEq)]
pub struct PaeMatrix {
    n: usize,
    values: Vec<f64>,
}

impl PaeMatrix {
    /// Accepts only an `n x n`, non-negative matrix.
    pub fn from_rows(n: usize, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.len() != n {
            return Err(SegError::ShapeMismatch {
                evidence: Evidence::Pae,
                expected: n,
                found: format!("{} rows", rows.len()),
            });
        }
        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(SegError::ShapeMismatch {
                    evidence: Evidence::Pae,
                    expected: n,
                    found: format!("{} columns in row {}", row.len(), i + 1),
                });
            }
            for (j, v) in row.into_iter().enumerate() {
                if v.is_nan() || v < 0.0 {
                    return Err(SegError::InvalidScore {
                        evidence: Evidence::Pae,
                        i: i + 1,
                        j: j + 1,
                        value: v,
                    });
                }
                values.push(v);
            }
        }

        Ok(Self { n, values })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Directed error: residue `j` when aligned on residue `i`.
    pub fn raw(&self, i: usize, j: usize) -> f64 {
        self.values[(i - 1) * self.n + (j - 1)]
    }

    /// Mean of both directions, so that `get(i, j) == get(j, i)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        (self.raw(i, j) + self.raw(j, i)) / 2.0
    }
}

/// One hit of the query against a template (homology or structure alignment).
#[derive(Clone, Debug)]
pub struct Hit {
    pub template: String,
    pub score: f64,
    /// Query residues aligned to the template
    pub residues: IntSpan,
}

/// How the scores of corroborating templates combine for one residue pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitAggregation {
    /// Score of every pair before any hit is considered
    pub default_score: f64,
    /// Template count above which the bonus saturates
    pub cutoff: usize,
    /// Credit for each corroborating template
    pub unit: f64,
    /// Saturated credit
    pub bonus: f64,
}

impl HitAggregation {
    pub fn homology() -> Self {
        Self {
            default_score: 20.0,
            cutoff: 10,
            unit: 10.0,
            bonus: 100.0,
        }
    }

    pub fn structure() -> Self {
        Self {
            default_score: 1.0,
            cutoff: 5,
            unit: 1.0,
            bonus: 5.0,
        }
    }

    /// Combined score of `count` templates whose best score is `best`.
    ///
    /// ```
    /// use dpseg::libs::domain::HitAggregation;
    /// let agg = HitAggregation::homology();
    /// assert_eq!(agg.combine(10.0, 0), 20.0);
    /// assert_eq!(agg.combine(95.0, 1), 95.0);
    /// assert_eq!(agg.combine(95.0, 3), 115.0);
    /// assert_eq!(agg.combine(95.0, 10), 185.0);
    /// assert_eq!(agg.combine(95.0, 11), 195.0);
    /// assert_eq!(agg.combine(95.0, 40), 195.0);
    /// ```
    pub fn combine(&self, best: f64, count: usize) -> f64 {
        if count == 0 {
            return self.default_score;
        }
        let aggregate = if count > self.cutoff {
            best + self.bonus
        } else {
            best + count as f64 * self.unit - self.unit
        };
        aggregate.max(self.default_score)
    }
}

/// Combined hit scores of every residue pair the hits co-cover.
///
/// Each template counts once per pair, with its best score over all of its hits.
/// Pairs that no hit covers keep the default score.
pub fn aggregate_hits(
    n: usize,
    hits: &[Hit],
    agg: &HitAggregation,
    evidence: Evidence,
) -> Result<PairTable<f64>> {
    let mut by_template: BTreeMap<&str, Vec<&Hit>> = BTreeMap::new();
    for hit in hits {
        if hit.residues.is_empty() {
            continue;
        }
        if hit.score.is_nan() {
            return Err(SegError::InvalidScore {
                evidence,
                i: hit.residues.min() as usize,
                j: hit.residues.max() as usize,
                value: hit.score,
            });
        }
        for residue in [hit.residues.min(), hit.residues.max()] {
            if residue < 1 || residue as usize > n {
                return Err(SegError::ResidueOutOfRange {
                    evidence,
                    residue: residue as i64,
                    length: n,
                });
            }
        }
        by_template.entry(hit.template.as_str()).or_default().push(hit);
    }

    // templates stamp pairs they already counted; hits run best first, so the first touch
    // carries the template's best score
    let mut best = PairTable::new(n, f64::NEG_INFINITY);
    let mut count = PairTable::new(n, 0usize);
    let mut stamp = PairTable::new(n, 0u32);
    for (idx, (_, mut group)) in by_template.into_iter().enumerate() {
        let id = idx as u32 + 1;
        group.sort_by(|a, b| b.score.total_cmp(&a.score));
        for hit in group {
            let residues = members(&hit.residues);
            for (x, &i) in residues.iter().enumerate() {
                for &j in residues.iter().skip(x + 1) {
                    if stamp.get(i, j) == id {
                        continue;
                    }
                    stamp.set(i, j, id);
                    if hit.score > best.get(i, j) {
                        best.set(i, j, hit.score);
                    }
                    count.set(i, j, count.get(i, j) + 1);
                }
            }
        }
    }

    let mut scores = PairTable::new(n, agg.default_score);
    for i in 1..=n {
        for j in (i + 1)..=n {
            let c = count.get(i, j);
            if c > 0 {
                scores.set(i, j, agg.combine(best.get(i, j), c));
            }
        }
    }

    Ok(scores)
}

/// Everything the aggregator needs for one chain.
#[derive(Clone)]
pub struct EvidenceSet {
    pub length: usize,
    pub disorder: IntSpan,
    pub dist: DistMap,
    pub pae: PaeMatrix,
    pub hh: Vec<Hit>,
    pub dali: Vec<Hit>,
}
