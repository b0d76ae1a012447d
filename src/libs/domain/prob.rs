use super::error::{Evidence, Result, SegError};
use super::evidence::{aggregate_hits, EvidenceSet, PairTable};
use super::table::{ProbTable, TableSet};
use super::Params;
use rayon::prelude::*;

/// Combined same-domain probability of residue pairs.
///
/// Defined for `|i - j| >= min_sep` unless both residues are disordered. Read-only once
/// built; every merge pass shares it.
#[derive(Clone, Debug)]
pub struct ProbMatrix {
    min_sep: usize,
    // NaN marks pairs without a probability
    values: PairTable<f64>,
}

impl ProbMatrix {
    /// Evidence aggregation: the geometric mean of the four looked-up probabilities.
    ///
    /// Homology and structure-alignment scores default to the floor score of their
    /// aggregation before lookup, so no defined pair ever misses a factor.
    pub fn build(evidence: &EvidenceSet, tables: &TableSet, params: &Params) -> Result<Self> {
        let n = evidence.length;
        if evidence.pae.len() != n {
            return Err(SegError::ShapeMismatch {
                evidence: Evidence::Pae,
                expected: n,
                found: format!("{}x{}", evidence.pae.len(), evidence.pae.len()),
            });
        }
        if evidence.dist.len() != n {
            return Err(SegError::ShapeMismatch {
                evidence: Evidence::Distance,
                expected: n,
                found: format!("{}x{}", evidence.dist.len(), evidence.dist.len()),
            });
        }

        let hh = aggregate_hits(n, &evidence.hh, &params.hh, Evidence::Homology)?;
        let dali = aggregate_hits(n, &evidence.dali, &params.dali, Evidence::Structure)?;
        let min_sep = params.min_sep.max(1);

        let rows: Vec<Vec<f64>> = (1..=n)
            .into_par_iter()
            .map(|i| -> Result<Vec<f64>> {
                let mut row = Vec::with_capacity(n - i);
                for j in (i + 1)..=n {
                    if j - i < min_sep
                        || (evidence.disorder.contains(i as i32)
                            && evidence.disorder.contains(j as i32))
                    {
                        row.push(f64::NAN);
                        continue;
                    }

                    let factors = [
                        factor(Evidence::Distance, &tables.dist, evidence.dist.get(i, j), i, j)?,
                        factor(Evidence::Pae, &tables.pae, evidence.pae.get(i, j), i, j)?,
                        factor(Evidence::Homology, &tables.hh, hh.get(i, j), i, j)?,
                        factor(Evidence::Structure, &tables.dali, dali.get(i, j), i, j)?,
                    ];
                    row.push(factors.iter().product::<f64>().powf(0.25));
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            min_sep,
            values: PairTable::from_rows(n, rows),
        })
    }

    /// Wraps precomputed probabilities; `NaN` marks undefined pairs.
    pub fn from_table(min_sep: usize, values: PairTable<f64>) -> Self {
        Self { min_sep, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min_sep(&self) -> usize {
        self.min_sep
    }

    /// `None` for pairs closer than `min_sep` and for disordered pairs.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i == j || i.abs_diff(j) < self.min_sep {
            return None;
        }
        let p = self.values.get(i, j);
        if p.is_nan() {
            None
        } else {
            Some(p)
        }
    }

    /// Every defined pair `(i, j, p)` with `i < j`, row by row.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.len();
        (1..=n).flat_map(move |i| {
            ((i + 1)..=n).filter_map(move |j| self.get(i, j).map(|p| (i, j, p)))
        })
    }

    /// Pairs between two disjoint residue sets.
    pub fn cross(&self, a: &[usize], b: &[usize]) -> PairStat {
        let mut stat = PairStat::default();
        for &i in a {
            for &j in b {
                if let Some(p) = self.get(i, j) {
                    stat.add(p);
                }
            }
        }
        stat
    }

    /// Pairs inside one residue set.
    pub fn within(&self, a: &[usize]) -> PairStat {
        let mut stat = PairStat::default();
        for (x, &i) in a.iter().enumerate() {
            for &j in a.iter().skip(x + 1) {
                if let Some(p) = self.get(i, j) {
                    stat.add(p);
                }
            }
        }
        stat
    }
}

fn factor(evidence: Evidence, table: &ProbTable, raw: f64, i: usize, j: usize) -> Result<f64> {
    if raw.is_nan() || (raw < 0.0 && matches!(evidence, Evidence::Distance | Evidence::Pae)) {
        return Err(SegError::InvalidScore {
            evidence,
            i,
            j,
            value: raw,
        });
    }
    let prob = table.lookup(raw);
    if !(0.0..=1.0).contains(&prob) {
        return Err(SegError::ProbOutOfRange {
            evidence,
            i,
            j,
            prob,
        });
    }
    Ok(prob)
}

/// Running sum and count of pair probabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairStat {
    pub sum: f64,
    pub count: usize,
}

impl PairStat {
    pub fn add(&mut self, p: f64) {
        self.sum += p;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}
