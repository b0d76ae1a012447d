use super::Params;
use intspan::IntSpan;
use itertools::Itertools;
use std::fmt;

/// A final domain: a label and its residues as disjoint ranges.
#[derive(Clone)]
pub struct Domain {
    pub label: String,
    pub residues: IntSpan,
}

impl Domain {
    /// Comma-separated 1-based inclusive ranges, e.g. `130-250,260-280`.
    pub fn ranges(&self) -> String {
        self.residues
            .spans()
            .iter()
            .map(|&(lower, upper)| {
                if lower == upper {
                    lower.to_string()
                } else {
                    format!("{}-{}", lower, upper)
                }
            })
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.residues.cardinality() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.label, self.ranges())
    }
}

fn to_intspan(residues: &[usize]) -> IntSpan {
    let mut ints = IntSpan::new();
    let mut iter = residues.iter().peekable();
    while let Some(&lower) = iter.next() {
        let mut upper = lower;
        while let Some(&&next) = iter.peek() {
            if next != upper + 1 {
                break;
            }
            upper = next;
            iter.next();
        }
        ints.merge(&IntSpan::from_pair(lower as i32, upper as i32));
    }
    ints
}

/// Drops empty sets and sets with fewer than `min_size` residues.
pub fn length_filter(sets: Vec<IntSpan>, min_size: usize) -> Vec<IntSpan> {
    sets.into_iter()
        .filter(|s| !s.is_empty() && s.cardinality() as usize >= min_size)
        .collect()
}

/// Closes internal gaps of each set.
///
/// Gaps up to `params.gap_short` residues are always closed. Gaps up to `params.gap_long`
/// are closed unless another set already holds at least `params.gap_claim` of their
/// residues. Rival claims are judged on the sets as they were before any filling.
pub fn fill_gaps(sets: &[IntSpan], params: &Params) -> Vec<IntSpan> {
    sets.iter()
        .enumerate()
        .map(|(idx, set)| {
            let mut filled = set.clone();
            let spans = set.spans();
            for pair in spans.windows(2) {
                let (lower, upper) = (pair[0].1 + 1, pair[1].0 - 1);
                let gap_len = (upper - lower + 1) as usize;
                let gap = IntSpan::from_pair(lower, upper);

                let close = if gap_len <= params.gap_short {
                    true
                } else if gap_len <= params.gap_long {
                    !sets.iter().enumerate().any(|(other, rival)| {
                        other != idx
                            && rival.intersect(&gap).cardinality() as usize >= params.gap_claim
                    })
                } else {
                    false
                };

                if close {
                    filled.merge(&gap);
                }
            }
            filled
        })
        .collect()
}

/// Strips residues claimed by more than one set from all of them.
///
/// A set keeps its place only with at least `params.min_exclusive` residues left and at
/// least `params.min_domain` in total.
pub fn remove_overlaps(sets: &[IntSpan], params: &Params) -> Vec<IntSpan> {
    let mut contested = IntSpan::new();
    for (x, a) in sets.iter().enumerate() {
        for b in sets.iter().skip(x + 1) {
            contested.merge(&a.intersect(b));
        }
    }

    let exclusive: Vec<IntSpan> = sets
        .iter()
        .filter_map(|set| {
            let mut own = set.clone();
            own.subtract(&contested);
            if (own.cardinality() as usize) < params.min_exclusive {
                None
            } else {
                Some(own)
            }
        })
        .collect();

    length_filter(exclusive, params.min_domain)
}

/// Boundary refinement of the converged clusters, then labeling `D1`, `D2`, ... by first
/// residue.
pub fn refine(clusters: Vec<Vec<usize>>, params: &Params) -> Vec<Domain> {
    let sets: Vec<IntSpan> = clusters.iter().map(|c| to_intspan(c)).collect();
    let sets = length_filter(sets, params.min_domain);
    let sets = fill_gaps(&sets, params);
    let mut sets = remove_overlaps(&sets, params);

    sets.sort_by_key(|s| s.min());
    sets.into_iter()
        .enumerate()
        .map(|(idx, residues)| Domain {
            label: format!("D{}", idx + 1),
            residues,
        })
        .collect()
}
