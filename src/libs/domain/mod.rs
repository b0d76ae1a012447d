//! Domain segmentation of a folded chain.
//!
//! Four lines of evidence (distance, predicted aligned error, homology hits,
//! structure-alignment hits) are fused into one probability per residue pair. Residues
//! are then chunked, merged greedily, merged to convergence, and refined into domains.

pub mod cluster;
pub mod error;
pub mod evidence;
pub mod prob;
pub mod reader;
pub mod refine;
pub mod segment;
pub mod table;

pub use cluster::{converge_merge, threshold_merge, Clusters};
pub use error::{Evidence, Result, SegError};
pub use evidence::{aggregate_hits, DistMap, EvidenceSet, Hit, HitAggregation, PaeMatrix, PairTable};
pub use prob::{PairStat, ProbMatrix};
pub use refine::{refine, Domain};
pub use segment::{segment, Segment};
pub use table::{Direction, ProbTable, TableSet};

/// Tunables of the segmentation engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// Pairs closer than this along the chain get no probability
    pub min_sep: usize,
    /// Nominal segment width
    pub seg_width: usize,
    /// Ordered residues a segment needs to exist
    pub seg_min: usize,
    /// Mean cross probability a greedy merge must exceed
    pub merge_prob: f64,
    /// Clusters with at most this many internal pairs are merged unconditionally
    pub small_pairs: usize,
    /// Similarity multiplier against the weaker cohesion
    pub tolerance: f64,
    /// Minimum residues of a domain
    pub min_domain: usize,
    /// Gaps this short are always filled
    pub gap_short: usize,
    /// Gaps this short are filled when no rival claims them
    pub gap_long: usize,
    /// Residues of a gap a rival domain must hold to claim it
    pub gap_claim: usize,
    /// Residues a domain must keep after overlap removal
    pub min_exclusive: usize,
    pub hh: HitAggregation,
    pub dali: HitAggregation,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_sep: 5,
            seg_width: 5,
            seg_min: 3,
            merge_prob: 0.64,
            small_pairs: 20,
            tolerance: 1.1,
            min_domain: 25,
            gap_short: 10,
            gap_long: 20,
            gap_claim: 10,
            min_exclusive: 10,
            hh: HitAggregation::homology(),
            dali: HitAggregation::structure(),
        }
    }
}

/// Segments on an already built probability matrix.
pub fn segment_domains(length: usize, disorder: &intspan::IntSpan, prob: &ProbMatrix, params: &Params) -> Vec<Domain> {
    let segments = segment(length, disorder, params.seg_width, params.seg_min);
    log::info!("{} segments from {} residues", segments.len(), length);

    let mut clusters = Clusters::from_segments(&segments);
    let merges = threshold_merge(&mut clusters, prob, params);
    log::info!("threshold merge: {} merges, {} clusters", merges, clusters.len());

    let merges = converge_merge(&mut clusters, prob, params);
    log::info!("convergence merge: {} merges, {} clusters", merges, clusters.len());

    let domains = refine(clusters.into_sets(), params);
    log::info!("{} domains after refinement", domains.len());
    domains
}

/// Full pipeline: builds the probability matrix, then segments.
///
/// An empty list is a valid outcome (short or mostly disordered chains).
pub fn parse_domains(evidence: &EvidenceSet, tables: &TableSet, params: &Params) -> Result<Vec<Domain>> {
    let prob = ProbMatrix::build(evidence, tables, params)?;
    log::info!("probability matrix over {} residues", prob.len());

    Ok(segment_domains(evidence.length, &evidence.disorder, &prob, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use intspan::IntSpan;

    fn ranges(domains: &[Domain]) -> Vec<String> {
        domains.iter().map(|d| d.ranges()).collect()
    }

    /// Residues laid out along a line, `spacing` Å apart, with blocks moved far away.
    fn evidence(n: usize, blocks: &[(usize, usize)], disorder: IntSpan) -> EvidenceSet {
        let block_of = |r: usize| blocks.iter().position(|&(lo, hi)| lo <= r && r <= hi);

        let mut dist = DistMap::new(n, f64::INFINITY);
        let mut pae = vec![vec![0.0; n]; n];
        for i in 1..=n {
            for j in 1..=n {
                let same = matches!((block_of(i), block_of(j)), (Some(x), Some(y)) if x == y);
                pae[i - 1][j - 1] = if i == j {
                    0.0
                } else if same {
                    1.5
                } else {
                    30.0
                };
                if i < j {
                    dist.set(i, j, if same { 8.0 } else { 60.0 });
                }
            }
        }

        let hh = blocks
            .iter()
            .enumerate()
            .map(|(idx, &(lo, hi))| Hit {
                template: format!("e{}", idx),
                score: 190.0,
                residues: IntSpan::from_pair(lo as i32, hi as i32),
            })
            .collect();
        let dali = blocks
            .iter()
            .enumerate()
            .map(|(idx, &(lo, hi))| Hit {
                template: format!("e{}", idx),
                score: 36.0,
                residues: IntSpan::from_pair(lo as i32, hi as i32),
            })
            .collect();

        EvidenceSet {
            length: n,
            disorder,
            dist,
            pae: PaeMatrix::from_rows(n, pae).unwrap(),
            hh,
            dali,
        }
    }

    #[test]
    fn test_single_compact_domain() {
        let ev = evidence(100, &[(1, 100)], IntSpan::new());
        let domains = parse_domains(&ev, &TableSet::default(), &Params::default()).unwrap();
        assert_eq!(ranges(&domains), vec!["1-100"]);
        assert_eq!(domains[0].label, "D1");
    }

    #[test]
    fn test_two_domains_with_disordered_linker() {
        let ev = evidence(300, &[(1, 140), (161, 300)], IntSpan::from_pair(141, 160));
        let domains = parse_domains(&ev, &TableSet::default(), &Params::default()).unwrap();
        assert_eq!(ranges(&domains), vec!["1-140", "161-300"]);
        assert_eq!(domains[1].label, "D2");
    }

    #[test]
    fn test_short_chain_has_no_domain() {
        let ev = evidence(20, &[(1, 20)], IntSpan::new());
        let domains = parse_domains(&ev, &TableSet::default(), &Params::default()).unwrap();
        assert!(domains.is_empty());
    }

    #[test]
    fn test_fully_disordered_chain() {
        let ev = evidence(80, &[(1, 80)], IntSpan::from_pair(1, 80));
        let domains = parse_domains(&ev, &TableSet::default(), &Params::default()).unwrap();
        assert!(domains.is_empty());
    }

    #[test]
    fn test_shape_error_is_fatal() {
        let mut ev = evidence(60, &[(1, 60)], IntSpan::new());
        ev.length = 61;
        let err = parse_domains(&ev, &TableSet::default(), &Params::default()).unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));
    }
}
