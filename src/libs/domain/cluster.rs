use super::prob::{PairStat, ProbMatrix};
use super::segment::Segment;
use super::Params;
use petgraph::unionfind::UnionFind;
use std::collections::BTreeMap;

/// Segments grouped into emerging domains.
///
/// A disjoint-set forest over segment indices; each root owns the union of its segments'
/// residues. Cohesion and similarity are cached per root and dropped whenever a union
/// touches that root.
pub struct Clusters {
    forest: UnionFind<usize>,
    residues: BTreeMap<usize, Vec<usize>>,
    cohesion: BTreeMap<usize, PairStat>,
    similarity: BTreeMap<(usize, usize), PairStat>,
}

impl Clusters {
    /// One singleton cluster per segment.
    pub fn from_segments(segments: &[Segment]) -> Self {
        Self::from_sets(segments.iter().map(|s| s.residues.clone()).collect())
    }

    /// One cluster per non-empty residue set. Sets must be disjoint.
    pub fn from_sets(sets: Vec<Vec<usize>>) -> Self {
        let residues = sets
            .into_iter()
            .filter(|set| !set.is_empty())
            .map(|mut set| {
                set.sort_unstable();
                set
            })
            .enumerate()
            .collect::<BTreeMap<_, _>>();

        Self {
            forest: UnionFind::new(residues.len()),
            residues,
            cohesion: BTreeMap::new(),
            similarity: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Cluster ids ordered by their first residue.
    pub fn order(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.residues.keys().copied().collect();
        ids.sort_by_key(|id| self.residues[id][0]);
        ids
    }

    pub fn residues(&self, id: usize) -> &[usize] {
        &self.residues[&id]
    }

    /// Cluster id of a segment.
    pub fn find(&self, segment: usize) -> usize {
        self.forest.find(segment)
    }

    /// Absorbs cluster `b` into cluster `a`; returns the id of the union.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let (a, b) = (self.forest.find(a), self.forest.find(b));
        if a == b {
            return a;
        }
        self.forest.union(a, b);
        let root = self.forest.find(a);

        let set_a = self.residues.remove(&a).unwrap_or_default();
        let set_b = self.residues.remove(&b).unwrap_or_default();
        let mut merged = Vec::with_capacity(set_a.len() + set_b.len());
        let (mut x, mut y) = (0, 0);
        while x < set_a.len() && y < set_b.len() {
            if set_a[x] <= set_b[y] {
                merged.push(set_a[x]);
                x += 1;
            } else {
                merged.push(set_b[y]);
                y += 1;
            }
        }
        merged.extend_from_slice(&set_a[x..]);
        merged.extend_from_slice(&set_b[y..]);
        self.residues.insert(root, merged);

        self.cohesion.remove(&a);
        self.cohesion.remove(&b);
        self.similarity
            .retain(|&(p, q), _| p != a && p != b && q != a && q != b);

        root
    }

    /// Pairs inside one cluster.
    pub fn cohesion(&mut self, prob: &ProbMatrix, id: usize) -> PairStat {
        if let Some(stat) = self.cohesion.get(&id) {
            return *stat;
        }
        let stat = prob.within(&self.residues[&id]);
        self.cohesion.insert(id, stat);
        stat
    }

    /// Pairs across two clusters.
    pub fn similarity(&mut self, prob: &ProbMatrix, a: usize, b: usize) -> PairStat {
        let key = (a.min(b), a.max(b));
        if let Some(stat) = self.similarity.get(&key) {
            return *stat;
        }
        let stat = prob.cross(&self.residues[&a], &self.residues[&b]);
        self.similarity.insert(key, stat);
        stat
    }

    /// Residue sets ordered by their first residue.
    pub fn into_sets(mut self) -> Vec<Vec<usize>> {
        self.order()
            .into_iter()
            .filter_map(|id| self.residues.remove(&id))
            .collect()
    }
}

/// Greedy merge of clusters whose mean cross probability exceeds `params.merge_prob`.
///
/// Pairs are scanned by first residue. A merged cluster keeps its place in the scan and is
/// compared again with every later cluster, so one pass can chain several merges. Passes
/// repeat until one makes no merge. Returns the number of merges.
pub fn threshold_merge(clusters: &mut Clusters, prob: &ProbMatrix, params: &Params) -> usize {
    let mut total = 0;
    loop {
        let mut merged = 0;
        let mut order = clusters.order();

        let mut a = 0;
        while a < order.len() {
            let mut b = a + 1;
            while b < order.len() {
                let stat = clusters.similarity(prob, order[a], order[b]);
                match stat.mean() {
                    Some(mean) if mean > params.merge_prob => {
                        log::debug!(
                            "threshold merge {} + {}: mean {:.4} over {} pairs",
                            clusters.residues(order[a])[0],
                            clusters.residues(order[b])[0],
                            mean,
                            stat.count
                        );
                        order[a] = clusters.union(order[a], order[b]);
                        order.remove(b);
                        merged += 1;
                        b = a + 1;
                    }
                    _ => b += 1,
                }
            }
            a += 1;
        }

        total += merged;
        if merged == 0 {
            break;
        }
    }
    total
}

/// Iterative convergence merge on cohesion versus similarity.
///
/// Two clusters qualify when either holds no more than `params.small_pairs` internal
/// pairs, or when `similarity * params.tolerance >= min(cohesion)`. Each round merges the
/// qualifying pair with the highest similarity (earliest in scan order on ties), then
/// re-evaluates; rounds stop when nothing qualifies. Returns the number of merges.
pub fn converge_merge(clusters: &mut Clusters, prob: &ProbMatrix, params: &Params) -> usize {
    let mut total = 0;
    loop {
        let order = clusters.order();
        let mut best: Option<(f64, usize, usize, PairStat, PairStat)> = None;

        for (x, &a) in order.iter().enumerate() {
            for &b in order.iter().skip(x + 1) {
                let intra_a = clusters.cohesion(prob, a);
                let intra_b = clusters.cohesion(prob, b);
                let inter = clusters.similarity(prob, a, b);

                if let Some(score) = qualifies(intra_a, intra_b, inter, params) {
                    if best.map_or(true, |(s, ..)| score > s) {
                        best = Some((score, a, b, intra_a, intra_b));
                    }
                }
            }
        }

        match best {
            Some((score, a, b, intra_a, intra_b)) => {
                log::debug!(
                    "converge merge {}",
                    merge_note(
                        clusters.residues(a)[0],
                        clusters.residues(b)[0],
                        score,
                        intra_a,
                        intra_b,
                        params
                    )
                );
                clusters.union(a, b);
                total += 1;
            }
            None => break,
        }
    }
    total
}

/// `first_a + first_b: similarity .., cohesion .. / ..`, tagged when the small-cluster rule
/// forced the merge.
fn merge_note(
    first_a: usize,
    first_b: usize,
    score: f64,
    intra_a: PairStat,
    intra_b: PairStat,
    params: &Params,
) -> String {
    let cohesion = |stat: PairStat| match stat.mean() {
        Some(mean) => format!("{:.4} ({} pairs)", mean, stat.count),
        None => format!("- ({} pairs)", stat.count),
    };
    let forced = intra_a.count <= params.small_pairs || intra_b.count <= params.small_pairs;
    format!(
        "{} + {}: similarity {:.4}, cohesion {} / {}{}",
        first_a,
        first_b,
        score,
        cohesion(intra_a),
        cohesion(intra_b),
        if forced { ", forced by small cluster" } else { "" }
    )
}

/// The ranking score of a qualifying pair, or `None`.
fn qualifies(intra_a: PairStat, intra_b: PairStat, inter: PairStat, params: &Params) -> Option<f64> {
    // too few internal pairs to judge cohesion
    if intra_a.count <= params.small_pairs || intra_b.count <= params.small_pairs {
        return Some(inter.mean().unwrap_or(0.0));
    }

    let inter = inter.mean()?;
    let weaker = intra_a.mean()?.min(intra_b.mean()?);
    if inter * params.tolerance >= weaker {
        Some(inter)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::domain::evidence::PairTable;
    use crate::libs::domain::segment::segment;
    use intspan::IntSpan;

    /// Probabilities from a block assignment: `p_in` inside a block, `p_out` across.
    fn block_matrix(n: usize, blocks: &[(usize, usize)], p_in: f64, p_out: f64) -> ProbMatrix {
        let block_of = |r: usize| blocks.iter().position(|&(lo, hi)| lo <= r && r <= hi);
        let mut table = PairTable::new(n, f64::NAN);
        for i in 1..=n {
            for j in (i + 5)..=n {
                let p = match (block_of(i), block_of(j)) {
                    (Some(x), Some(y)) if x == y => p_in,
                    _ => p_out,
                };
                table.set(i, j, p);
            }
        }
        ProbMatrix::from_table(5, table)
    }

    #[test]
    fn test_union_keeps_sorted_residues() {
        let mut clusters = Clusters::from_sets(vec![vec![1, 2, 3], vec![10, 11, 12], vec![4, 5, 6]]);
        assert_eq!(clusters.order(), vec![0, 2, 1]);

        let root = clusters.union(1, 2);
        assert_eq!(clusters.residues(root), &[4, 5, 6, 10, 11, 12]);
        assert_eq!(clusters.find(1), clusters.find(2));
        assert_eq!(clusters.len(), 2);

        assert_eq!(clusters.union(2, 1), root);
        assert_eq!(
            clusters.into_sets(),
            vec![vec![1, 2, 3], vec![4, 5, 6, 10, 11, 12]]
        );
    }

    #[test]
    fn test_caches_invalidated_by_union() {
        let prob = block_matrix(30, &[(1, 30)], 0.9, 0.1);
        let mut clusters = Clusters::from_sets(vec![(1..=10).collect(), (11..=20).collect(), (21..=30).collect()]);
        let before = clusters.cohesion(&prob, 0);
        let cross = clusters.similarity(&prob, 0, 2);
        let root = clusters.union(0, 1);
        let after = clusters.cohesion(&prob, root);
        assert!(after.count > before.count);
        assert!(clusters.similarity(&prob, root, 2).count > cross.count);
    }

    #[test]
    fn test_threshold_merge_blocks() {
        let prob = block_matrix(100, &[(1, 50), (51, 100)], 0.9, 0.2);
        let segments = segment(100, &IntSpan::new(), 5, 3);
        let mut clusters = Clusters::from_segments(&segments);
        let merges = threshold_merge(&mut clusters, &prob, &Params::default());

        assert_eq!(merges, 18);
        let sets = clusters.into_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], (1..=50).collect::<Vec<_>>());
        assert_eq!(sets[1], (51..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_threshold_is_strict() {
        let prob = block_matrix(40, &[(1, 40)], 0.5, 0.5);
        let segments = segment(40, &IntSpan::new(), 5, 3);
        let params = Params {
            merge_prob: 0.5,
            ..Default::default()
        };
        let mut clusters = Clusters::from_segments(&segments);
        assert_eq!(threshold_merge(&mut clusters, &prob, &params), 0);
        assert_eq!(clusters.len(), 8);
    }

    #[test]
    fn test_converge_keeps_distinct_clusters() {
        let prob = block_matrix(100, &[(1, 50), (51, 100)], 0.8, 0.3);
        let mut clusters = Clusters::from_sets(vec![(1..=50).collect(), (51..=100).collect()]);
        assert_eq!(converge_merge(&mut clusters, &prob, &Params::default()), 0);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_converge_within_tolerance() {
        // 0.75 * 1.1 >= 0.8
        let prob = block_matrix(100, &[(1, 50), (51, 100)], 0.8, 0.75);
        let mut clusters = Clusters::from_sets(vec![(1..=50).collect(), (51..=100).collect()]);
        assert_eq!(converge_merge(&mut clusters, &prob, &Params::default()), 1);
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn test_converge_absorbs_small_cluster() {
        // 91-100 has 15 internal pairs, at most 20, and leans towards 46-90
        let mut table = PairTable::new(100, f64::NAN);
        for i in 1..=100 {
            for j in (i + 5)..=100 {
                let p = match (i, j) {
                    (1..=45, 1..=45) | (46..=90, 46..=90) | (91..=100, 91..=100) => 0.9,
                    (46..=90, 91..=100) => 0.5,
                    _ => 0.1,
                };
                table.set(i, j, p);
            }
        }
        let prob = ProbMatrix::from_table(5, table);
        let mut clusters =
            Clusters::from_sets(vec![(1..=45).collect(), (46..=90).collect(), (91..=100).collect()]);
        assert_eq!(converge_merge(&mut clusters, &prob, &Params::default()), 1);

        let sets = clusters.into_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], (1..=45).collect::<Vec<_>>());
        assert_eq!(sets[1], (46..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_merge_note_reports_cohesion() {
        let params = Params::default();
        let stat = |sum: f64, count: usize| PairStat { sum, count };

        let note = merge_note(1, 46, 0.75, stat(80.0, 100), stat(42.5, 50), &params);
        assert_eq!(
            note,
            "1 + 46: similarity 0.7500, cohesion 0.8000 (100 pairs) / 0.8500 (50 pairs)"
        );

        let note = merge_note(46, 91, 0.5, stat(90.0, 100), stat(13.5, 15), &params);
        assert!(note.ends_with("0.9000 (15 pairs), forced by small cluster"));

        let note = merge_note(1, 5, 0.0, stat(0.0, 0), stat(0.0, 0), &params);
        assert!(note.contains("cohesion - (0 pairs) / - (0 pairs), forced"));
    }

    #[test]
    fn test_converge_is_idempotent() {
        let prob = block_matrix(
            150,
            &[(1, 40), (41, 60), (61, 110), (111, 150)],
            0.85,
            0.25,
        );
        let segments = segment(150, &IntSpan::new(), 5, 3);
        let mut clusters = Clusters::from_segments(&segments);

        let mut counts = vec![clusters.len()];
        threshold_merge(&mut clusters, &prob, &Params::default());
        counts.push(clusters.len());
        converge_merge(&mut clusters, &prob, &Params::default());
        counts.push(clusters.len());
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));

        let sets = clusters.into_sets();
        let mut again = Clusters::from_sets(sets.clone());
        assert_eq!(converge_merge(&mut again, &prob, &Params::default()), 0);
        assert_eq!(again.into_sets(), sets);
    }
}
