use intspan::IntSpan;

/// A run of ordered residues from one fixed-width window of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Non-disordered residues, ascending
    pub residues: Vec<usize>,
}

impl Segment {
    pub fn first(&self) -> usize {
        self.residues[0]
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// Cuts residues `1..=length` into windows of `width`, drops disordered residues and keeps
/// the windows that still hold at least `min_ordered` residues.
///
/// ```
/// use dpseg::libs::domain::segment;
/// let disorder = intspan::IntSpan::from_pair(4, 8);
/// let segments = segment(12, &disorder, 5, 3);
/// // 1-5 keeps 1,2,3; 6-10 keeps 9,10 and is dropped; 11-12 has two residues
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].residues, vec![1, 2, 3]);
/// ```
pub fn segment(length: usize, disorder: &IntSpan, width: usize, min_ordered: usize) -> Vec<Segment> {
    let width = width.max(1);
    let mut segments = vec![];

    let mut start = 1;
    while start <= length {
        let end = (start + width - 1).min(length);
        let residues: Vec<usize> = (start..=end)
            .filter(|&r| !disorder.contains(r as i32))
            .collect();
        if !residues.is_empty() && residues.len() >= min_ordered {
            segments.push(Segment { residues });
        }
        start = end + 1;
    }

    segments
}
