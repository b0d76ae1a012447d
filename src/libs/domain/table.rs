use super::error::{Evidence, Result, SegError};
use std::io::BufRead;

/// How a raw value is matched against the bounds of a [`ProbTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// First step with `value <= bound`; bounds ascend (distances, errors)
    AtMost,
    /// First step with `value >= bound`; bounds descend (hit scores)
    AtLeast,
}

/// An ordered threshold-to-probability step table.
///
/// There is no interpolation: a value takes the probability of the first step whose bound
/// it satisfies, or the floor when it satisfies none. Tables are checked on construction,
/// so probabilities never decrease as the evidence gets stronger.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbTable {
    kind: String,
    direction: Direction,
    steps: Vec<(f64, f64)>,
    floor: f64,
}

impl ProbTable {
    /// Creates a table from `(bound, prob)` steps, strongest evidence first.
    pub fn new(
        kind: &str,
        direction: Direction,
        steps: Vec<(f64, f64)>,
        floor: f64,
    ) -> Result<Self> {
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);

        if !in_unit(floor) {
            return Err(SegError::table(kind, format!("floor {} outside [0, 1]", floor)));
        }
        for (idx, &(bound, prob)) in steps.iter().enumerate() {
            if bound.is_nan() {
                return Err(SegError::table(kind, format!("step {} has a NaN bound", idx + 1)));
            }
            if !in_unit(prob) {
                return Err(SegError::table(
                    kind,
                    format!("step {} probability {} outside [0, 1]", idx + 1, prob),
                ));
            }
        }
        for (idx, pair) in steps.windows(2).enumerate() {
            let ((b1, p1), (b2, p2)) = (pair[0], pair[1]);
            let ordered = match direction {
                Direction::AtMost => b1 < b2,
                Direction::AtLeast => b1 > b2,
            };
            if !ordered {
                return Err(SegError::table(
                    kind,
                    format!("bounds {} and {} are out of order", b1, b2),
                ));
            }
            if p2 > p1 {
                return Err(SegError::table(
                    kind,
                    format!("probability rises from {} to {} at step {}", p1, p2, idx + 2),
                ));
            }
        }
        if let Some(&(_, last)) = steps.last() {
            if floor > last {
                return Err(SegError::table(
                    kind,
                    format!("floor {} exceeds the weakest step {}", floor, last),
                ));
            }
        }

        Ok(Self {
            kind: kind.to_string(),
            direction,
            steps,
            floor,
        })
    }

    /// Pairwise distance in Å; closer is likelier the same domain.
    pub fn distance() -> Self {
        Self {
            kind: "dist".to_string(),
            direction: Direction::AtMost,
            steps: vec![
                (3.0, 0.95),
                (6.0, 0.94),
                (8.0, 0.88),
                (10.0, 0.84),
                (12.0, 0.79),
                (14.0, 0.74),
                (16.0, 0.69),
                (18.0, 0.64),
                (20.0, 0.59),
                (25.0, 0.49),
                (30.0, 0.39),
                (40.0, 0.29),
                (50.0, 0.19),
            ],
            floor: 0.10,
        }
    }

    /// Predicted aligned error in Å.
    pub fn pae() -> Self {
        Self {
            kind: "pae".to_string(),
            direction: Direction::AtMost,
            steps: vec![
                (1.0, 0.97),
                (2.0, 0.89),
                (3.0, 0.77),
                (4.0, 0.67),
                (6.0, 0.61),
                (8.0, 0.52),
                (10.0, 0.44),
                (12.0, 0.38),
                (14.0, 0.34),
                (16.0, 0.29),
                (18.0, 0.26),
                (20.0, 0.23),
                (22.0, 0.21),
                (24.0, 0.20),
                (26.0, 0.19),
                (28.0, 0.18),
            ],
            floor: 0.11,
        }
    }

    /// Aggregated homology (HHsearch-like) probability score.
    pub fn homology() -> Self {
        Self {
            kind: "hh".to_string(),
            direction: Direction::AtLeast,
            steps: vec![
                (180.0, 0.98),
                (160.0, 0.96),
                (140.0, 0.93),
                (120.0, 0.89),
                (110.0, 0.85),
                (100.0, 0.81),
                (90.0, 0.77),
                (80.0, 0.72),
                (70.0, 0.66),
                (60.0, 0.59),
                (50.0, 0.52),
                (40.0, 0.46),
                (30.0, 0.40),
            ],
            floor: 0.35,
        }
    }

    /// Aggregated structure-alignment (Dali-like) z-score.
    pub fn structure() -> Self {
        Self {
            kind: "dali".to_string(),
            direction: Direction::AtLeast,
            steps: vec![
                (35.0, 0.98),
                (30.0, 0.96),
                (25.0, 0.93),
                (20.0, 0.89),
                (18.0, 0.85),
                (16.0, 0.81),
                (14.0, 0.77),
                (12.0, 0.72),
                (10.0, 0.66),
                (8.0, 0.59),
                (6.0, 0.52),
                (4.0, 0.46),
                (2.0, 0.40),
            ],
            floor: 0.35,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn steps(&self) -> &[(f64, f64)] {
        &self.steps
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Probability of the first step satisfied by `value`.
    ///
    /// ```
    /// use dpseg::libs::domain::ProbTable;
    /// let table = ProbTable::pae();
    /// assert_eq!(table.lookup(0.4), 0.97);
    /// assert_eq!(table.lookup(2.0), 0.89);
    /// assert_eq!(table.lookup(2.01), 0.77);
    /// assert_eq!(table.lookup(31.75), 0.11);
    /// ```
    pub fn lookup(&self, value: f64) -> f64 {
        let hit = match self.direction {
            Direction::AtMost => self.steps.iter().find(|(bound, _)| value <= *bound),
            Direction::AtLeast => self.steps.iter().find(|(bound, _)| value >= *bound),
        };
        hit.map_or(self.floor, |&(_, prob)| prob)
    }

    /// Lines of `kind<TAB>bound<TAB>prob`, floor last with a `*` bound.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .steps
            .iter()
            .map(|(bound, prob)| format!("{}\t{}\t{}", self.kind, bound, prob))
            .collect();
        lines.push(format!("{}\t*\t{}", self.kind, self.floor));
        lines
    }
}

/// The four calibrations consumed by the evidence aggregator.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSet {
    pub dist: ProbTable,
    pub pae: ProbTable,
    pub hh: ProbTable,
    pub dali: ProbTable,
}

impl Default for TableSet {
    fn default() -> Self {
        Self {
            dist: ProbTable::distance(),
            pae: ProbTable::pae(),
            hh: ProbTable::homology(),
            dali: ProbTable::structure(),
        }
    }
}

impl TableSet {
    /// Replaces the built-in tables with the kinds present in a table file.
    ///
    /// Each line is `kind<TAB>bound<TAB>prob`; a `*` bound sets the floor. Steps keep file
    /// order. A kind that appears without a floor line keeps the built-in floor.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = TableSet::default();
        let mut seen: Vec<(String, Vec<(f64, f64)>, Option<f64>)> = vec![];

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SegError::io(Evidence::Table, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(SegError::malformed(
                    Evidence::Table,
                    idx + 1,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            }
            if set.get(fields[0]).is_none() {
                return Err(SegError::malformed(
                    Evidence::Table,
                    idx + 1,
                    format!("unknown table kind '{}'", fields[0]),
                ));
            }
            let prob: f64 = fields[2].parse().map_err(|_| {
                SegError::malformed(Evidence::Table, idx + 1, "probability is not a number")
            })?;

            let pos = match seen.iter().position(|(kind, _, _)| kind == fields[0]) {
                Some(pos) => pos,
                None => {
                    seen.push((fields[0].to_string(), vec![], None));
                    seen.len() - 1
                }
            };
            if fields[1] == "*" {
                seen[pos].2 = Some(prob);
            } else {
                let bound: f64 = fields[1].parse().map_err(|_| {
                    SegError::malformed(Evidence::Table, idx + 1, "bound is not a number")
                })?;
                seen[pos].1.push((bound, prob));
            }
        }

        for (kind, steps, floor) in seen {
            // `get` succeeded for every kind collected above
            if let Some(table) = set.get_mut(&kind) {
                let floor = floor.unwrap_or(table.floor);
                *table = ProbTable::new(&kind, table.direction, steps, floor)?;
            }
        }

        Ok(set)
    }

    pub fn get(&self, kind: &str) -> Option<&ProbTable> {
        match kind {
            "dist" => Some(&self.dist),
            "pae" => Some(&self.pae),
            "hh" => Some(&self.hh),
            "dali" => Some(&self.dali),
            _ => None,
        }
    }

    fn get_mut(&mut self, kind: &str) -> Option<&mut ProbTable> {
        match kind {
            "dist" => Some(&mut self.dist),
            "pae" => Some(&mut self.pae),
            "hh" => Some(&mut self.hh),
            "dali" => Some(&mut self.dali),
            _ => None,
        }
    }

    pub fn to_lines(&self) -> Vec<String> {
        [&self.dist, &self.pae, &self.hh, &self.dali]
            .iter()
            .flat_map(|t| t.to_lines())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(table: &ProbTable, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| table.lookup(v)).collect()
    }

    #[test]
    fn test_builtin_tables_are_valid() {
        for table in [
            ProbTable::distance(),
            ProbTable::pae(),
            ProbTable::homology(),
            ProbTable::structure(),
        ] {
            let rebuilt = ProbTable::new(
                table.kind(),
                table.direction(),
                table.steps().to_vec(),
                table.floor(),
            )
            .unwrap();
            assert_eq!(rebuilt, table);
        }
    }

    #[test]
    fn test_distance_and_pae_fall_with_value() {
        let values: Vec<f64> = (0..=120).map(|x| x as f64 * 0.5).collect();
        for table in [ProbTable::distance(), ProbTable::pae()] {
            let probs = probe(&table, &values);
            assert!(probs.windows(2).all(|w| w[1] <= w[0]), "{}", table.kind());
        }
    }

    #[test]
    fn test_hit_scores_rise_with_value() {
        let values: Vec<f64> = (0..=400).map(|x| x as f64 * 0.5).collect();
        for table in [ProbTable::homology(), ProbTable::structure()] {
            let probs = probe(&table, &values);
            assert!(probs.windows(2).all(|w| w[1] >= w[0]), "{}", table.kind());
        }
    }

    #[test]
    fn test_exact_bounds() {
        let dist = ProbTable::distance();
        assert_eq!(dist.lookup(3.0), 0.95);
        assert_eq!(dist.lookup(3.0001), 0.94);
        assert_eq!(dist.lookup(f64::INFINITY), 0.10);

        let hh = ProbTable::homology();
        assert_eq!(hh.lookup(180.0), 0.98);
        assert_eq!(hh.lookup(179.9), 0.96);
        assert_eq!(hh.lookup(20.0), 0.35);
    }

    #[test]
    fn test_rejects_bad_tables() {
        // bounds out of order
        assert!(ProbTable::new("pae", Direction::AtMost, vec![(2.0, 0.9), (1.0, 0.8)], 0.1).is_err());
        // probability rising with weaker evidence
        assert!(ProbTable::new("hh", Direction::AtLeast, vec![(50.0, 0.5), (10.0, 0.8)], 0.1).is_err());
        // not a probability
        assert!(ProbTable::new("dist", Direction::AtMost, vec![(5.0, 1.5)], 0.1).is_err());
        assert!(ProbTable::new("dist", Direction::AtMost, vec![(5.0, 0.5)], -0.1).is_err());
        // floor above the weakest step
        assert!(ProbTable::new("dist", Direction::AtMost, vec![(5.0, 0.5)], 0.6).is_err());
    }

    #[test]
    fn test_table_file() {
        let text = "# recalibrated PAE\npae\t2\t0.9\npae\t10\t0.5\npae\t*\t0.05\n";
        let set = TableSet::from_reader(text.as_bytes()).unwrap();
        assert_eq!(set.pae.steps(), &[(2.0, 0.9), (10.0, 0.5)]);
        assert_eq!(set.pae.floor(), 0.05);
        assert_eq!(set.pae.lookup(11.0), 0.05);
        assert_eq!(set.dist, ProbTable::distance());

        let err = TableSet::from_reader("foo\t1\t0.5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SegError::Malformed { line: 1, .. }));

        let err = TableSet::from_reader("dali\t1\t0.5\ndali\t3\t0.6\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SegError::InvalidTable { .. }));
    }

    #[test]
    fn test_to_lines_reloads() {
        let set = TableSet::default();
        let text = set.to_lines().join("\n");
        assert_eq!(TableSet::from_reader(text.as_bytes()).unwrap(), set);
    }
}
