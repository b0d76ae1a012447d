use std::fmt;
use thiserror::Error;

/// Which line of evidence (or calibration data) an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    Distance,
    Pae,
    Homology,
    Structure,
    Disorder,
    Table,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Evidence::Distance => "distance",
            Evidence::Pae => "PAE",
            Evidence::Homology => "homology hits",
            Evidence::Structure => "structure-alignment hits",
            Evidence::Disorder => "disorder",
            Evidence::Table => "lookup table",
        };
        write!(f, "{}", name)
    }
}

/// Fatal conditions of domain segmentation.
///
/// Residue positions are 1-based, as in the input files.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegError {
    /// A matrix whose dimension disagrees with the chain length
    #[error("{evidence}: expected a {expected}x{expected} matrix, found {found}")]
    ShapeMismatch {
        evidence: Evidence,
        expected: usize,
        found: String,
    },

    /// A record that could not be parsed
    #[error("{evidence}: malformed record at line {line}: {message}")]
    Malformed {
        evidence: Evidence,
        line: usize,
        message: String,
    },

    /// A residue index outside 1..=N
    #[error("{evidence}: residue {residue} is outside 1..={length}")]
    ResidueOutOfRange {
        evidence: Evidence,
        residue: i64,
        length: usize,
    },

    /// A raw score that no lookup table can accept (NaN, negative error)
    #[error("{evidence}: invalid score {value} for residue pair ({i}, {j})")]
    InvalidScore {
        evidence: Evidence,
        i: usize,
        j: usize,
        value: f64,
    },

    /// A looked-up probability outside [0, 1]
    #[error("{evidence}: probability {prob} outside [0, 1] for residue pair ({i}, {j})")]
    ProbOutOfRange {
        evidence: Evidence,
        i: usize,
        j: usize,
        prob: f64,
    },

    /// Reading an input stream failed
    #[error("{evidence}: read error: {message}")]
    Io { evidence: Evidence, message: String },

    /// A lookup table that is not ordered or not a probability table
    #[error("{evidence} ({kind}): {message}")]
    InvalidTable {
        evidence: Evidence,
        kind: String,
        message: String,
    },
}

impl SegError {
    pub fn malformed(evidence: Evidence, line: usize, message: impl Into<String>) -> Self {
        SegError::Malformed {
            evidence,
            line,
            message: message.into(),
        }
    }

    pub fn io(evidence: Evidence, err: std::io::Error) -> Self {
        SegError::Io {
            evidence,
            message: err.to_string(),
        }
    }

    pub fn table(kind: impl Into<String>, message: impl Into<String>) -> Self {
        SegError::InvalidTable {
            evidence: Evidence::Table,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegError>;
