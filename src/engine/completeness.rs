use std::fmt;

/// How much of a day the source delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Empty,
    Partial,
    Complete,
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Completeness::Empty => write!(f, "empty"),
            Completeness::Partial => write!(f, "partial"),
            Completeness::Complete => write!(f, "complete"),
        }
    }
}

/// Classifies a day's point count against the expected daily count.
///
/// Only an exact match is complete. Days with a DST switch have 184 or 200
/// points and therefore classify as partial, which the walker treats the same
/// as complete.
pub fn classify(count: usize, expected: usize) -> Completeness {
    if count == 0 {
        Completeness::Empty
    } else if count == expected {
        Completeness::Complete
    } else {
        Completeness::Partial
    }
}
