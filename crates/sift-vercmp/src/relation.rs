//! Relational comparators used by versioned dependencies

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Comparison relation attached to a versioned dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Less than (<)
    Less,
    /// Less than or equal (<=)
    LessEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (>=)
    GreaterEqual,
    /// Greater than (>)
    Greater,
}

#[derive(Error, Debug, Clone)]
#[error("Invalid relation: {0}")]
pub struct InvalidRelationError(pub String);

impl Relation {
    /// Parse a relation from its string form
    pub fn parse(s: &str) -> Result<Self, InvalidRelationError> {
        match s {
            "<" => Ok(Relation::Less),
            "<=" => Ok(Relation::LessEqual),
            "=" | "==" => Ok(Relation::Equal),
            ">=" => Ok(Relation::GreaterEqual),
            ">" => Ok(Relation::Greater),
            _ => Err(InvalidRelationError(s.to_string())),
        }
    }

    /// Get the string representation of the relation
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Less => "<",
            Relation::LessEqual => "<=",
            Relation::Equal => "=",
            Relation::GreaterEqual => ">=",
            Relation::Greater => ">",
        }
    }

    /// Whether a comparison outcome (candidate versus reference) satisfies
    /// this relation
    pub fn allows(&self, ordering: Ordering) -> bool {
        match ordering {
            Ordering::Less => matches!(self, Relation::Less | Relation::LessEqual),
            Ordering::Equal => matches!(
                self,
                Relation::LessEqual | Relation::Equal | Relation::GreaterEqual
            ),
            Ordering::Greater => matches!(self, Relation::Greater | Relation::GreaterEqual),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Relation::parse("<").unwrap(), Relation::Less);
        assert_eq!(Relation::parse("<=").unwrap(), Relation::LessEqual);
        assert_eq!(Relation::parse("=").unwrap(), Relation::Equal);
        assert_eq!(Relation::parse("==").unwrap(), Relation::Equal);
        assert_eq!(Relation::parse(">=").unwrap(), Relation::GreaterEqual);
        assert_eq!(Relation::parse(">").unwrap(), Relation::Greater);
        assert!(Relation::parse("~>").is_err());
        assert!(Relation::parse("").is_err());
    }

    #[test]
    fn test_allows() {
        assert!(Relation::Less.allows(Ordering::Less));
        assert!(!Relation::Less.allows(Ordering::Equal));
        assert!(!Relation::Less.allows(Ordering::Greater));

        assert!(Relation::LessEqual.allows(Ordering::Less));
        assert!(Relation::LessEqual.allows(Ordering::Equal));
        assert!(!Relation::LessEqual.allows(Ordering::Greater));

        assert!(!Relation::Equal.allows(Ordering::Less));
        assert!(Relation::Equal.allows(Ordering::Equal));
        assert!(!Relation::Equal.allows(Ordering::Greater));

        assert!(!Relation::GreaterEqual.allows(Ordering::Less));
        assert!(Relation::GreaterEqual.allows(Ordering::Equal));
        assert!(Relation::GreaterEqual.allows(Ordering::Greater));

        assert!(!Relation::Greater.allows(Ordering::Less));
        assert!(!Relation::Greater.allows(Ordering::Equal));
        assert!(Relation::Greater.allows(Ordering::Greater));
    }

    #[test]
    fn test_round_trip() {
        for s in ["<", "<=", "=", ">=", ">"] {
            assert_eq!(Relation::parse(s).unwrap().as_str(), s);
        }
    }
}
