//! Diagnostic categories produced by the classifier

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Diagnostic category of a brain MRI slice.
///
/// The declaration order is the order of the classifier's output logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

impl TumorClass {
    /// All categories in logit order
    pub const ALL: [TumorClass; 4] = [
        TumorClass::Glioma,
        TumorClass::Meningioma,
        TumorClass::NoTumor,
        TumorClass::Pituitary,
    ];

    /// Number of categories (width of the logits vector)
    pub const COUNT: usize = Self::ALL.len();

    /// Category for a logit index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Logit index of this category
    pub fn index(&self) -> usize {
        match self {
            Self::Glioma => 0,
            Self::Meningioma => 1,
            Self::NoTumor => 2,
            Self::Pituitary => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glioma => "glioma",
            Self::Meningioma => "meningioma",
            Self::NoTumor => "no_tumor",
            Self::Pituitary => "pituitary",
        }
    }
}

impl std::fmt::Display for TumorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TumorClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|class| class.as_str() == s)
            .copied()
            .ok_or_else(|| DomainError::validation(format!("Unknown tumor class '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logit_order() {
        let labels: Vec<&str> = TumorClass::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(labels, vec!["glioma", "meningioma", "no_tumor", "pituitary"]);
    }

    #[test]
    fn test_index_round_trip() {
        for (i, class) in TumorClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(TumorClass::from_index(i), Some(*class));
        }
        assert_eq!(TumorClass::from_index(4), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("no_tumor".parse::<TumorClass>().unwrap(), TumorClass::NoTumor);
        assert!("notumor".parse::<TumorClass>().is_err());
        assert!("".parse::<TumorClass>().is_err());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&TumorClass::Pituitary).unwrap(),
            "\"pituitary\""
        );
        let parsed: TumorClass = serde_json::from_str("\"meningioma\"").unwrap();
        assert_eq!(parsed, TumorClass::Meningioma);
    }
}
