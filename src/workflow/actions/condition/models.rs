use serde::{Deserialize, Serialize};

/// Comparison operator of a condition node
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
pub enum ComparisonOperator {
    #[default]
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Eq,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    Ne,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "contains")]
    #[strum(serialize = "contains")]
    Contains,
}

impl ComparisonOperator {
    /// Compare two resolved operands. `>` and `<` are numeric and false
    /// whenever either side is not a number.
    pub fn evaluate(
        &self,
        left: &str,
        right: &str,
    ) -> bool {
        match self {
            ComparisonOperator::Eq => left == right,
            ComparisonOperator::Ne => left != right,
            ComparisonOperator::Gt => numbers(left, right).is_some_and(|(l, r)| l > r),
            ComparisonOperator::Lt => numbers(left, right).is_some_and(|(l, r)| l < r),
            ComparisonOperator::Contains => left.contains(right),
        }
    }
}

fn numbers(
    left: &str,
    right: &str,
) -> Option<(f64, f64)> {
    let l = left.trim().parse::<f64>().ok()?;
    let r = right.trim().parse::<f64>().ok()?;
    Some((l, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        assert!(ComparisonOperator::Eq.evaluate("a", "a"));
        assert!(ComparisonOperator::Ne.evaluate("a", "b"));
        assert!(ComparisonOperator::Gt.evaluate("85", "70"));
        assert!(!ComparisonOperator::Gt.evaluate("70", "85"));
        assert!(ComparisonOperator::Lt.evaluate("2.5", " 10 "));
        assert!(ComparisonOperator::Contains.evaluate("hello world", "world"));
    }

    #[test]
    fn test_non_numbers_compare_false() {
        assert!(!ComparisonOperator::Gt.evaluate("abc", "1"));
        assert!(!ComparisonOperator::Lt.evaluate("abc", "1"));
        assert!(!ComparisonOperator::Lt.evaluate("1", ""));
    }

    #[test]
    fn test_parse_operator() {
        assert_eq!(">".parse::<ComparisonOperator>().unwrap(), ComparisonOperator::Gt);
        assert_eq!(serde_json::from_str::<ComparisonOperator>("\"contains\"").unwrap(), ComparisonOperator::Contains);
        assert!("~".parse::<ComparisonOperator>().is_err());
    }
}
