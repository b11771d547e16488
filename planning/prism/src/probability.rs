//! Resolution of probability terms to numbers.
//!
//! Probabilities may be written as floats (`0.25`), fractions (`1/4`), division terms
//! (`(/ 1 4)`) or be wrapped in other terms. Resolution tries each representation in turn and
//! ends with a textual search for a number.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ProbValue;

static FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").unwrap());
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+(?:[eE]-?\d+)?").unwrap());

/// Returns the probability denoted by the value, or 1.0 (with a warning) if it cannot be determined.
pub fn resolve(value: &ProbValue) -> f64 {
    match try_resolve(value) {
        Some(p) => p,
        None => {
            tracing::warn!("unable to extract a probability from `{value}`, assuming 1.0");
            1.0
        }
    }
}

/// Returns the probability denoted by the value, if it is a finite non-negative number.
pub fn try_resolve(value: &ProbValue) -> Option<f64> {
    structured(value)
        .or_else(|| textual(&value.to_string()))
        .filter(|p| valid(*p))
}

fn valid(p: f64) -> bool {
    p.is_finite() && p >= 0.0
}

fn structured(value: &ProbValue) -> Option<f64> {
    match value {
        ProbValue::Number(x) => Some(*x),
        ProbValue::Text(s) => parse_text(s),
        ProbValue::Ratio(num, denum) => {
            let num = structured(num)?;
            let denum = structured(denum)?;
            (denum != 0.0).then(|| num / denum)
        }
        ProbValue::Compound { fields, .. } => fields.iter().find_map(structured).filter(|p| valid(*p)),
    }
}

/// Parses either a float or a fraction `a/b`.
fn parse_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some((num, denum)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let denum: f64 = denum.trim().parse().ok()?;
        (denum != 0.0).then(|| num / denum)
    } else {
        s.parse().ok()
    }
}

/// Last resort: the first fraction or decimal literal appearing in the text.
fn textual(text: &str) -> Option<f64> {
    if let Some(captures) = FRACTION.captures(text) {
        let num: f64 = captures[1].parse().ok()?;
        let denum: f64 = captures[2].parse().ok()?;
        if denum != 0.0 {
            return Some(num / denum);
        }
    }
    DECIMAL.find(text).and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ProbValue {
        ProbValue::Text(s.to_string())
    }

    #[test]
    fn direct_representations() {
        assert_eq!(resolve(&ProbValue::Number(0.7)), 0.7);
        assert_eq!(resolve(&text("0.25")), 0.25);
        assert_eq!(resolve(&text("1/4")), 0.25);
        let ratio = ProbValue::Ratio(Box::new(ProbValue::Number(1.0)), Box::new(text("4")));
        assert_eq!(resolve(&ratio), 0.25);
    }

    #[test]
    fn wrapped_values() {
        let wrapped = ProbValue::Compound {
            text: "(prob p 0.3)".to_string(),
            fields: vec![text("prob"), text("p"), ProbValue::Number(0.3)],
        };
        assert_eq!(resolve(&wrapped), 0.3);
        let fraction = ProbValue::Compound {
            text: "(weight (3 / 4))".to_string(),
            fields: vec![text("weight"), text("(3 / 4)")],
        };
        assert_eq!(resolve(&fraction), 0.75);
    }

    #[test]
    fn fallback() {
        assert_eq!(try_resolve(&text("p")), None);
        assert_eq!(resolve(&text("p")), 1.0);
        assert_eq!(try_resolve(&ProbValue::Number(-0.5)), None);
        let by_zero = ProbValue::Ratio(Box::new(ProbValue::Number(1.0)), Box::new(ProbValue::Number(0.0)));
        assert_eq!(resolve(&by_zero), 1.0);
    }
}
