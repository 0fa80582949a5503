//! Predecessor expression parser and formatter.
//!
//! Converts between compact, comma-separated dependency expressions and
//! [`Dependency`] records.
//!
//! # Grammar
//!
//! ```text
//! list  := entry (',' entry)*
//! entry := ref type? (('+' | '-') integer 'd'?)?
//! type  := 'FS' | 'SS' | 'FF' | 'SF'        (case-insensitive, default FS)
//! ref   := [A-Za-z0-9_.]+
//! ```
//!
//! A trailing type mnemonic is split off the reference only when something
//! remains in front of it, so `"AFS"` is task `A` with type FS while `"SS"`
//! is task `SS`. Parsing is purely syntactic: references are not checked
//! against existing tasks.
//!
//! # Examples
//!
//! ```
//! use u_wbs::predecessor::{format_predecessors, parse_predecessors};
//! use u_wbs::models::DependencyType;
//!
//! let deps = parse_predecessors("3FS+2,5SS-1,7").unwrap();
//! assert_eq!(deps[1].dep_type, DependencyType::SS);
//! assert_eq!(deps[1].lag_days, -1);
//! assert_eq!(format_predecessors(&deps), "3+2,5SS-1,7");
//! ```

use thiserror::Error;

use crate::models::{Dependency, DependencyType, MAX_SPAN_DAYS};

/// Why an entry failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Nothing between two commas.
    EmptyEntry,
    /// Missing reference or a reference with characters outside `[A-Za-z0-9_.]`.
    InvalidReference(String),
    /// Lag sign not followed by an integer, or a lag beyond
    /// [`MAX_SPAN_DAYS`] days.
    InvalidLag(String),
}

/// A malformed predecessor expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("entry {} (`{entry}`): {}", .index + 1, describe(.kind))]
pub struct PredecessorParseError {
    /// Zero-based position of the entry in the list.
    pub index: usize,
    /// Offending entry text (trimmed).
    pub entry: String,
    pub kind: ParseErrorKind,
}

fn describe(kind: &ParseErrorKind) -> String {
    match kind {
        ParseErrorKind::EmptyEntry => "empty entry".to_string(),
        ParseErrorKind::InvalidReference(r) => format!("invalid task reference `{r}`"),
        ParseErrorKind::InvalidLag(l) => format!("invalid lag `{l}`"),
    }
}

/// Parses a predecessor expression.
///
/// An empty or whitespace-only expression yields an empty list.
pub fn parse_predecessors(expr: &str) -> Result<Vec<Dependency>, PredecessorParseError> {
    if expr.trim().is_empty() {
        return Ok(Vec::new());
    }

    expr.split(',')
        .enumerate()
        .map(|(index, raw)| {
            parse_entry(raw.trim()).map_err(|kind| PredecessorParseError {
                index,
                entry: raw.trim().to_string(),
                kind,
            })
        })
        .collect()
}

fn parse_entry(entry: &str) -> Result<Dependency, ParseErrorKind> {
    if entry.is_empty() {
        return Err(ParseErrorKind::EmptyEntry);
    }

    // Lag: everything from the last sign on.
    let (head, lag_days) = match entry.rfind(['+', '-']) {
        Some(pos) => (&entry[..pos], parse_lag(&entry[pos..])?),
        None => (entry, 0),
    };
    let head = head.trim_end();

    let (reference, dep_type) = split_type(head);
    if reference.is_empty() || !reference.chars().all(is_ref_char) {
        return Err(ParseErrorKind::InvalidReference(reference.to_string()));
    }

    Ok(Dependency::new(reference)
        .with_type(dep_type)
        .with_lag(lag_days))
}

fn parse_lag(signed: &str) -> Result<i64, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidLag(signed.to_string());
    let (sign, rest) = signed.split_at(1);
    let digits = rest.trim();
    let digits = digits
        .strip_suffix(['d', 'D'])
        .unwrap_or(digits)
        .trim_end();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let magnitude: i64 = digits.parse().map_err(|_| invalid())?;
    if magnitude > MAX_SPAN_DAYS {
        return Err(invalid());
    }
    Ok(if sign == "-" { -magnitude } else { magnitude })
}

/// Splits a trailing type mnemonic off the reference, if one is present
/// and leaves a non-empty reference.
fn split_type(head: &str) -> (&str, DependencyType) {
    if head.len() > 2 && head.is_char_boundary(head.len() - 2) {
        let (reference, suffix) = head.split_at(head.len() - 2);
        if let Ok(dep_type) = suffix.parse::<DependencyType>() {
            return (reference.trim_end(), dep_type);
        }
    }
    (head, DependencyType::FS)
}

fn is_ref_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether the reference itself ends in something that reads as a type.
fn ends_with_mnemonic(reference: &str) -> bool {
    reference.len() > 2
        && reference.is_char_boundary(reference.len() - 2)
        && reference[reference.len() - 2..]
            .parse::<DependencyType>()
            .is_ok()
}

/// Formats dependencies as a compact expression.
///
/// Omits the default type and zero lags. The type is written out whenever
/// the reference would otherwise be misread on parsing.
pub fn format_predecessors(deps: &[Dependency]) -> String {
    deps.iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join(",")
}

fn format_entry(dep: &Dependency) -> String {
    let mut out = dep.predecessor_id.clone();
    if dep.dep_type != DependencyType::FS || ends_with_mnemonic(&dep.predecessor_id) {
        out.push_str(dep.dep_type.as_str());
    }
    if dep.lag_days != 0 {
        out.push_str(&format!("{:+}", dep.lag_days));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: &str, t: DependencyType, lag: i64) -> Dependency {
        Dependency::new(id).with_type(t).with_lag(lag)
    }

    #[test]
    fn test_parse_reference_example() {
        let deps = parse_predecessors("3FS+2,5SS-1,7").unwrap();
        assert_eq!(
            deps,
            vec![
                dep("3", DependencyType::FS, 2),
                dep("5", DependencyType::SS, -1),
                dep("7", DependencyType::FS, 0),
            ]
        );
    }

    #[test]
    fn test_parse_alphanumeric_refs() {
        let deps = parse_predecessors("AFS, AFS+2, task_9ff").unwrap();
        assert_eq!(deps[0], dep("A", DependencyType::FS, 0));
        assert_eq!(deps[1], dep("A", DependencyType::FS, 2));
        assert_eq!(deps[2], dep("task_9", DependencyType::FF, 0));
    }

    #[test]
    fn test_parse_bare_mnemonic_is_a_reference() {
        let deps = parse_predecessors("SS").unwrap();
        assert_eq!(deps, vec![dep("SS", DependencyType::FS, 0)]);
    }

    #[test]
    fn test_parse_whitespace_and_day_suffix() {
        let deps = parse_predecessors(" 4 sf - 3d ,  2.1 + 1 ").unwrap();
        assert_eq!(deps[0], dep("4", DependencyType::SF, -3));
        assert_eq!(deps[1], dep("2.1", DependencyType::FS, 1));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_predecessors("").unwrap().is_empty());
        assert!(parse_predecessors("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_predecessors("3,,5").unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.kind, ParseErrorKind::EmptyEntry);

        let err = parse_predecessors("3FS+").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLag(_)));

        let err = parse_predecessors("3FS+x").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLag(_)));

        let err = parse_predecessors("+2").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidReference(_)));

        let err = parse_predecessors("a b").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidReference(_)));
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_parse_lag_bounds() {
        let deps = parse_predecessors("A+100000,B-100000").unwrap();
        assert_eq!(deps[0].lag_days, MAX_SPAN_DAYS);
        assert_eq!(deps[1].lag_days, -MAX_SPAN_DAYS);

        let err = parse_predecessors("A,B+200000000").unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.kind, ParseErrorKind::InvalidLag("+200000000".into()));
    }

    #[test]
    fn test_format_compact() {
        let deps = vec![
            dep("3", DependencyType::FS, 0),
            dep("5", DependencyType::SS, -1),
            dep("7", DependencyType::FF, 4),
        ];
        assert_eq!(format_predecessors(&deps), "3,5SS-1,7FF+4");
        assert_eq!(format_predecessors(&[]), "");
    }

    #[test]
    fn test_format_disambiguates_mnemonic_suffix() {
        let deps = vec![dep("CLASS", DependencyType::FS, 0)];
        let text = format_predecessors(&deps);
        assert_eq!(text, "CLASSFS");
        assert_eq!(parse_predecessors(&text).unwrap(), deps);
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            "3FS+2,5SS-1,7",
            "AFS",
            "AFS+2",
            "x.1ff-10, y_2SF, 42 + 3d",
            "CLASS,CLASSSS-2,SS",
            "",
        ];
        for s in samples {
            let parsed = parse_predecessors(s).unwrap();
            let again = parse_predecessors(&format_predecessors(&parsed)).unwrap();
            assert_eq!(again, parsed, "round trip of {s:?}");
        }
    }
}
