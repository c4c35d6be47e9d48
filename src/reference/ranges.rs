// Prefix range expansion
//
// ARRL writes contiguous prefix blocks compactly: "EA6-EH6" is the eight
// prefixes EA6, EB6, ... EH6. Only one character position varies; it is the
// first position where the two sides differ, later positions are taken from
// the start side.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeErrorReason {
    /// Not exactly one '-' with text on both sides
    Malformed,
    /// Start and end have different lengths
    LengthMismatch,
    /// Start and end are identical
    NoVaryingPosition,
    /// End character sorts before the start character
    Descending,
}

/// Range pattern that could not be expanded; `pattern` is the input as given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeError {
    pub pattern: String,
    pub reason: RangeErrorReason,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            RangeErrorReason::Malformed => "expected START-END",
            RangeErrorReason::LengthMismatch => "sides differ in length",
            RangeErrorReason::NoVaryingPosition => "sides are identical",
            RangeErrorReason::Descending => "end sorts before start",
        };
        write!(f, "cannot expand range '{}': {}", self.pattern, reason)
    }
}

impl std::error::Error for RangeError {}

/// True if the string looks like a range pattern rather than a prefix
pub fn is_range_pattern(s: &str) -> bool {
    s.contains('-')
}

/// Expand "START-END" into every prefix of the closed range
pub fn expand_range(pattern: &str) -> Result<Vec<String>, RangeError> {
    let fail = |reason| RangeError {
        pattern: pattern.to_string(),
        reason,
    };

    let mut parts = pattern.split('-');
    let (start, end) = match (parts.next(), parts.next(), parts.next()) {
        (Some(s), Some(e), None) if !s.is_empty() && !e.is_empty() => (s, e),
        _ => return Err(fail(RangeErrorReason::Malformed)),
    };

    let start: Vec<char> = start.chars().collect();
    let end: Vec<char> = end.chars().collect();
    if start.len() != end.len() {
        return Err(fail(RangeErrorReason::LengthMismatch));
    }

    let vary = start
        .iter()
        .zip(end.iter())
        .position(|(s, e)| s != e)
        .ok_or_else(|| fail(RangeErrorReason::NoVaryingPosition))?;

    let (from, to) = (start[vary] as u32, end[vary] as u32);
    if to < from {
        return Err(fail(RangeErrorReason::Descending));
    }

    let expanded = (from..=to)
        .filter_map(char::from_u32)
        .map(|c| {
            let mut chars = start.clone();
            chars[vary] = c;
            chars.into_iter().collect::<String>()
        })
        .collect();
    Ok(expanded)
}

/// Expand a catalog prefix entry
///
/// Plain prefixes come back as a single element. A range that fails to
/// expand is returned literally together with the error so the caller can
/// keep it and flag it.
pub fn expand_entry(entry: &str) -> (Vec<String>, Option<RangeError>) {
    if !is_range_pattern(entry) {
        return (vec![entry.to_string()], None);
    }
    match expand_range(entry) {
        Ok(prefixes) => (prefixes, None),
        Err(e) => (vec![entry.to_string()], Some(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_middle_character() {
        let expanded = expand_range("EA6-EH6").unwrap();
        assert_eq!(
            expanded,
            vec!["EA6", "EB6", "EC6", "ED6", "EE6", "EF6", "EG6", "EH6"]
        );
    }

    #[test]
    fn test_expand_two_letter_block() {
        assert_eq!(expand_range("VA-VG").unwrap().len(), 7);
        assert_eq!(expand_range("2A-2Z").unwrap().first().map(String::as_str), Some("2A"));
    }

    #[test]
    fn test_only_first_difference_varies() {
        // Positions after the varying one come from the start side
        assert_eq!(expand_range("KA1-KC9").unwrap(), vec!["KA1", "KB1", "KC1"]);
    }

    #[test]
    fn test_digit_range() {
        assert_eq!(expand_range("R1-R3").unwrap(), vec!["R1", "R2", "R3"]);
    }

    #[test]
    fn test_failures() {
        let err = expand_range("EA6-EH").unwrap_err();
        assert_eq!(err.reason, RangeErrorReason::LengthMismatch);
        assert_eq!(err.pattern, "EA6-EH");
        assert_eq!(expand_range("EA6-EA6").unwrap_err().reason, RangeErrorReason::NoVaryingPosition);
        assert_eq!(expand_range("EA6").unwrap_err().reason, RangeErrorReason::Malformed);
        assert_eq!(expand_range("EA6-").unwrap_err().reason, RangeErrorReason::Malformed);
        assert_eq!(expand_range("A-B-C").unwrap_err().reason, RangeErrorReason::Malformed);
        assert_eq!(expand_range("EH6-EA6").unwrap_err().reason, RangeErrorReason::Descending);
    }

    #[test]
    fn test_expand_entry() {
        assert_eq!(expand_entry("VE"), (vec!["VE".to_string()], None));
        let (kept, err) = expand_entry("EA6-EH");
        assert_eq!(kept, vec!["EA6-EH".to_string()]);
        assert!(err.is_some());
        assert_eq!(expand_entry("3A-3B").0, vec!["3A", "3B"]);
    }
}
