//! Display ordering for event and tag names.
//!
//! Embedded digit runs compare by numeric value, so `A2` sorts before `A111`.
//! The ordering is for presentation only and is never used for identity.

use std::cmp::Ordering;

/// Compares two names treating maximal digit runs as integers.
///
/// Digit runs are compared by value without parsing, so arbitrarily long runs
/// cannot overflow. Runs with equal value but different leading zeros compare
/// equal and the scan continues after them.
#[must_use]
pub fn compare_names(left: &str, right: &str) -> Ordering {
    let left = left.as_bytes();
    let right = right.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        if left[i].is_ascii_digit() && right[j].is_ascii_digit() {
            let left_end = digit_run_end(left, i);
            let right_end = digit_run_end(right, j);
            let ordering = compare_digit_runs(&left[i..left_end], &right[j..right_end]);
            if ordering != Ordering::Equal {
                return ordering;
            }
            i = left_end;
            j = right_end;
            continue;
        }

        match left[i].cmp(&right[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            other => return other,
        }
    }

    (left.len() - i).cmp(&(right.len() - j))
}

/// Sorts names in place with [`compare_names`].
pub fn sort_names<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|left, right| compare_names(left.as_ref(), right.as_ref()));
}

fn digit_run_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset)
}

fn compare_digit_runs(left: &[u8], right: &[u8]) -> Ordering {
    let left = strip_leading_zeros(left);
    let right = strip_leading_zeros(right);
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

fn strip_leading_zeros(run: &[u8]) -> &[u8] {
    let first_significant = run.iter().position(|byte| *byte != b'0').unwrap_or(run.len());
    &run[first_significant..]
}

#[cfg(test)]
mod tests {
    use super::{compare_digit_runs, compare_names};
    use std::cmp::Ordering;

    #[test]
    fn digit_runs_ignore_leading_zeros() {
        assert_eq!(compare_digit_runs(b"007", b"7"), Ordering::Equal);
        assert_eq!(compare_digit_runs(b"0", b"000"), Ordering::Equal);
        assert_eq!(compare_digit_runs(b"10", b"9"), Ordering::Greater);
    }

    #[test]
    fn very_long_digit_runs_do_not_overflow() {
        let big = "T".to_owned() + &"9".repeat(64);
        let bigger = "T1".to_owned() + &"0".repeat(64);
        assert_eq!(compare_names(&big, &bigger), Ordering::Less);
    }
}
