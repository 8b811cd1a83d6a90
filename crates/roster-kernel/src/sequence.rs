//! Sequence scanning.
//!
//! The "next" sequence number for a scope is derived on demand from the
//! latest entity created in that scope, never from a persisted counter.
//! The store supplies the latest row ordered by creation time — creation
//! time is monotonic and trustworthy, while parsing an arbitrary code is
//! not.

use roster_types::{Code, SequenceNumber};

/// Derives the next sequence number from the latest code in a scope.
///
/// `pad_width` is the template's `{sequence:N}` width: when present, the
/// trailing `N` characters of the code are the sequence field; when the
/// template uses an unpadded `{sequence}`, the trailing run of digits is
/// used instead.
///
/// Returns [`SequenceNumber::ONE`] when the scope is empty or the suffix
/// of the latest code is not parseable as an integer. Falling back to 1 on
/// a malformed legacy code is deliberate: one corrupted code must not
/// block all future allocation in its scope — the uniqueness constraint
/// and the allocator's retry loop absorb any resulting collision.
pub fn next_sequence(latest: Option<&Code>, pad_width: Option<usize>) -> SequenceNumber {
    let Some(code) = latest else {
        return SequenceNumber::ONE;
    };

    let digits = match pad_width {
        Some(width) => code.trailing(width).unwrap_or(""),
        None => code.trailing_digits(),
    };

    match digits.parse::<u32>() {
        Ok(parsed) => {
            let next = SequenceNumber::new(parsed).next();
            debug_assert!(
                next.as_u32() > parsed || parsed == u32::MAX,
                "next sequence must exceed the parsed suffix"
            );
            next
        }
        // Non-numeric or out-of-range suffix: repair, don't fail.
        Err(_) => SequenceNumber::ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn code(s: &str) -> Code {
        Code::new(s).expect("test code")
    }

    #[test]
    fn empty_scope_starts_at_one() {
        assert_eq!(next_sequence(None, Some(3)), SequenceNumber::ONE);
        assert_eq!(next_sequence(None, None), SequenceNumber::ONE);
    }

    #[test_case("CS24007", Some(3), 8 ; "padded suffix increments")]
    #[test_case("CS24999", Some(3), 1000 ; "padded suffix can roll past its width")]
    #[test_case("C24005", Some(3), 6 ; "class code with literal prefix")]
    #[test_case("ENG-42", None, 43 ; "unpadded trailing run")]
    #[test_case("A1B2C3", None, 4 ; "trailing run stops at first non-digit")]
    fn numeric_suffixes_increment(latest: &str, width: Option<usize>, expected: u32) {
        assert_eq!(
            next_sequence(Some(&code(latest)), width),
            SequenceNumber::new(expected)
        );
    }

    #[test_case("LEGACY-XYZ", Some(3) ; "alphabetic suffix")]
    #[test_case("AB", Some(3) ; "code shorter than the field")]
    #[test_case("CS24X07", Some(3) ; "digit field interrupted by a letter")]
    #[test_case("NODIGITS", None ; "no trailing digits at all")]
    #[test_case("X99999999999", None ; "suffix overflows u32")]
    fn malformed_suffixes_repair_to_one(latest: &str, width: Option<usize>) {
        assert_eq!(next_sequence(Some(&code(latest)), width), SequenceNumber::ONE);
    }
}
