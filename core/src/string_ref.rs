//! Non-owning views over text, with case-insensitive comparators.
//!
//! Most of the parsing done by this crate (connection strings, dialect
//! annotations, `:name` placeholders) never needs to allocate: it only needs
//! to carve a borrowed `&str` into sub-slices and compare them. `&str` already
//! gives us that, so this module is mostly a small set of comparator helpers
//! rather than a distinct view type.

use std::cmp::Ordering;

/// Case-insensitive equality for ASCII text.
pub fn eq_ignore_ascii_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Case-insensitive ordering for ASCII text, used to keep the bind-by-name
/// helper's name table and the statement cache sorted for lookup.
pub fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
    let mut ai = a.bytes().map(|c| c.to_ascii_lowercase());
    let mut bi = b.bytes().map(|c| c.to_ascii_lowercase());
    loop {
        match (ai.next(), bi.next()) {
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Wrapper newtype giving `&str` a case-insensitive `Ord`/`Eq`, for use as a
/// sort/lookup key (e.g. `BTreeMap<CaseInsensitive<'_>, _>`-style tables).
#[derive(Debug, Clone, Copy)]
pub struct CaseInsensitive<'a>(pub &'a str);

impl PartialEq for CaseInsensitive<'_> {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_ascii_case(self.0, other.0)
    }
}
impl Eq for CaseInsensitive<'_> {}

impl PartialOrd for CaseInsensitive<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for CaseInsensitive<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_ascii_case(self.0, other.0)
    }
}

/// Splits `s` on the first occurrence of any byte in `needles`, returning
/// `(before, Some(sep_byte), after)`, or `(s, None, "")` if none is found.
///
/// Used by the dialect selector and the connection-info parser, both of
/// which need a "find first of several separators" primitive a plain
/// `str::find` doesn't give directly.
pub fn split_first_of<'a>(s: &'a str, needles: &[char]) -> (&'a str, Option<char>, &'a str) {
    match s.find(needles) {
        Some(idx) => {
            let sep = s[idx..].chars().next().unwrap();
            (&s[..idx], Some(sep), &s[idx + sep.len_utf8()..])
        }
        None => (s, None, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_eq() {
        assert!(eq_ignore_ascii_case("PostgreSQL", "postgresql"));
        assert!(!eq_ignore_ascii_case("PostgreSQL", "mysql"));
    }

    #[test]
    fn case_insensitive_ord_matches_lowercase() {
        assert_eq!(cmp_ignore_ascii_case("Abc", "abd"), Ordering::Less);
        assert_eq!(cmp_ignore_ascii_case("ABC", "abc"), Ordering::Equal);
    }

    #[test]
    fn wrapper_sorts_like_lowercase() {
        let mut v = vec![
            CaseInsensitive("Charlie"),
            CaseInsensitive("alpha"),
            CaseInsensitive("Bravo"),
        ];
        v.sort();
        let names: Vec<&str> = v.iter().map(|c| c.0).collect();
        assert_eq!(names, vec!["alpha", "Bravo", "Charlie"]);
    }

    #[test]
    fn split_first_of_finds_either_separator() {
        assert_eq!(
            split_first_of("engine/9.1", &['/', '.']),
            ("engine", Some('/'), "9.1")
        );
        assert_eq!(
            split_first_of("engine.9", &['/', '.']),
            ("engine", Some('.'), "9")
        );
        assert_eq!(split_first_of("engine", &['/', '.']), ("engine", None, ""));
    }
}
