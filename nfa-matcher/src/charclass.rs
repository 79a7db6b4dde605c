/*!
A byte-table fast path for patterns of the shape `[class]+`.

Such a pattern matches maximal runs of bytes from a fixed set, which a
256-bit membership table finds in a single linear scan. When
[`extract`] accepts a pattern, no NFA is built at all: the engine picker
installs a [`CharClassSearcher`] instead and the backtracker never runs.
*/

#[cfg(feature = "syntax")]
use regex_syntax::hir::{Class, Hir, HirKind};

use crate::matcher::Match;

/// Extracts the byte ranges of a pattern with exactly the shape
/// `[class]+`, for handing to [`CharClassSearcher::new`]. Returns `None`
/// for every other shape.
///
/// The accepted shape is deliberately narrow. Anything that changes what a
/// plain table scan would report disqualifies the pattern:
///
/// * `[class]*`: the scanner cannot produce the zero-width match at every
///   position that `*` demands;
/// * a lazy `[class]+?` or a bounded `[class]{m,n}`: both report spans
///   other than the maximal run;
/// * a wrapping group, concatenation, alternation or anchor;
/// * any range reaching beyond `0x7F`: multi-byte UTF-8 cannot be matched
///   bytewise by a table.
#[cfg(feature = "syntax")]
pub fn extract(hir: &Hir) -> Option<Vec<(u8, u8)>> {
    let HirKind::Repetition(ref rep) = *hir.kind() else { return None };
    if rep.min != 1 || rep.max.is_some() || !rep.greedy {
        return None;
    }
    let HirKind::Class(ref class) = *rep.sub.kind() else { return None };
    let mut ranges = vec![];
    match *class {
        Class::Unicode(ref cls) => {
            for r in cls.ranges() {
                if r.end() as u32 > 0x7F {
                    return None;
                }
                ranges.push((r.start() as u8, r.end() as u8));
            }
        }
        Class::Bytes(ref cls) => {
            for r in cls.ranges() {
                if r.end() > 0x7F {
                    return None;
                }
                ranges.push((r.start(), r.end()));
            }
        }
    }
    if ranges.is_empty() {
        None
    } else {
        Some(ranges)
    }
}

/// Finds maximal runs of bytes drawn from a fixed set.
///
/// Constructed from the ranges returned by [`extract`]. Unlike the
/// [`BoundedBacktracker`](crate::nfa::backtrack::BoundedBacktracker), a
/// scanner needs no per-search state and accepts haystacks of any length.
#[derive(Clone, Debug)]
pub struct CharClassSearcher {
    /// One bit per byte value.
    table: [u64; 4],
    /// The shortest run that counts as a match. `1` for `+`; a value of
    /// `0` would permit empty matches, which [`extract`] never produces.
    min_match: usize,
}

impl CharClassSearcher {
    /// Builds a searcher for the given inclusive byte ranges.
    pub fn new(ranges: &[(u8, u8)]) -> CharClassSearcher {
        let mut table = [0u64; 4];
        for &(lo, hi) in ranges {
            for byte in lo..=hi {
                table[(byte >> 6) as usize] |= 1 << (byte & 63);
            }
        }
        CharClassSearcher { table, min_match: 1 }
    }

    #[cfg_attr(feature = "perf-inline", inline(always))]
    fn contains(&self, byte: u8) -> bool {
        self.table[(byte >> 6) as usize] & (1 << (byte & 63)) != 0
    }

    /// A scanner has no memory envelope; it handles any haystack.
    pub fn can_handle(&self, _haystack_len: usize) -> bool {
        true
    }

    /// Returns the leftmost maximal run, if any.
    #[inline]
    pub fn search<H: AsRef<[u8]> + ?Sized>(&self, haystack: &H) -> Option<Match> {
        self.search_at(haystack, 0)
    }

    /// Returns the leftmost maximal run starting at or after `at`.
    pub fn search_at<H: AsRef<[u8]> + ?Sized>(
        &self,
        haystack: &H,
        at: usize,
    ) -> Option<Match> {
        let haystack = haystack.as_ref();
        let mut i = at;
        loop {
            while i < haystack.len() && !self.contains(haystack[i]) {
                i += 1;
            }
            if i >= haystack.len() {
                return None;
            }
            let start = i;
            while i < haystack.len() && self.contains(haystack[i]) {
                i += 1;
            }
            if i - start >= self.min_match {
                return Some(Match::new(start, i));
            }
            // Run too short; resume scanning right after it.
        }
    }

    /// Appends every maximal run to `buf`, in order.
    pub fn find_all_indices<H: AsRef<[u8]> + ?Sized>(
        &self,
        haystack: &H,
        buf: &mut Vec<Match>,
    ) {
        let haystack = haystack.as_ref();
        let mut at = 0;
        while let Some(m) = self.search_at(haystack, at) {
            at = m.end();
            buf.push(m);
        }
    }

    /// Returns the number of maximal runs.
    pub fn count<H: AsRef<[u8]> + ?Sized>(&self, haystack: &H) -> usize {
        let haystack = haystack.as_ref();
        let (mut at, mut count) = (0, 0);
        while let Some(m) = self.search_at(haystack, at) {
            at = m.end();
            count += 1;
        }
        count
    }
}

#[cfg(all(test, feature = "syntax"))]
mod tests {
    use super::*;
    use crate::{nfa::backtrack::BoundedBacktracker, util::syntax};

    fn hir(pattern: &str) -> Hir {
        syntax::Config::new().parse(pattern).unwrap()
    }

    #[test]
    fn extract_accepts_simple_plus() {
        assert_eq!(extract(&hir("[0-9]+")), Some(vec![(0x30, 0x39)]));
        assert_eq!(
            extract(&hir("[a-z0-9]+")),
            Some(vec![(0x30, 0x39), (0x61, 0x7A)]),
        );
        assert_eq!(extract(&hir("[_]+")), Some(vec![(b'_', b'_')]));
        assert_eq!(
            extract(&hir("(?-u)[\\x00-\\x7f]+")),
            Some(vec![(0x00, 0x7F)]),
        );
    }

    #[test]
    fn extract_rejects_everything_else() {
        // Star demands empty matches the scanner cannot produce.
        assert_eq!(extract(&hir("[0-9]*")), None);
        // Lazy and bounded repetitions report non-maximal runs.
        assert_eq!(extract(&hir("[0-9]+?")), None);
        assert_eq!(extract(&hir("[0-9]{1,3}")), None);
        // Wrapping operators of any kind.
        assert_eq!(extract(&hir("([0-9])+")), None);
        assert_eq!(extract(&hir("([0-9]+)")), None);
        assert_eq!(extract(&hir("a[0-9]+")), None);
        assert_eq!(extract(&hir("[0-9]+|a")), None);
        assert_eq!(extract(&hir("^[0-9]+")), None);
        // Not a repetition at all.
        assert_eq!(extract(&hir("abc")), None);
        assert_eq!(extract(&hir("[0-9]")), None);
        // Multi-byte ranges cannot be byte-table matched.
        assert_eq!(extract(&hir("[é]+")), None);
        assert_eq!(extract(&hir("[a-zé]+")), None);
        assert_eq!(extract(&hir(r"\d+")), None); // Unicode \d goes past ASCII
    }

    #[test]
    fn finds_maximal_runs() {
        let searcher = CharClassSearcher::new(&[(0x30, 0x39)]);
        assert_eq!(searcher.search("1 22 333"), Some(Match::new(0, 1)));
        assert_eq!(searcher.search_at("1 22 333", 1), Some(Match::new(2, 4)));
        assert_eq!(searcher.search_at("1 22 333", 3), Some(Match::new(3, 4)));
        assert_eq!(searcher.search_at("1 22 333", 8), None);
        assert_eq!(searcher.search("no digits"), None);
        assert_eq!(searcher.search(""), None);
        assert!(searcher.can_handle(usize::MAX));

        let mut indices = vec![];
        searcher.find_all_indices("1 22 333", &mut indices);
        assert_eq!(
            indices,
            vec![Match::new(0, 1), Match::new(2, 4), Match::new(5, 8)],
        );
        assert_eq!(searcher.count("1 22 333"), 3);
        assert_eq!(searcher.count(""), 0);
    }

    #[test]
    fn short_runs_are_skipped() {
        let mut searcher = CharClassSearcher::new(&[(b'a', b'z')]);
        searcher.min_match = 2;
        assert_eq!(searcher.search("a bb a ccc"), Some(Match::new(2, 4)));
        assert_eq!(searcher.search_at("a bb a ccc", 4), Some(Match::new(7, 10)));
        assert_eq!(searcher.search("a b c"), None);
    }

    #[test]
    fn agrees_with_the_backtracker() {
        let patterns = ["[0-9]+", "[a-z]+", "[a-f0-9]+", "[._a-z]+"];
        let haystacks = ["", "1 22 333", "abc123def", "a.b_c", "///", "0"];
        for pattern in patterns {
            let searcher =
                CharClassSearcher::new(&extract(&hir(pattern)).unwrap());
            let mut re = BoundedBacktracker::new(pattern).unwrap();
            for hay in haystacks {
                for at in 0..=hay.len() {
                    assert_eq!(
                        searcher.search_at(hay, at),
                        re.find_at(hay, at),
                        "{:?} at {} in {:?}",
                        pattern,
                        at,
                        hay,
                    );
                }
            }
        }
    }
}
