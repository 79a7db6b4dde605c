use std::ops::Range;

/// A match reported by one of the engines in this crate.
///
/// A match records the start and end byte offsets of the matching part of
/// the haystack. Every match guarantees `start <= end`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Match {
    start: usize,
    end: usize,
}

impl Match {
    #[inline]
    pub fn new(start: usize, end: usize) -> Match {
        debug_assert!(start <= end);
        Match { start, end }
    }

    /// The starting byte offset of the match, inclusive.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// The ending byte offset of the match, exclusive.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The match as a range, usable for slicing the haystack.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns a new match with `offset` added to both offsets.
    #[inline]
    pub fn offset(&self, offset: usize) -> Match {
        Match { start: self.start + offset, end: self.end + offset }
    }
}

impl From<Range<usize>> for Match {
    fn from(range: Range<usize>) -> Match {
        Match::new(range.start, range.end)
    }
}

/// The semantics a matcher uses when more than one match is possible at the
/// same starting position.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MatchKind {
    /// Report the match found first under split-branch priority: greedy
    /// sub-expressions before lazy ones, earlier alternatives before later
    /// ones. This is what PCRE-style engines report, and the default.
    #[default]
    LeftmostFirst,
    /// Report the longest match at the leftmost starting position,
    /// regardless of branch priority. This is what POSIX and AWK report.
    LeftmostLongest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let m = Match::new(3, 6);
        assert_eq!(m.start(), 3);
        assert_eq!(m.end(), 6);
        assert_eq!(m.len(), 3);
        assert!(!m.is_empty());
        assert_eq!(m.range(), 3..6);
        assert_eq!(m.offset(4), Match::new(7, 10));
        assert_eq!(Match::from(3..6), m);

        assert!(Match::new(2, 2).is_empty());
    }
}
