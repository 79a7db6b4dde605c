/*!
The high level search API: a [`Regex`] that picks the right engine for a
pattern at build time.

Two engines exist. Patterns of exactly the shape `[class]+` with ASCII
ranges get the [char class scanner](crate::charclass), which needs no NFA
and no per-search state. Everything else is compiled into a
[Thompson NFA](crate::nfa::thompson) and searched by the
[`BoundedBacktracker`](crate::nfa::backtrack::BoundedBacktracker).
*/

#[cfg(feature = "syntax")]
use bon::bon;
#[cfg(feature = "syntax")]
use regex_syntax::hir::Hir;

mod matches;
pub use matches::{Match, MatchKind};

#[cfg(feature = "syntax")]
use crate::{
    charclass::{self, CharClassSearcher},
    nfa::{
        backtrack::{self, BoundedBacktracker, Cache},
        thompson, BuildError,
    },
    util::{
        pool::{Pool, PoolGuard},
        syntax, utf8,
    },
};

/// A compiled regular expression for searching haystacks.
///
/// A `Regex` runs with an implicit `(?s:.)*?` at the beginning of its
/// pattern, so it finds matches anywhere in a haystack; use `^`/`$` (or
/// `\A`/`\z`) to anchor. Building one picks a matching engine based on the
/// pattern shape, before any automaton is constructed; see the
/// [module docs](self) for which engine handles what.
///
/// # Example
///
/// ```
/// use nfa_matcher::matcher::{Match, Regex};
///
/// let re = Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}")?;
/// let hay = "What do 1865-04-14 and 1963-11-22 have in common?";
/// assert_eq!(re.find(hay), Some(Match::new(8, 18)));
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
///
/// # Haystack size
///
/// The backtracking engine bounds its memory: haystacks longer than
/// [`Regex::max_haystack_len`] report no match rather than allocating
/// without limit. The default envelope admits haystacks around a megabyte
/// for small patterns; raise it by passing the builder a
/// [`backtrack::Config`] with a larger
/// [`visited_capacity`](backtrack::Config::visited_capacity) when that is
/// too tight. The scanner engine has no such bound.
///
/// # Synchronization and cloning
///
/// The search routines here take `&self` even though the backtracking
/// engine needs mutable per-search state. A pool of caches covers that
/// internally, at the cost of a mutex acquisition per call. When the same
/// `Regex` is shared across many threads running many short searches, that
/// lock can contend; cloning the `Regex` per thread avoids it, since a
/// clone shares the compiled automaton but gets its own pool.
#[cfg(feature = "syntax")]
#[derive(Debug)]
pub struct Regex {
    imp: RegexI,
    /// Caches for the high level `&self` routines. Engine-level `_with`
    /// APIs bypass this entirely.
    pool: Pool<Cache>,
}

#[cfg(feature = "syntax")]
#[derive(Clone, Debug)]
enum RegexI {
    /// The byte-table fast path for `[class]+` patterns.
    CharClass(CharClassSearcher),
    /// The general engine for everything else.
    Backtrack(BoundedBacktracker),
}

#[cfg(feature = "syntax")]
fn create_cache() -> Cache {
    Cache::new()
}

#[cfg(feature = "syntax")]
#[bon]
impl Regex {
    /// Compile the given pattern with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, BuildError> {
        Regex::builder().build(pattern)
    }

    /// Return a builder for configuring the construction of a `Regex`.
    ///
    /// # Example
    ///
    /// This example shows how to enable case insensitive mode and how to
    /// hand the backtracking engine a different memory envelope.
    ///
    /// ```
    /// use nfa_matcher::{matcher::Regex, nfa::backtrack, util::syntax};
    ///
    /// let re = Regex::builder()
    ///     .syntax(syntax::Config::new().case_insensitive(true))
    ///     .backtrack(backtrack::Config::new().visited_capacity(1 << 16))
    ///     .build("hello")?;
    /// assert!(re.is_match("say HELLO"));
    /// # Ok::<(), nfa_matcher::nfa::BuildError>(())
    /// ```
    #[builder(builder_type = Builder, finish_fn(name = build_from_hir, doc {
    /// Builds a `Regex` directly from an `Hir` expression.
    ///
    /// This is useful if you needed to parse a pattern string into an
    /// `Hir` for other reasons, such as analysis or transformations. Any
    /// options set via `Builder::syntax` are ignored here; they only
    /// apply when a pattern string is parsed.
    }))]
    pub fn builder(
        #[builder(field)] syntax: syntax::Config,
        #[builder(finish_fn)] hir: Hir,
        /// Thompson NFA configuration, applied when the general engine is
        /// chosen.
        #[builder(default)] thompson: thompson::Config,
        /// Backtracker configuration, applied when the general engine is
        /// chosen.
        #[builder(default)] backtrack: backtrack::Config,
    ) -> Result<Regex, BuildError> {
        _ = syntax;
        // The fast path is decided on the pattern shape alone, before any
        // NFA exists.
        let imp = match charclass::extract(&hir) {
            Some(ranges) => {
                RegexI::CharClass(CharClassSearcher::new(&ranges))
            }
            None => {
                let nfa = thompson::Compiler::new()
                    .configure(thompson)
                    .build_from_hir(&hir)?;
                let re = BoundedBacktracker::builder()
                    .configure(backtrack)
                    .build_from_nfa(nfa)?;
                RegexI::Backtrack(re)
            }
        };
        Ok(Regex { imp, pool: Pool::new(create_cache) })
    }
}

/// Hand-written additions to the generated [`Builder`].
#[cfg(feature = "syntax")]
impl<S: builder::State> Builder<S> {
    /// Configure the syntax options used when parsing a pattern string.
    ///
    /// These options only apply to [`Builder::build`]; `build_from_hir`
    /// accepts an already parsed `Hir`.
    pub fn syntax(mut self, config: syntax::Config) -> Self {
        self.syntax = config;
        self
    }

    /// Builds a `Regex` from a pattern string.
    pub fn build(self, pattern: &str) -> Result<Regex, BuildError>
    where
        S: builder::IsComplete,
    {
        let hir = self.syntax.parse(pattern).map_err(BuildError::syntax)?;
        self.build_from_hir(hir)
    }
}

/// High level convenience routines for searching a haystack.
#[cfg(feature = "syntax")]
impl Regex {
    /// Returns true if and only if this regex matches the given haystack.
    ///
    /// # Example
    ///
    /// ```
    /// use nfa_matcher::matcher::Regex;
    ///
    /// let re = Regex::new("foo[0-9]+bar")?;
    /// assert!(re.is_match("foo12345bar"));
    /// assert!(!re.is_match("foobar"));
    /// # Ok::<(), nfa_matcher::nfa::BuildError>(())
    /// ```
    #[inline]
    pub fn is_match<H: AsRef<[u8]> + ?Sized>(&self, haystack: &H) -> bool {
        match self.imp {
            RegexI::CharClass(ref searcher) => {
                searcher.search(haystack).is_some()
            }
            RegexI::Backtrack(ref re) => {
                let mut cache = self.pool.get();
                re.is_match_with(&mut cache, haystack)
            }
        }
    }

    /// Executes a leftmost search and returns the first match found, if
    /// one exists.
    ///
    /// # Example
    ///
    /// ```
    /// use nfa_matcher::matcher::{Match, Regex};
    ///
    /// let re = Regex::new("foo[0-9]+")?;
    /// assert_eq!(re.find("foo12345"), Some(Match::new(0, 8)));
    /// # Ok::<(), nfa_matcher::nfa::BuildError>(())
    /// ```
    #[inline]
    pub fn find<H: AsRef<[u8]> + ?Sized>(&self, haystack: &H) -> Option<Match> {
        self.find_at(haystack, 0)
    }

    /// Executes a leftmost search starting at offset `at`. Offsets in the
    /// returned match are relative to the whole haystack.
    #[inline]
    pub fn find_at<H: AsRef<[u8]> + ?Sized>(
        &self,
        haystack: &H,
        at: usize,
    ) -> Option<Match> {
        match self.imp {
            RegexI::CharClass(ref searcher) => searcher.search_at(haystack, at),
            RegexI::Backtrack(ref re) => {
                let mut cache = self.pool.get();
                re.find_at_with(&mut cache, haystack, at)
            }
        }
    }

    /// Returns an iterator over all non-overlapping leftmost matches.
    ///
    /// # Example
    ///
    /// ```
    /// use nfa_matcher::matcher::{Match, Regex};
    ///
    /// let re = Regex::new("foo[0-9]+")?;
    /// let haystack = "foo1 foo12 foo123";
    /// let matches: Vec<Match> = re.find_iter(haystack).collect();
    /// assert_eq!(matches, vec![
    ///     Match::new(0, 4),
    ///     Match::new(5, 10),
    ///     Match::new(11, 17),
    /// ]);
    /// # Ok::<(), nfa_matcher::nfa::BuildError>(())
    /// ```
    #[inline]
    pub fn find_iter<'r, 'h, H: AsRef<[u8]> + ?Sized>(
        &'r self,
        haystack: &'h H,
    ) -> FindMatches<'r, 'h> {
        FindMatches {
            re: self,
            cache: self.pool.get(),
            haystack: haystack.as_ref(),
            at: 0,
        }
    }

    /// Returns true when this regex was routed to the byte-table scanner
    /// instead of the backtracking engine.
    pub fn is_accelerated(&self) -> bool {
        matches!(self.imp, RegexI::CharClass(_))
    }

    /// Returns the length of the longest haystack this regex searches.
    /// Anything longer reports no match; see the type docs.
    pub fn max_haystack_len(&self) -> usize {
        match self.imp {
            RegexI::CharClass(_) => usize::MAX,
            RegexI::Backtrack(ref re) => re.max_haystack_len(),
        }
    }
}

#[cfg(feature = "syntax")]
impl Clone for Regex {
    fn clone(&self) -> Regex {
        // The pool stays per-instance so that clones in other threads do
        // not contend on this one's mutex.
        Regex { imp: self.imp.clone(), pool: Pool::new(create_cache) }
    }
}

/// An iterator over all non-overlapping matches in a haystack.
///
/// Matches are reported in order. After an empty match, the iterator
/// advances by one codepoint (one byte for non-UTF-8 automatons) so that
/// it always makes progress and never splits a codepoint.
#[cfg(feature = "syntax")]
pub struct FindMatches<'r, 'h> {
    re: &'r Regex,
    cache: PoolGuard<'r, Cache>,
    haystack: &'h [u8],
    at: usize,
}

#[cfg(feature = "syntax")]
impl Iterator for FindMatches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.at > self.haystack.len() {
            return None;
        }
        let m = match self.re.imp {
            RegexI::CharClass(ref searcher) => {
                searcher.search_at(self.haystack, self.at)
            }
            RegexI::Backtrack(ref re) => {
                re.find_at_with(&mut self.cache, self.haystack, self.at)
            }
        }?;
        self.at = if m.is_empty() {
            let width = match self.re.imp {
                RegexI::Backtrack(ref re) if re.get_nfa().is_utf8() => {
                    utf8::leading_len(&self.haystack[m.end()..])
                }
                _ => 1,
            };
            m.end() + width.max(1)
        } else {
            m.end()
        };
        Some(m)
    }
}

#[cfg(all(test, feature = "syntax"))]
mod tests {
    use super::*;

    #[test]
    fn engine_pick() {
        assert!(Regex::new("[0-9]+").unwrap().is_accelerated());
        assert!(Regex::new("[a-f0-9]+").unwrap().is_accelerated());

        assert!(!Regex::new("[0-9]*").unwrap().is_accelerated());
        assert!(!Regex::new("([0-9])+").unwrap().is_accelerated());
        assert!(!Regex::new("[0-9]+x").unwrap().is_accelerated());
        assert!(!Regex::new("[a-zé]+").unwrap().is_accelerated());
        assert!(!Regex::new("abc").unwrap().is_accelerated());
    }

    #[test]
    fn engines_agree() {
        // `[0-9][0-9]*` matches the same spans as `[0-9]+` but its shape
        // forces the general engine.
        let fast = Regex::new("[0-9]+").unwrap();
        let general = Regex::new("[0-9][0-9]*").unwrap();
        assert!(fast.is_accelerated());
        assert!(!general.is_accelerated());

        for hay in ["", "1 22 333", "abc123def", "no digits here"] {
            assert_eq!(
                fast.find_iter(hay).collect::<Vec<_>>(),
                general.find_iter(hay).collect::<Vec<_>>(),
                "engines disagree on {:?}",
                hay,
            );
        }
    }

    #[test]
    fn find_positions() {
        let re = Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap();
        let hay = "What do 1865-04-14 and 1963-11-22 have in common?";
        assert_eq!(re.find(hay), Some(Match::new(8, 18)));
        assert_eq!(re.find_at(hay, 9), Some(Match::new(23, 33)));
        assert_eq!(re.find_at(hay, 34), None);
    }

    #[test]
    fn iterates_non_overlapping() {
        let re = Regex::new("foo[0-9]+").unwrap();
        let matches: Vec<Match> = re.find_iter("foo1 foo12 foo123").collect();
        assert_eq!(
            matches,
            vec![Match::new(0, 4), Match::new(5, 10), Match::new(11, 17)],
        );

        let re = Regex::new("[0-9]+").unwrap();
        let matches: Vec<Match> = re.find_iter("1 22 333").collect();
        assert_eq!(
            matches,
            vec![Match::new(0, 1), Match::new(2, 4), Match::new(5, 8)],
        );
    }

    #[test]
    fn empty_matches_step_over_codepoints() {
        let re = Regex::new("b*").unwrap();
        let matches: Vec<Match> = re.find_iter("aβc").collect();
        assert_eq!(
            matches,
            vec![
                Match::new(0, 0),
                Match::new(1, 1),
                Match::new(3, 3),
                Match::new(4, 4),
            ],
        );
    }

    #[test]
    fn syntax_knob() {
        let re = Regex::builder()
            .syntax(syntax::Config::new().case_insensitive(true))
            .build("[a-z]+")
            .unwrap();
        assert!(re.is_match("HELLO"));

        let re = Regex::builder()
            .syntax(syntax::Config::new().multi_line(true))
            .build("^foo$")
            .unwrap();
        assert_eq!(re.find("bar\nfoo\nbaz"), Some(Match::new(4, 7)));
    }

    #[test]
    fn thompson_knob() {
        let re = Regex::builder()
            .thompson(thompson::Config::new().unanchored_prefix(false))
            .build("abc")
            .unwrap();
        assert_eq!(re.find("abcdef"), Some(Match::new(0, 3)));
        assert_eq!(re.find("xxabc"), None);
    }

    #[test]
    fn backtrack_knob() {
        let re = Regex::builder()
            .backtrack(
                backtrack::Config::new()
                    .match_kind(MatchKind::LeftmostLongest),
            )
            .build("sam|samwise")
            .unwrap();
        assert_eq!(re.find("samwise"), Some(Match::new(0, 7)));

        let re = Regex::builder()
            .backtrack(backtrack::Config::new().visited_capacity(64))
            .build("sam|samwise")
            .unwrap();
        assert!(re.max_haystack_len() < 64);
        let hay = "x".repeat(re.max_haystack_len() + 1) + "sam";
        assert_eq!(re.find(&hay), None);
    }

    #[test]
    fn clones_share_the_automaton() {
        let re = Regex::new(r"[a-z]+[0-9]").unwrap();
        let other = re.clone();
        assert_eq!(re.find("ab1"), other.find("ab1"));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let re = re.clone();
                scope.spawn(move || {
                    assert_eq!(re.find("zz9"), Some(Match::new(0, 3)));
                });
            }
        });
    }

    #[test]
    fn build_from_hir_directly() {
        let hir = syntax::Config::new().parse("[0-9]+").unwrap();
        let re = Regex::builder().build_from_hir(hir).unwrap();
        assert!(re.is_accelerated());
        assert_eq!(re.find("a12"), Some(Match::new(1, 3)));
    }
}
