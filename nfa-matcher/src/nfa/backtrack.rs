/*!
A bounded backtracking search over an [`NFA`].

A backtracker explores the automaton depth first, following the preferred
operand of every split before the other one. On its own that has
exponential worst case time. This one is *bounded*: it keeps a table of
`(state, position)` pairs it has already visited and never revisits one, so
a search runs in `O(|Q| * n)` time at the cost of `O(|Q| * n)` memory,
where `|Q|` is the number of NFA states and `n` the haystack length. The
memory requirement is exactly why the engine refuses haystacks beyond
[`BoundedBacktracker::max_haystack_len`]: callers are expected to check
[`BoundedBacktracker::can_handle`] and route oversized inputs to an engine
whose memory does not grow with the haystack.

The visited table stores a 32-bit generation stamp per cell instead of a
bit. Starting a new attempt is then a single counter increment rather than
a table clear, which matters because an unanchored search starts one
attempt per haystack position.
*/

use crate::{
    matcher::{Match, MatchKind},
    nfa::{BuildError, NFA, State, StateId},
    util::utf8,
};
#[cfg(feature = "syntax")]
use crate::{nfa::thompson, util::syntax};

/// The default capacity of the visited table, in 32-bit cells.
///
/// 32 Mi cells, or 128 MiB. With a typical small pattern of a few dozen
/// states this admits haystacks around a megabyte; see
/// [`BoundedBacktracker::max_haystack_len`] for the exact ceiling.
const DEFAULT_VISITED_CAPACITY: usize = 32 * (1 << 20);

/// The configuration used for building a [`BoundedBacktracker`].
#[derive(Clone, Debug, Default)]
pub struct Config {
    visited_capacity: Option<usize>,
    match_kind: Option<MatchKind>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Set the maximum size of the visited table, in cells. Each cell is
    /// four bytes. A search over a haystack of length `n` needs
    /// `states * (n + 1)` cells; searches that would need more report no
    /// match without allocating.
    ///
    /// The default is 32 Mi cells (128 MiB).
    pub fn visited_capacity(mut self, cells: usize) -> Config {
        self.visited_capacity = Some(cells);
        self
    }

    /// Set the match semantics. Defaults to [`MatchKind::LeftmostFirst`].
    pub fn match_kind(mut self, kind: MatchKind) -> Config {
        self.match_kind = Some(kind);
        self
    }

    pub fn get_visited_capacity(&self) -> usize {
        self.visited_capacity.unwrap_or(DEFAULT_VISITED_CAPACITY)
    }

    pub fn get_match_kind(&self) -> MatchKind {
        self.match_kind.unwrap_or_default()
    }
}

/// A builder for a [`BoundedBacktracker`].
///
/// # Example
///
/// ```
/// use nfa_matcher::{matcher::MatchKind, nfa::backtrack};
///
/// let mut re = backtrack::Builder::new()
///     .configure(backtrack::Config::new().match_kind(MatchKind::LeftmostLongest))
///     .build(r"sam|samwise")?;
/// assert_eq!(re.find("samwise"), Some(nfa_matcher::matcher::Match::new(0, 7)));
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
    #[cfg(feature = "syntax")]
    compiler: thompson::Compiler,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Apply the given backtracker configuration.
    pub fn configure(&mut self, config: Config) -> &mut Builder {
        self.config = config;
        self
    }

    /// Set the syntax configuration used when parsing pattern strings.
    #[cfg(feature = "syntax")]
    pub fn syntax(&mut self, config: syntax::Config) -> &mut Builder {
        self.compiler.syntax(config);
        self
    }

    /// Set the Thompson NFA configuration used when compiling patterns.
    #[cfg(feature = "syntax")]
    pub fn thompson(&mut self, config: thompson::Config) -> &mut Builder {
        self.compiler.configure(config);
        self
    }

    /// Compile the given pattern into a backtracker.
    #[cfg(feature = "syntax")]
    pub fn build(&self, pattern: &str) -> Result<BoundedBacktracker, BuildError> {
        let nfa = self.compiler.build(pattern)?;
        self.build_from_nfa(nfa)
    }

    /// Build a backtracker over an already constructed NFA.
    ///
    /// The NFA is expected to honor the construction contract: at least one
    /// [`State::Match`] reachable from its anchored start. A malformed NFA
    /// does not cause an error here or during a search; branches that reach
    /// a dangling state id simply fail.
    pub fn build_from_nfa(
        &self,
        nfa: NFA,
    ) -> Result<BoundedBacktracker, BuildError> {
        Ok(BoundedBacktracker {
            config: self.config.clone(),
            nfa,
            cache: Cache::new(),
        })
    }
}

/// A depth-first regex engine with memoized backtracking and a memory
/// envelope.
///
/// # When to use it
///
/// The backtracker answers both "is there a match" and "where is the
/// match", under leftmost-first or leftmost-longest semantics, for any NFA.
/// Its niche is small patterns on small haystacks, where it tends to beat
/// breadth-first NFA simulation. It refuses inputs whose visited table
/// would exceed its configured capacity, so check
/// [`BoundedBacktracker::can_handle`] before relying on it, and fall back
/// to another engine when it declines.
///
/// # Example
///
/// ```
/// use nfa_matcher::{matcher::Match, nfa::backtrack::BoundedBacktracker};
///
/// let mut re = BoundedBacktracker::new(r"[0-9]{4}-[0-9]{2}")?;
/// assert_eq!(re.find("on 2010-03 or so"), Some(Match::new(3, 10)));
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
///
/// # Threads
///
/// The matcher's configuration and its NFA are immutable, so any number of
/// threads may search through one instance concurrently, as long as each
/// search owns its own [`Cache`]. The `_with` methods take the cache
/// explicitly and borrow the matcher shared:
///
/// ```
/// use nfa_matcher::{matcher::Match, nfa::backtrack::BoundedBacktracker};
///
/// let re = BoundedBacktracker::new(r"[0-9]+")?;
/// std::thread::scope(|scope| {
///     for _ in 0..2 {
///         scope.spawn(|| {
///             let mut cache = re.create_cache();
///             let m = re.find_with(&mut cache, "abc123def");
///             assert_eq!(m, Some(Match::new(3, 6)));
///         });
///     }
/// });
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
///
/// The plain methods use a cache carried inside the matcher for
/// convenience; they take `&mut self`, which is what makes them safe to
/// call without any external state.
#[derive(Clone, Debug)]
pub struct BoundedBacktracker {
    config: Config,
    nfa: NFA,
    cache: Cache,
}

impl BoundedBacktracker {
    /// Compile the given pattern with default configurations.
    #[cfg(feature = "syntax")]
    pub fn new(pattern: &str) -> Result<BoundedBacktracker, BuildError> {
        Builder::new().build(pattern)
    }

    /// Build a backtracker over an already constructed NFA with the
    /// default configuration.
    pub fn new_from_nfa(nfa: NFA) -> Result<BoundedBacktracker, BuildError> {
        Builder::new().build_from_nfa(nfa)
    }

    /// Return a builder for configuring the construction of a
    /// `BoundedBacktracker`.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Create a new cache for use with the `_with` search methods.
    pub fn create_cache(&self) -> Cache {
        Cache::new()
    }

    /// Return a borrow of the NFA this matcher searches.
    pub fn get_nfa(&self) -> &NFA {
        &self.nfa
    }

    /// Returns the number of states in the underlying NFA.
    pub fn num_states(&self) -> usize {
        self.nfa.len()
    }

    /// Returns the visited table capacity, in cells.
    pub fn max_visited_capacity(&self) -> usize {
        self.config.get_visited_capacity()
    }

    /// Returns the length of the longest haystack this matcher accepts.
    pub fn max_haystack_len(&self) -> usize {
        (self.config.get_visited_capacity() / self.nfa.len().max(1))
            .saturating_sub(1)
    }

    /// Returns true when a haystack of the given length fits the memory
    /// envelope. A `false` here is a routing signal, not an error: the
    /// search methods report no match for such haystacks.
    pub fn can_handle(&self, haystack_len: usize) -> bool {
        haystack_len
            .checked_add(1)
            .and_then(|n| n.checked_mul(self.nfa.len()))
            .map_or(false, |cells| cells <= self.config.get_visited_capacity())
    }

    /// Returns true if and only if this regex matches the given haystack.
    ///
    /// This routine may short circuit: it stops at the first match reached,
    /// even under leftmost-longest configuration, since only the presence
    /// of a match is reported.
    #[inline]
    pub fn is_match<H: AsRef<[u8]> + ?Sized>(&mut self, haystack: &H) -> bool {
        self.with_internal_cache(|re, cache| re.is_match_with(cache, haystack))
    }

    /// Returns true if and only if this regex matches the given haystack
    /// starting exactly at its first position.
    ///
    /// The anchor is an API-level override: it applies even when the NFA
    /// itself is unanchored.
    #[inline]
    pub fn is_match_anchored<H: AsRef<[u8]> + ?Sized>(
        &mut self,
        haystack: &H,
    ) -> bool {
        self.with_internal_cache(|re, cache| {
            re.is_match_anchored_with(cache, haystack)
        })
    }

    /// Executes a leftmost search and returns the first match found, if
    /// one exists.
    #[inline]
    pub fn find<H: AsRef<[u8]> + ?Sized>(
        &mut self,
        haystack: &H,
    ) -> Option<Match> {
        self.with_internal_cache(|re, cache| re.find_with(cache, haystack))
    }

    /// Executes a leftmost search starting at offset `at`. The returned
    /// offsets are relative to the whole haystack, and the surrounding
    /// context stays visible to look-around assertions.
    #[inline]
    pub fn find_at<H: AsRef<[u8]> + ?Sized>(
        &mut self,
        haystack: &H,
        at: usize,
    ) -> Option<Match> {
        self.with_internal_cache(|re, cache| re.find_at_with(cache, haystack, at))
    }

    /// Like [`BoundedBacktracker::is_match`], but with caller-provided
    /// search state.
    #[inline]
    pub fn is_match_with<H: AsRef<[u8]> + ?Sized>(
        &self,
        cache: &mut Cache,
        haystack: &H,
    ) -> bool {
        self.search_imp(cache, haystack.as_ref(), 0, false, false).is_some()
    }

    /// Like [`BoundedBacktracker::is_match_anchored`], but with
    /// caller-provided search state.
    #[inline]
    pub fn is_match_anchored_with<H: AsRef<[u8]> + ?Sized>(
        &self,
        cache: &mut Cache,
        haystack: &H,
    ) -> bool {
        self.search_imp(cache, haystack.as_ref(), 0, true, false).is_some()
    }

    /// Like [`BoundedBacktracker::find`], but with caller-provided search
    /// state.
    #[inline]
    pub fn find_with<H: AsRef<[u8]> + ?Sized>(
        &self,
        cache: &mut Cache,
        haystack: &H,
    ) -> Option<Match> {
        self.find_at_with(cache, haystack, 0)
    }

    /// Like [`BoundedBacktracker::find_at`], but with caller-provided
    /// search state.
    #[inline]
    pub fn find_at_with<H: AsRef<[u8]> + ?Sized>(
        &self,
        cache: &mut Cache,
        haystack: &H,
        at: usize,
    ) -> Option<Match> {
        let longest =
            self.config.get_match_kind() == MatchKind::LeftmostLongest;
        self.search_imp(cache, haystack.as_ref(), at, false, longest)
    }

    fn with_internal_cache<T>(
        &mut self,
        search: impl FnOnce(&Self, &mut Cache) -> T,
    ) -> T {
        let mut cache = std::mem::replace(&mut self.cache, Cache::new());
        let result = search(self, &mut cache);
        self.cache = cache;
        result
    }

    /// The common search entry: routes capacity, picks start positions and
    /// wraps the raw end offset into a match.
    fn search_imp(
        &self,
        cache: &mut Cache,
        haystack: &[u8],
        at: usize,
        anchored: bool,
        longest: bool,
    ) -> Option<Match> {
        if at > haystack.len() || !self.can_handle(haystack.len()) {
            return None;
        }
        cache.setup_search(self.nfa.len(), haystack.len());
        let start = self.nfa.start_anchored();
        if anchored || self.nfa.is_anchored() {
            let end = self.backtrack(cache, haystack, start, at, longest)?;
            return Some(Match::new(at, end));
        }
        let mut sp = at;
        loop {
            if let Some(end) =
                self.backtrack(cache, haystack, start, sp, longest)
            {
                return Some(Match::new(sp, end));
            }
            if sp == haystack.len() {
                return None;
            }
            sp += 1;
            // The O(1) reset between start positions: nothing is cleared,
            // stale stamps just stop being equal to the generation.
            cache.bump_generation();
        }
    }

    /// One attempt: a full depth-first exploration from `start` at
    /// haystack offset `at`. Returns the end offset of the match found.
    fn backtrack(
        &self,
        cache: &mut Cache,
        haystack: &[u8],
        start: StateId,
        at: usize,
        longest: bool,
    ) -> Option<usize> {
        // A first-match return below can leave unexplored frames behind.
        cache.stack.clear();
        cache.stack.push(Frame { sid: start, at });
        let mut best: Option<usize> = None;
        while let Some(Frame { sid, at }) = cache.stack.pop() {
            if let Some(end) = self.step(cache, haystack, sid, at) {
                if !longest {
                    return Some(end);
                }
                best = Some(best.map_or(end, |b| b.max(end)));
            }
        }
        best
    }

    /// Runs a single branch to its end, pushing the non-preferred operand
    /// of every split for later. Keeping everything else in this loop
    /// instead of on the stack avoids pushing and popping a frame per
    /// transition.
    fn step(
        &self,
        cache: &mut Cache,
        haystack: &[u8],
        mut sid: StateId,
        mut at: usize,
    ) -> Option<usize> {
        loop {
            // A dangling state id means a malformed NFA; the branch just
            // dies, per the construction contract.
            let state = self.nfa.state(sid)?;
            if !cache.should_visit(sid, at) {
                return None;
            }
            match *state {
                State::Match => return Some(at),
                State::Fail => return None,
                State::ByteRange { trans } => match haystack.get(at) {
                    Some(&b) if trans.matches(b) => {
                        sid = trans.next;
                        at += 1;
                    }
                    _ => return None,
                },
                State::Sparse { ref transitions } => {
                    let b = *haystack.get(at)?;
                    match transitions.iter().find(|t| t.matches(b)) {
                        Some(t) => {
                            sid = t.next;
                            at += 1;
                        }
                        None => return None,
                    }
                }
                State::Split { left, right } => {
                    cache.stack.push(Frame { sid: right, at });
                    sid = left;
                }
                State::Epsilon { next } => sid = next,
                State::Capture { next, .. } => sid = next,
                State::Look { look, next } => {
                    if !look.matches(haystack, at) {
                        return None;
                    }
                    sid = next;
                }
                State::RuneAny { next } => {
                    let width = utf8::leading_len(&haystack[at..]);
                    if width == 0 {
                        return None;
                    }
                    sid = next;
                    at += width;
                }
                State::RuneAnyNotNL { next } => {
                    if haystack.get(at) == Some(&b'\n') {
                        return None;
                    }
                    let width = utf8::leading_len(&haystack[at..]);
                    if width == 0 {
                        return None;
                    }
                    sid = next;
                    at += width;
                }
            }
        }
    }
}

/// A frame of the explicit depth-first stack: resume at state `sid` with
/// the haystack at offset `at`.
#[derive(Clone, Copy, Debug)]
struct Frame {
    sid: StateId,
    at: usize,
}

/// Mutable state for a single running search.
///
/// Creating one is cheap; all memory is acquired lazily on first use and
/// reused afterwards. A cache may be reused freely across searches on the
/// same matcher, and across matchers after [`Cache::reset`]. Sharing one
/// cache between concurrently running searches is not possible: the search
/// APIs require `&mut Cache`.
#[derive(Clone, Debug)]
pub struct Cache {
    /// Generation stamps, one per `(state, position)` pair, laid out as
    /// `state * (input_len + 1) + position`.
    visited: Vec<u32>,
    /// The stamp marking cells visited in the current attempt. Cells
    /// holding any other value are unvisited.
    generation: u32,
    /// The haystack length the table is currently laid out for.
    input_len: usize,
    /// The explicit DFS stack. Bounding it is the visited table's job, so
    /// no explicit depth limit exists here.
    stack: Vec<Frame>,
}

impl Cache {
    pub fn new() -> Cache {
        Cache { visited: vec![], generation: 0, input_len: 0, stack: vec![] }
    }

    /// Clears this cache for use with a different matcher, keeping
    /// allocations around for reuse.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.generation = 0;
        self.input_len = 0;
        self.stack.clear();
    }

    /// Returns the heap memory usage of this cache, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.visited.len() * core::mem::size_of::<u32>()
            + self.stack.capacity() * core::mem::size_of::<Frame>()
    }

    /// Lays the visited table out for a search over `input_len` bytes and
    /// opens a fresh generation.
    fn setup_search(&mut self, num_states: usize, input_len: usize) {
        self.input_len = input_len;
        self.stack.clear();
        let need = num_states * (input_len + 1);
        if need > self.visited.len() {
            if need <= self.visited.capacity() {
                self.visited.resize(need, 0);
            } else {
                // A fresh table starts over: all cells zero, generations
                // from one.
                self.visited = vec![0; need];
                self.generation = 0;
            }
        }
        self.bump_generation();
    }

    /// Opens a new attempt. On overflow the stamps become ambiguous, so
    /// the table is zeroed once per 2^32 attempts and the counter restarts
    /// at one.
    fn bump_generation(&mut self) {
        self.generation = match self.generation.checked_add(1) {
            Some(generation) => generation,
            None => {
                self.visited.fill(0);
                1
            }
        };
    }

    /// Returns true at most once per `(state, position)` pair and
    /// generation; the caller prunes its branch on false.
    #[cfg_attr(feature = "perf-inline", inline(always))]
    fn should_visit(&mut self, sid: StateId, at: usize) -> bool {
        let index = sid.as_usize() * (self.input_len + 1) + at;
        if self.visited[index] == self.generation {
            return false;
        }
        self.visited[index] = self.generation;
        true
    }
}

impl Default for Cache {
    fn default() -> Cache {
        Cache::new()
    }
}
