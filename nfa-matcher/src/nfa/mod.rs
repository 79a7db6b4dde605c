/*!
The NFA data model shared by every matching engine in this crate.

An NFA here is a sequence of [`State`]s addressed by dense [`StateId`]s.
Conceptually it is a graph, but in practice it reads best as a program for a
virtual machine: each state says what to do and where to go next. The
[`thompson`] module compiles a `regex-syntax` `Hir` into this form;
[`Builder`] permits assembling one by hand.
*/

use std::{fmt, sync::Arc};

use crate::util::look::Look;

pub mod backtrack;
#[cfg(feature = "syntax")]
pub mod thompson;

/// The identifier of an NFA state.
///
/// Identifiers are dense: an NFA with `n` states uses exactly the
/// identifiers `0..n`. Instead of pointers between states, states name
/// their successors by identifier, which halves the size of the
/// representation on 64-bit targets and makes an NFA trivially immutable
/// and shareable once built.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StateId(u32);

impl StateId {
    /// A sentinel identifier that refers to no state.
    ///
    /// It is used for not-yet-patched transitions during construction. Any
    /// search that reaches it treats the edge as missing and fails that
    /// branch.
    pub const INVALID: StateId = StateId(u32::MAX);

    /// The identifier of the first state.
    pub const ZERO: StateId = StateId(0);

    /// Creates a state identifier from a `usize` index, returning `None`
    /// when the index does not fit (the maximum value is reserved for
    /// [`StateId::INVALID`]).
    pub fn new(id: usize) -> Option<StateId> {
        if id < u32::MAX as usize {
            Some(StateId(id as u32))
        } else {
            None
        }
    }

    #[cfg_attr(feature = "perf-inline", inline(always))]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// A single byte oriented transition: follow `next` after consuming a byte
/// `b` with `lo <= b <= hi`. Both bounds are inclusive.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Transition {
    pub lo: u8,
    pub hi: u8,
    pub next: StateId,
}

impl Transition {
    #[cfg_attr(feature = "perf-inline", inline(always))]
    pub fn matches(&self, byte: u8) -> bool {
        self.lo <= byte && byte <= self.hi
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.lo == self.hi {
            write!(f, "{:?} => {}", self.lo as char, self.next.as_u32())
        } else {
            write!(
                f,
                "{:?}-{:?} => {}",
                self.lo as char,
                self.hi as char,
                self.next.as_u32()
            )
        }
    }
}

/// A state in an NFA.
///
/// States that consume input are byte oriented ([`State::ByteRange`],
/// [`State::Sparse`]) with the exception of the synthetic wildcard states
/// ([`State::RuneAny`], [`State::RuneAnyNotNL`]), which consume one whole
/// UTF-8 encoded codepoint at a time. Everything else is zero-width.
///
/// The order of the successors of a [`State::Split`] is meaningful: under
/// leftmost-first semantics, `left` is explored fully before `right` is
/// considered. The compiler establishes this ordering (greedy before lazy,
/// earlier alternatives before later ones) and the engines take it on
/// faith.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// Consumes one byte in an inclusive range.
    ByteRange { trans: Transition },
    /// Consumes one byte, following the first transition whose range
    /// contains it. The transitions are ordered and non-overlapping.
    Sparse { transitions: Vec<Transition> },
    /// Zero-width nondeterministic branch; `left` is preferred.
    Split { left: StateId, right: StateId },
    /// Zero-width unconditional transition.
    Epsilon { next: StateId },
    /// Zero-width transition that records the current position in capture
    /// slot `slot` of group `group` when submatch tracking is active.
    /// Engines without submatch tracking just follow `next`.
    Capture { group: u32, slot: u32, next: StateId },
    /// Zero-width transition gated on a look-around assertion.
    Look { look: Look, next: StateId },
    /// Consumes one whole UTF-8 encoded codepoint, `\n` included.
    RuneAny { next: StateId },
    /// Consumes one whole UTF-8 encoded codepoint other than `\n`.
    RuneAnyNotNL { next: StateId },
    /// A dead state: no match can be found from here.
    Fail,
    /// An accepting state.
    Match,
}

/// A byte oriented Thompson non-deterministic finite automaton (NFA).
///
/// An NFA is immutable once built. Searching is delegated to engines that
/// borrow it, such as the
/// [`BoundedBacktracker`](backtrack::BoundedBacktracker) or the scanner
/// installed by the [char class fast path](crate::charclass).
///
/// # Cheap clones
///
/// Engines want to hang on to an NFA for use during search time, and
/// several engines may share one automaton. Because of this, an NFA uses
/// reference counting internally, so it is cheap to clone and it is
/// encouraged to do so.
#[derive(Clone)]
pub struct NFA(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    states: Vec<State>,
    start_anchored: StateId,
    start_unanchored: StateId,
    utf8: bool,
    capture_count: u32,
}

impl NFA {
    /// Returns an NFA that matches the empty string at every position.
    pub fn always_match() -> NFA {
        let mut builder = Builder::new();
        let sid = builder.push(State::Match).unwrap();
        builder.set_starts(sid, sid);
        builder.finish().unwrap()
    }

    /// Returns an NFA that never matches at any position.
    pub fn never_match() -> NFA {
        let mut builder = Builder::new();
        let sid = builder.push(State::Fail).unwrap();
        builder.set_starts(sid, sid);
        builder.finish().unwrap()
    }

    /// Returns the number of states in this NFA.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.states.is_empty()
    }

    /// Returns the state with the given identifier, or `None` when the
    /// identifier is out of range (including [`StateId::INVALID`]).
    #[cfg_attr(feature = "perf-inline", inline(always))]
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.0.states.get(id.as_usize())
    }

    /// Returns a slice of all states, indexed by `StateId`.
    #[inline]
    pub fn states(&self) -> &[State] {
        &self.0.states
    }

    /// Returns an iterator over all states along with their identifiers.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.0
            .states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateId(i as u32), state))
    }

    /// The state searches start from when the match must begin exactly at
    /// the position the search starts at.
    #[inline]
    pub fn start_anchored(&self) -> StateId {
        self.0.start_anchored
    }

    /// The state searches start from when a match may begin anywhere at or
    /// after the position the search starts at. When the compiler adds an
    /// unanchored prefix, this points at it; otherwise it coincides with
    /// [`NFA::start_anchored`].
    #[inline]
    pub fn start_unanchored(&self) -> StateId {
        self.0.start_unanchored
    }

    /// Returns true when this NFA only matches at the position a search
    /// starts at, that is, when both start states coincide because no
    /// unanchored prefix was compiled in.
    #[inline]
    pub fn is_anchored(&self) -> bool {
        self.0.start_anchored == self.0.start_unanchored
    }

    /// Returns true when this NFA was compiled for UTF-8 haystacks. This
    /// governs how engines step over empty matches; it does not make
    /// searches validate their input.
    #[inline]
    pub fn is_utf8(&self) -> bool {
        self.0.utf8
    }

    /// Returns the number of capture groups compiled into this NFA,
    /// including the implicit group for the overall match. The engines in
    /// this crate only use this structurally; none of them report
    /// submatches.
    #[inline]
    pub fn capture_count(&self) -> usize {
        self.0.capture_count as usize
    }
}

impl fmt::Debug for NFA {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "NFA(")?;
        for (sid, state) in self.iter() {
            let anchored = if sid == self.start_anchored() { ">" } else { " " };
            let unanchored =
                if sid == self.start_unanchored() { "^" } else { " " };
            writeln!(f, "{}{}{:06}: {:?}", anchored, unanchored, sid.as_u32(), state)?;
        }
        writeln!(f, ")")
    }
}

/// An error that can occur while building an NFA or a matcher.
///
/// Errors only happen at construction time. The search hot path never
/// produces one: an oversized haystack or an absent match is expressed
/// through the regular `bool`/`Option` returns.
#[derive(Clone, Debug)]
pub struct BuildError {
    kind: BuildErrorKind,
}

#[derive(Clone, Debug)]
enum BuildErrorKind {
    /// The pattern could not be parsed.
    #[cfg(feature = "syntax")]
    Syntax(regex_syntax::Error),
    /// The pattern needs more states than identifiers exist.
    TooManyStates(usize),
    /// The pattern uses a feature this crate does not implement.
    Unsupported(&'static str),
    /// The NFA handed to a matcher violates the construction contract.
    Nfa(&'static str),
}

impl BuildError {
    #[cfg(feature = "syntax")]
    pub(crate) fn syntax(err: regex_syntax::Error) -> BuildError {
        BuildError { kind: BuildErrorKind::Syntax(err) }
    }

    pub(crate) fn too_many_states(given: usize) -> BuildError {
        BuildError { kind: BuildErrorKind::TooManyStates(given) }
    }

    pub(crate) fn unsupported(what: &'static str) -> BuildError {
        BuildError { kind: BuildErrorKind::Unsupported(what) }
    }

    pub(crate) fn nfa(what: &'static str) -> BuildError {
        BuildError { kind: BuildErrorKind::Nfa(what) }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            #[cfg(feature = "syntax")]
            BuildErrorKind::Syntax(ref err) => err.fmt(f),
            BuildErrorKind::TooManyStates(given) => write!(
                f,
                "pattern needs {} states, more than state identifiers exist",
                given,
            ),
            BuildErrorKind::Unsupported(what) => {
                write!(f, "unsupported pattern feature: {}", what)
            }
            BuildErrorKind::Nfa(what) => write!(f, "malformed NFA: {}", what),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            #[cfg(feature = "syntax")]
            BuildErrorKind::Syntax(ref err) => Some(err),
            _ => None,
        }
    }
}

/// An incremental builder for hand-assembling an [`NFA`].
///
/// States are pushed one at a time and may name successors that do not
/// exist yet, [`StateId::INVALID`] included; [`Builder::state_mut`] permits
/// patching them afterwards. [`Builder::finish`] checks the construction
/// contract: both start states must be valid identifiers.
///
/// # Example
///
/// An automaton for `a+`, hand assembled:
///
/// ```
/// use nfa_matcher::nfa::{Builder, State, StateId, Transition};
///
/// let mut builder = Builder::new();
/// let one = builder.push(State::ByteRange {
///     trans: Transition { lo: b'a', hi: b'a', next: StateId::INVALID },
/// })?;
/// let more = builder.push(State::Split { left: one, right: StateId::INVALID })?;
/// let done = builder.push(State::Match)?;
/// *builder.state_mut(one).unwrap() = State::ByteRange {
///     trans: Transition { lo: b'a', hi: b'a', next: more },
/// };
/// *builder.state_mut(more).unwrap() = State::Split { left: one, right: done };
/// builder.set_starts(one, one);
/// let nfa = builder.finish()?;
/// assert_eq!(nfa.len(), 3);
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    states: Vec<State>,
    start_anchored: StateId,
    start_unanchored: StateId,
    utf8: bool,
    capture_count: u32,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            states: vec![],
            start_anchored: StateId::INVALID,
            start_unanchored: StateId::INVALID,
            utf8: false,
            capture_count: 0,
        }
    }

    /// Adds a state and returns its identifier.
    pub fn push(&mut self, state: State) -> Result<StateId, BuildError> {
        let sid = StateId::new(self.states.len())
            .ok_or_else(|| BuildError::too_many_states(self.states.len() + 1))?;
        self.states.push(state);
        Ok(sid)
    }

    /// Returns a mutable borrow of a previously pushed state, for patching
    /// transitions.
    pub fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id.as_usize())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Sets the anchored and unanchored start states. Passing the same
    /// identifier twice marks the resulting NFA as anchored.
    pub fn set_starts(&mut self, anchored: StateId, unanchored: StateId) {
        self.start_anchored = anchored;
        self.start_unanchored = unanchored;
    }

    /// Marks the resulting NFA as compiled for UTF-8 haystacks.
    pub fn set_utf8(&mut self, yes: bool) {
        self.utf8 = yes;
    }

    /// Records the number of capture groups, including the implicit
    /// overall group.
    pub fn set_capture_count(&mut self, count: u32) {
        self.capture_count = count;
    }

    /// Finalizes construction and returns an immutable [`NFA`].
    pub fn finish(self) -> Result<NFA, BuildError> {
        let len = self.states.len();
        if self.start_anchored.as_usize() >= len {
            return Err(BuildError::nfa("anchored start is not a valid state"));
        }
        if self.start_unanchored.as_usize() >= len {
            return Err(BuildError::nfa("unanchored start is not a valid state"));
        }
        Ok(NFA(Arc::new(Inner {
            states: self.states,
            start_anchored: self.start_anchored,
            start_unanchored: self.start_unanchored,
            utf8: self.utf8,
            capture_count: self.capture_count,
        })))
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}
