/*!
Compiles a [`regex_syntax::hir::Hir`] into an [`NFA`].

The construction is the classic Thompson one: every sub-expression becomes a
fragment with one entry state and a list of dangling transitions, and
combinators wire fragments together by patching those transitions. The
output contract matters more than the construction itself: dense state ids,
a reachable [`State::Match`] from the anchored start, split operands ordered
so that the preferred branch comes first, and wildcard states only when
multi-byte matching is wanted.
*/

use itertools::Itertools;
use regex_syntax::{
    hir::{self, Class, Hir, HirKind},
    utf8::{Utf8Sequence, Utf8Sequences},
};

use crate::{
    nfa::{BuildError, Builder, NFA, State, StateId, Transition},
    util::{look::Look, syntax},
};

/// The configuration used for compiling a Thompson NFA.
#[derive(Clone, Debug, Default)]
pub struct Config {
    utf8: Option<bool>,
    unanchored_prefix: Option<bool>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Whether to compile for UTF-8 haystacks. Enabled by default.
    ///
    /// When enabled, wildcard sub-expressions become codepoint oriented
    /// states and engines step over empty matches one codepoint at a time.
    /// When disabled, wildcards consume single bytes.
    pub fn utf8(mut self, yes: bool) -> Config {
        self.utf8 = Some(yes);
        self
    }

    /// Whether to compile an unanchored prefix into the NFA. Enabled by
    /// default.
    ///
    /// The prefix is a lazy self-loop that consumes input until the rest of
    /// the pattern can start, giving engines that run from
    /// [`NFA::start_unanchored`] leftmost semantics without an outer scan
    /// loop. Disabling it makes both start states coincide, which marks the
    /// NFA [anchored](NFA::is_anchored).
    pub fn unanchored_prefix(mut self, yes: bool) -> Config {
        self.unanchored_prefix = Some(yes);
        self
    }

    pub fn get_utf8(&self) -> bool {
        self.utf8.unwrap_or(true)
    }

    pub fn get_unanchored_prefix(&self) -> bool {
        self.unanchored_prefix.unwrap_or(true)
    }
}

/// A compiler from `Hir` values (or pattern strings) to NFAs.
///
/// # Example
///
/// ```
/// use nfa_matcher::nfa::thompson;
///
/// let nfa = thompson::Compiler::new().build("[a-z]+")?;
/// assert!(!nfa.is_anchored());
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    config: Config,
    syntax: syntax::Config,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler { config: Config::new(), syntax: syntax::Config::new() }
    }

    /// Apply the given compiler configuration.
    pub fn configure(&mut self, config: Config) -> &mut Compiler {
        self.config = config;
        self
    }

    /// Set the syntax configuration used by [`Compiler::build`] when
    /// parsing a pattern string. It has no effect on
    /// [`Compiler::build_from_hir`].
    pub fn syntax(&mut self, config: syntax::Config) -> &mut Compiler {
        self.syntax = config;
        self
    }

    /// Parse the pattern and compile it.
    pub fn build(&self, pattern: &str) -> Result<NFA, BuildError> {
        let hir = self.syntax.parse(pattern).map_err(BuildError::syntax)?;
        self.build_from_hir(&hir)
    }

    /// Compile an already parsed `Hir`.
    pub fn build_from_hir(&self, hir: &Hir) -> Result<NFA, BuildError> {
        CompilerI {
            config: &self.config,
            builder: Builder::new(),
            capture_count: 1,
        }
        .compile(hir)
    }
}

/// A sub-automaton under construction: an entry state plus the transitions
/// that still dangle and must be patched to whatever comes next.
struct Frag {
    start: StateId,
    holes: Vec<Hole>,
}

/// A single patchable slot in a previously pushed state.
#[derive(Clone, Copy)]
enum Hole {
    /// The `next` of a single-successor state. On a sparse state this
    /// patches every transition, so the compiler only leaves this hole on
    /// sparse states whose ranges all share one successor.
    Next(StateId),
    SplitLeft(StateId),
    SplitRight(StateId),
}

struct CompilerI<'a> {
    config: &'a Config,
    builder: Builder,
    capture_count: u32,
}

impl CompilerI<'_> {
    fn compile(mut self, hir: &Hir) -> Result<NFA, BuildError> {
        let open = self.push(State::Capture {
            group: 0,
            slot: 0,
            next: StateId::INVALID,
        })?;
        let frag = self.c(hir)?;
        self.patch(Hole::Next(open), frag.start);
        let close = self.push(State::Capture {
            group: 0,
            slot: 1,
            next: StateId::INVALID,
        })?;
        self.patch_all(&frag.holes, close);
        let matched = self.push(State::Match)?;
        self.patch(Hole::Next(close), matched);

        let start_anchored = open;
        let start_unanchored = if self.config.get_unanchored_prefix() {
            // A lazy `(?s:.)*?` loop: prefer entering the pattern, consume
            // one more codepoint (or byte) otherwise.
            let split = self.push(State::Split {
                left: start_anchored,
                right: StateId::INVALID,
            })?;
            let any = if self.config.get_utf8() {
                self.push(State::RuneAny { next: split })?
            } else {
                self.push(State::ByteRange {
                    trans: Transition { lo: 0x00, hi: 0xFF, next: split },
                })?
            };
            self.patch(Hole::SplitRight(split), any);
            split
        } else {
            start_anchored
        };

        self.builder.set_starts(start_anchored, start_unanchored);
        self.builder.set_utf8(self.config.get_utf8());
        self.builder.set_capture_count(self.capture_count);
        self.builder.finish()
    }

    fn c(&mut self, hir: &Hir) -> Result<Frag, BuildError> {
        match *hir.kind() {
            HirKind::Empty => self.c_empty(),
            HirKind::Literal(hir::Literal(ref bytes)) => self.c_literal(bytes),
            HirKind::Class(Class::Unicode(ref cls)) => self.c_class_unicode(cls),
            HirKind::Class(Class::Bytes(ref cls)) => self.c_class_bytes(cls),
            HirKind::Look(look) => self.c_look(look),
            HirKind::Repetition(ref rep) => self.c_repetition(rep),
            HirKind::Capture(ref cap) => self.c_capture(cap.index, &cap.sub),
            HirKind::Concat(ref subs) => self.c_concat(subs),
            HirKind::Alternation(ref subs) => self.c_alt(subs),
        }
    }

    fn c_empty(&mut self) -> Result<Frag, BuildError> {
        let sid = self.push(State::Epsilon { next: StateId::INVALID })?;
        Ok(Frag { start: sid, holes: vec![Hole::Next(sid)] })
    }

    fn c_fail(&mut self) -> Result<Frag, BuildError> {
        let sid = self.push(State::Fail)?;
        Ok(Frag { start: sid, holes: vec![] })
    }

    fn c_literal(&mut self, bytes: &[u8]) -> Result<Frag, BuildError> {
        if bytes.is_empty() {
            return self.c_empty();
        }
        let mut ids = Vec::with_capacity(bytes.len());
        for &b in bytes {
            ids.push(self.push(State::ByteRange {
                trans: Transition { lo: b, hi: b, next: StateId::INVALID },
            })?);
        }
        for (&from, &to) in ids.iter().tuple_windows() {
            self.patch(Hole::Next(from), to);
        }
        Ok(Frag {
            start: ids[0],
            holes: vec![Hole::Next(*ids.last().unwrap())],
        })
    }

    fn c_class_unicode(
        &mut self,
        cls: &hir::ClassUnicode,
    ) -> Result<Frag, BuildError> {
        let ranges = cls.ranges();
        if ranges.is_empty() {
            return self.c_fail();
        }
        if let Some(frag) = self.c_dot_shape(ranges)? {
            return Ok(frag);
        }
        if ranges.iter().all(|r| (r.end() as u32) <= 0x7F) {
            let transitions = ranges
                .iter()
                .map(|r| Transition {
                    lo: r.start() as u8,
                    hi: r.end() as u8,
                    next: StateId::INVALID,
                })
                .collect();
            return self.c_byte_ranges(transitions);
        }
        // Multi-byte ranges become an alternation of UTF-8 byte sequences.
        let mut frags = vec![];
        for range in ranges {
            for seq in Utf8Sequences::new(range.start(), range.end()) {
                frags.push(self.c_utf8_seq(&seq)?);
            }
        }
        self.c_alt_frags(frags)
    }

    fn c_class_bytes(
        &mut self,
        cls: &hir::ClassBytes,
    ) -> Result<Frag, BuildError> {
        let ranges = cls.ranges();
        if ranges.is_empty() {
            return self.c_fail();
        }
        let transitions = ranges
            .iter()
            .map(|r| Transition {
                lo: r.start(),
                hi: r.end(),
                next: StateId::INVALID,
            })
            .collect();
        self.c_byte_ranges(transitions)
    }

    /// Recognizes the two class shapes that `.` desugars to and compiles
    /// them to a single wildcard state instead of a pile of byte ranges.
    fn c_dot_shape(
        &mut self,
        ranges: &[hir::ClassUnicodeRange],
    ) -> Result<Option<Frag>, BuildError> {
        let any = ranges.len() == 1
            && ranges[0].start() == '\0'
            && ranges[0].end() == '\u{10FFFF}';
        if any {
            let sid = self.push(State::RuneAny { next: StateId::INVALID })?;
            return Ok(Some(Frag { start: sid, holes: vec![Hole::Next(sid)] }));
        }
        let any_not_nl = ranges.len() == 2
            && ranges[0].start() == '\0'
            && ranges[0].end() == '\u{0009}'
            && ranges[1].start() == '\u{000B}'
            && ranges[1].end() == '\u{10FFFF}';
        if any_not_nl {
            let sid =
                self.push(State::RuneAnyNotNL { next: StateId::INVALID })?;
            return Ok(Some(Frag { start: sid, holes: vec![Hole::Next(sid)] }));
        }
        Ok(None)
    }

    fn c_byte_ranges(
        &mut self,
        transitions: Vec<Transition>,
    ) -> Result<Frag, BuildError> {
        let sid = if transitions.len() == 1 {
            self.push(State::ByteRange { trans: transitions[0] })?
        } else {
            self.push(State::Sparse { transitions })?
        };
        Ok(Frag { start: sid, holes: vec![Hole::Next(sid)] })
    }

    fn c_utf8_seq(&mut self, seq: &Utf8Sequence) -> Result<Frag, BuildError> {
        let mut ids = Vec::with_capacity(4);
        for range in seq.as_slice() {
            ids.push(self.push(State::ByteRange {
                trans: Transition {
                    lo: range.start,
                    hi: range.end,
                    next: StateId::INVALID,
                },
            })?);
        }
        for (&from, &to) in ids.iter().tuple_windows() {
            self.patch(Hole::Next(from), to);
        }
        Ok(Frag {
            start: ids[0],
            holes: vec![Hole::Next(*ids.last().unwrap())],
        })
    }

    fn c_look(&mut self, look: hir::Look) -> Result<Frag, BuildError> {
        let look = match look {
            hir::Look::Start => Look::Start,
            hir::Look::End => Look::End,
            hir::Look::StartLF => Look::StartLine,
            hir::Look::EndLF => Look::EndLine,
            hir::Look::WordAscii | hir::Look::WordUnicode => {
                Look::WordBoundary
            }
            hir::Look::WordAsciiNegate | hir::Look::WordUnicodeNegate => {
                Look::WordBoundaryNegate
            }
            _ => {
                return Err(BuildError::unsupported(
                    "CRLF-aware or half word boundary assertions",
                ))
            }
        };
        let sid = self.push(State::Look { look, next: StateId::INVALID })?;
        Ok(Frag { start: sid, holes: vec![Hole::Next(sid)] })
    }

    fn c_repetition(
        &mut self,
        rep: &hir::Repetition,
    ) -> Result<Frag, BuildError> {
        let greedy = rep.greedy;
        match (rep.min, rep.max) {
            (0, Some(0)) => self.c_empty(),
            (0, Some(1)) => {
                let frag = self.c(&rep.sub)?;
                self.wrap_question(frag, greedy)
            }
            (0, None) => self.c_star(&rep.sub, greedy),
            (1, None) => self.c_plus(&rep.sub, greedy),
            (min, None) => {
                let mut head = Vec::with_capacity(min as usize - 1);
                for _ in 0..min - 1 {
                    head.push(self.c(&rep.sub)?);
                }
                let tail = self.c_plus(&rep.sub, greedy)?;
                head.push(tail);
                self.c_concat_frags(head)
            }
            (min, Some(max)) => {
                debug_assert!(min <= max);
                // `e{2,4}` is `e e (e (e)?)?`: after the mandatory copies,
                // each optional copy nests so that matching can stop at any
                // depth.
                let mut opt: Option<Frag> = None;
                for _ in 0..max - min {
                    let body = self.c(&rep.sub)?;
                    let tail = match opt {
                        None => body,
                        Some(rest) => {
                            self.patch_all(&body.holes, rest.start);
                            Frag { start: body.start, holes: rest.holes }
                        }
                    };
                    opt = Some(self.wrap_question(tail, greedy)?);
                }
                let mut frags = Vec::with_capacity(min as usize + 1);
                for _ in 0..min {
                    frags.push(self.c(&rep.sub)?);
                }
                frags.extend(opt);
                self.c_concat_frags(frags)
            }
        }
    }

    /// Makes an already-compiled fragment optional.
    fn wrap_question(
        &mut self,
        frag: Frag,
        greedy: bool,
    ) -> Result<Frag, BuildError> {
        let split = self.push(State::Split {
            left: StateId::INVALID,
            right: StateId::INVALID,
        })?;
        let mut holes = frag.holes;
        if greedy {
            self.patch(Hole::SplitLeft(split), frag.start);
            holes.push(Hole::SplitRight(split));
        } else {
            self.patch(Hole::SplitRight(split), frag.start);
            holes.push(Hole::SplitLeft(split));
        }
        Ok(Frag { start: split, holes })
    }

    fn c_star(&mut self, sub: &Hir, greedy: bool) -> Result<Frag, BuildError> {
        let split = self.push(State::Split {
            left: StateId::INVALID,
            right: StateId::INVALID,
        })?;
        let body = self.c(sub)?;
        self.patch_all(&body.holes, split);
        let hole = if greedy {
            self.patch(Hole::SplitLeft(split), body.start);
            Hole::SplitRight(split)
        } else {
            self.patch(Hole::SplitRight(split), body.start);
            Hole::SplitLeft(split)
        };
        Ok(Frag { start: split, holes: vec![hole] })
    }

    fn c_plus(&mut self, sub: &Hir, greedy: bool) -> Result<Frag, BuildError> {
        let body = self.c(sub)?;
        let split = self.push(State::Split {
            left: StateId::INVALID,
            right: StateId::INVALID,
        })?;
        self.patch_all(&body.holes, split);
        let hole = if greedy {
            self.patch(Hole::SplitLeft(split), body.start);
            Hole::SplitRight(split)
        } else {
            self.patch(Hole::SplitRight(split), body.start);
            Hole::SplitLeft(split)
        };
        Ok(Frag { start: body.start, holes: vec![hole] })
    }

    fn c_capture(
        &mut self,
        index: u32,
        sub: &Hir,
    ) -> Result<Frag, BuildError> {
        let open = self.push(State::Capture {
            group: index,
            slot: index.saturating_mul(2),
            next: StateId::INVALID,
        })?;
        let body = self.c(sub)?;
        self.patch(Hole::Next(open), body.start);
        let close = self.push(State::Capture {
            group: index,
            slot: index.saturating_mul(2).saturating_add(1),
            next: StateId::INVALID,
        })?;
        self.patch_all(&body.holes, close);
        self.capture_count = self.capture_count.max(index + 1);
        Ok(Frag { start: open, holes: vec![Hole::Next(close)] })
    }

    fn c_concat(&mut self, subs: &[Hir]) -> Result<Frag, BuildError> {
        let mut frags = Vec::with_capacity(subs.len());
        for sub in subs {
            frags.push(self.c(sub)?);
        }
        self.c_concat_frags(frags)
    }

    fn c_concat_frags(
        &mut self,
        frags: Vec<Frag>,
    ) -> Result<Frag, BuildError> {
        let mut iter = frags.into_iter();
        let Some(mut acc) = iter.next() else {
            return self.c_empty();
        };
        for frag in iter {
            self.patch_all(&acc.holes, frag.start);
            acc = Frag { start: acc.start, holes: frag.holes };
        }
        Ok(acc)
    }

    fn c_alt(&mut self, subs: &[Hir]) -> Result<Frag, BuildError> {
        let mut frags = Vec::with_capacity(subs.len());
        for sub in subs {
            frags.push(self.c(sub)?);
        }
        self.c_alt_frags(frags)
    }

    fn c_alt_frags(&mut self, mut frags: Vec<Frag>) -> Result<Frag, BuildError> {
        let Some(mut acc) = frags.pop() else {
            return self.c_fail();
        };
        // Fold from the back so that earlier alternatives end up on the
        // preferred side of each split.
        while let Some(frag) = frags.pop() {
            let split = self.push(State::Split {
                left: frag.start,
                right: acc.start,
            })?;
            let mut holes = frag.holes;
            holes.extend(acc.holes);
            acc = Frag { start: split, holes };
        }
        Ok(acc)
    }

    fn push(&mut self, state: State) -> Result<StateId, BuildError> {
        self.builder.push(state)
    }

    fn patch_all(&mut self, holes: &[Hole], to: StateId) {
        for &hole in holes {
            self.patch(hole, to);
        }
    }

    fn patch(&mut self, hole: Hole, to: StateId) {
        match hole {
            Hole::Next(sid) => match self.builder.state_mut(sid) {
                Some(State::ByteRange { trans }) => trans.next = to,
                Some(State::Sparse { transitions }) => {
                    for t in transitions.iter_mut() {
                        t.next = to;
                    }
                }
                Some(State::Epsilon { next })
                | Some(State::Capture { next, .. })
                | Some(State::Look { next, .. })
                | Some(State::RuneAny { next })
                | Some(State::RuneAnyNotNL { next }) => *next = to,
                _ => unreachable!("hole on a state without a next slot"),
            },
            Hole::SplitLeft(sid) => match self.builder.state_mut(sid) {
                Some(State::Split { left, .. }) => *left = to,
                _ => unreachable!("left hole on a non-split state"),
            },
            Hole::SplitRight(sid) => match self.builder.state_mut(sid) {
                Some(State::Split { right, .. }) => *right = to,
                _ => unreachable!("right hole on a non-split state"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_kind(nfa: &NFA, pred: impl Fn(&State) -> bool) -> usize {
        nfa.states().iter().filter(|s| pred(s)).count()
    }

    #[test]
    fn literal_shape() {
        let nfa = Compiler::new().build("ab").unwrap();
        // Two byte states, the capture pair, the match state and the two
        // prefix states.
        assert_eq!(nfa.len(), 7);
        assert!(!nfa.is_anchored());
        assert!(nfa.is_utf8());
        assert_eq!(nfa.capture_count(), 1);

        let nfa = Compiler::new()
            .configure(Config::new().unanchored_prefix(false))
            .build("ab")
            .unwrap();
        assert_eq!(nfa.len(), 5);
        assert!(nfa.is_anchored());
        assert_eq!(nfa.start_anchored(), nfa.start_unanchored());
    }

    #[test]
    fn byte_mode_prefix() {
        let nfa = Compiler::new()
            .configure(Config::new().utf8(false))
            .build("a")
            .unwrap();
        assert!(!nfa.is_utf8());
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::RuneAny { .. })), 0);
        assert_eq!(
            count_kind(
                &nfa,
                |s| matches!(
                    s,
                    State::ByteRange { trans: Transition { lo: 0x00, hi: 0xFF, .. } }
                )
            ),
            1,
        );
    }

    #[test]
    fn dot_becomes_wildcard_state() {
        let nfa = Compiler::new().build(".").unwrap();
        assert_eq!(
            count_kind(&nfa, |s| matches!(s, State::RuneAnyNotNL { .. })),
            1,
        );

        let nfa = Compiler::new().build("(?s).").unwrap();
        // One for the dot, one for the unanchored prefix.
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::RuneAny { .. })), 2);
    }

    #[test]
    fn class_shapes() {
        let nfa = Compiler::new()
            .configure(Config::new().unanchored_prefix(false))
            .build("[a-z]")
            .unwrap();
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::ByteRange { .. })), 1);

        let nfa = Compiler::new()
            .configure(Config::new().unanchored_prefix(false))
            .build("[a-z0-9]")
            .unwrap();
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::Sparse { .. })), 1);

        // A multi-byte class decomposes into byte ranges, not wildcards.
        let nfa = Compiler::new()
            .configure(Config::new().unanchored_prefix(false))
            .build("[α-ω]")
            .unwrap();
        assert!(count_kind(&nfa, |s| matches!(s, State::ByteRange { .. })) >= 2);
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::RuneAny { .. })), 0);
    }

    #[test]
    fn look_mapping() {
        let nfa = Compiler::new().build("^a$").unwrap();
        let looks: Vec<Look> = nfa
            .states()
            .iter()
            .filter_map(|s| match s {
                State::Look { look, .. } => Some(*look),
                _ => None,
            })
            .collect();
        assert_eq!(looks, vec![Look::Start, Look::End]);

        let nfa = Compiler::new().build(r"(?m)^\b$").unwrap();
        let looks: Vec<Look> = nfa
            .states()
            .iter()
            .filter_map(|s| match s {
                State::Look { look, .. } => Some(*look),
                _ => None,
            })
            .collect();
        assert_eq!(
            looks,
            vec![Look::StartLine, Look::WordBoundary, Look::EndLine],
        );
    }

    #[test]
    fn crlf_looks_are_rejected() {
        let err = Compiler::new().build("(?Rm)^foo$").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn capture_counting() {
        let nfa = Compiler::new().build("(a)(b(c))").unwrap();
        assert_eq!(nfa.capture_count(), 4);
        assert_eq!(
            count_kind(&nfa, |s| matches!(s, State::Capture { .. })),
            8,
        );

        let nfa = Compiler::new().build("(?:ab)c").unwrap();
        assert_eq!(nfa.capture_count(), 1);
    }

    #[test]
    fn empty_pattern() {
        let nfa = Compiler::new().build("").unwrap();
        assert!(nfa.len() > 0);
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::Match)), 1);
    }

    #[test]
    fn empty_class_is_dead() {
        // The parser refuses empty classes, but the Hir type can express
        // them and the compiler must not produce a matching automaton.
        let hir = Hir::class(Class::Unicode(hir::ClassUnicode::empty()));
        let nfa = Compiler::new().build_from_hir(&hir).unwrap();
        assert_eq!(count_kind(&nfa, |s| matches!(s, State::Fail)), 1);
    }
}
