/*!
A bounded-backtracking regex matcher built on a Thompson-style NFA, with a
byte-table fast path for simple character class patterns.

## Features
- A compact, state-addressable [NFA program representation](nfa) with byte
  ranges, sparse transitions, splits, look-arounds, captures and UTF-8
  wildcard states. NFAs are immutable, cheap to clone and safe to share
  across threads.
- A [bounded backtracker](nfa::backtrack): depth-first matching with a
  `(state, position)` visited table for `O(states * haystack)` worst case
  time, leftmost-first and leftmost-longest semantics, and an explicit
  memory envelope instead of unbounded recursion on hostile inputs. A
  generation counter makes the per-start-position reset a single integer
  increment.
- A [character class fast path](charclass): patterns of exactly the shape
  `[class]+` with ASCII ranges skip NFA construction entirely and run as a
  256-bit table scan.
- A [high level `Regex`](matcher::Regex) that parses patterns with
  [`regex-syntax`](https://docs.rs/regex-syntax) and routes each one to the
  right engine at build time.

## Usage
```
use nfa_matcher::matcher::{Match, Regex};

let re = Regex::new(r"[0-9]+").unwrap();
assert_eq!(re.find("abc123def"), Some(Match::new(3, 6)));
assert_eq!(re.find_iter("1 22 333").count(), 3);
```

Engine-level APIs expose the pieces individually, including searches with
caller-provided state for cross-thread use:

```
use nfa_matcher::{matcher::Match, nfa::backtrack::BoundedBacktracker};

let re = BoundedBacktracker::new(r"\d{3}-\d{4}")?;
let mut cache = re.create_cache();
assert_eq!(re.find_with(&mut cache, "call 555-0123"), Some(Match::new(5, 13)));
# Ok::<(), nfa_matcher::nfa::BuildError>(())
```

## Crate features
- `syntax` (default): pattern string support via `regex-syntax`. Without
  it, automatons are hand assembled with [`nfa::Builder`].
- `perf-inline` (default): aggressive inlining of the search hot path.

## Performance
The backtracker is built for small patterns on small haystacks; its memory
grows with `states * haystack` and it declines inputs past its envelope
(see [`BoundedBacktracker::can_handle`](nfa::backtrack::BoundedBacktracker::can_handle)).
The following `Cargo.toml` settings are recommended if best performance is
desired:
```toml
[profile.release]
lto = "fat"
codegen-units = 1
```
*/

pub mod charclass;
pub mod matcher;
pub mod nfa;
pub mod util;

#[cfg(all(test, feature = "syntax"))]
mod tests {
    use crate::matcher::{Match, Regex};

    #[test]
    fn end_to_end() {
        let re = Regex::new(r"\d+").unwrap();
        assert_eq!(re.find("abc123def"), Some(Match::new(3, 6)));

        let re = Regex::new("foo|bar").unwrap();
        assert_eq!(re.find("the bar is open"), Some(Match::new(4, 7)));

        let re = Regex::new("^hello").unwrap();
        assert!(!re.is_match("say hello"));
        assert!(re.is_match("hello there"));
    }
}
