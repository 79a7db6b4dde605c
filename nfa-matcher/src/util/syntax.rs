use regex_syntax::{hir::Hir, ParserBuilder};

/// A common set of configuration options that apply to the parsing of a
/// pattern string.
///
/// This is a by-value wrapper around the options of
/// [`regex_syntax::ParserBuilder`] that matter to this crate, so that a
/// configuration can be built up in a single expression and handed to
/// [`Regex::builder`](crate::matcher::Regex::builder) or
/// [`thompson::Compiler::syntax`](crate::nfa::thompson::Compiler::syntax).
///
/// # Example
///
/// ```
/// use nfa_matcher::{matcher::Regex, util::syntax};
///
/// let re = Regex::builder()
///     .syntax(syntax::Config::new().case_insensitive(true))
///     .build("[a-z]+")?;
/// assert!(re.is_match("HELLO"));
///
/// # Ok::<(), nfa_matcher::nfa::BuildError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Config {
    case_insensitive: bool,
    multi_line: bool,
    dot_matches_new_line: bool,
    ignore_whitespace: bool,
    unicode: bool,
}

impl Config {
    pub fn new() -> Config {
        Config {
            case_insensitive: false,
            multi_line: false,
            dot_matches_new_line: false,
            ignore_whitespace: false,
            unicode: true,
        }
    }

    /// Enable case insensitive matching by default, as if `(?i)` were
    /// prefixed to every pattern. Disabled by default.
    pub fn case_insensitive(mut self, yes: bool) -> Config {
        self.case_insensitive = yes;
        self
    }

    /// Enable multi-line mode, which makes `^` and `$` match at line
    /// boundaries instead of only text boundaries. Disabled by default.
    pub fn multi_line(mut self, yes: bool) -> Config {
        self.multi_line = yes;
        self
    }

    /// Make `.` match `\n` as well. Disabled by default.
    pub fn dot_matches_new_line(mut self, yes: bool) -> Config {
        self.dot_matches_new_line = yes;
        self
    }

    /// Enable verbose mode, where whitespace in a pattern is ignored and
    /// `#` starts a comment. Disabled by default.
    pub fn ignore_whitespace(mut self, yes: bool) -> Config {
        self.ignore_whitespace = yes;
        self
    }

    /// Enable Unicode mode. Enabled by default; when disabled, classes like
    /// `\w` and `.` assume their ASCII/byte definitions.
    pub fn unicode(mut self, yes: bool) -> Config {
        self.unicode = yes;
        self
    }

    pub fn get_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn get_multi_line(&self) -> bool {
        self.multi_line
    }

    pub fn get_dot_matches_new_line(&self) -> bool {
        self.dot_matches_new_line
    }

    pub fn get_ignore_whitespace(&self) -> bool {
        self.ignore_whitespace
    }

    pub fn get_unicode(&self) -> bool {
        self.unicode
    }

    /// Parse the given pattern into an `Hir` under this configuration.
    pub(crate) fn parse(&self, pattern: &str) -> Result<Hir, regex_syntax::Error> {
        let mut builder = ParserBuilder::new();
        builder
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .ignore_whitespace(self.ignore_whitespace)
            .unicode(self.unicode)
            .utf8(self.unicode);
        builder.build().parse(pattern)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_respects_flags() {
        let hir = Config::new().parse("a").unwrap();
        assert_eq!(hir, Config::new().case_insensitive(false).parse("a").unwrap());

        let folded = Config::new().case_insensitive(true).parse("a").unwrap();
        assert_ne!(hir, folded);

        assert!(Config::new().parse("a(").is_err());
    }
}
