//! Validation tag parsing.
//!
//! A tag is a comma separated list of rule terms. Each term is either a bare
//! rule name (`request`) or `name=argument` (`max=1000`); only the first `=`
//! splits, so the argument may itself contain `=`. There is no escaping, so
//! an argument can never contain a comma.

use smallvec::SmallVec;

/// Separates rule terms.
pub const RULE_SEPARATOR: char = ',';
/// Separates a rule name from its argument.
pub const ARG_SEPARATOR: char = '=';

/// A decoded rule term borrowed from its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule<'a> {
    pub name: &'a str,
    pub arg: Option<&'a str>,
}

impl<'a> Rule<'a> {
    /// Argument passed to the rule function; a bare rule gets `""`.
    pub fn arg_or_empty(&self) -> &'a str {
        self.arg.unwrap_or("")
    }
}

/// Parse a tag into its rule terms, in tag order.
///
/// Whitespace around names and arguments is trimmed and empty terms
/// (`"min=1,,max=2"`, a trailing comma) are dropped.
pub fn parse_rules(tag: &str) -> SmallVec<[Rule<'_>; 4]> {
    tag.split(RULE_SEPARATOR)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| match term.split_once(ARG_SEPARATOR) {
            Some((name, arg)) => Rule {
                name: name.trim(),
                arg: Some(arg.trim()),
            },
            None => Rule {
                name: term,
                arg: None,
            },
        })
        .collect()
}
