//! Small text helpers shared by error messages.

/// Longest template excerpt shown in a one-line error message.
pub const MAX_EXCERPT_LENGTH: usize = 200;

/// Join items as an English list: `a`, `a and b`, `a, b and c`.
///
/// ```
/// use garden_error_reporting::natural_list;
///
/// assert_eq!(natural_list(&["foo", "bar", "baz"]), "foo, bar and baz");
/// ```
pub fn natural_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|s| s.as_ref()).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Replace line breaks with a literal `\n` so a value fits on one line.
pub fn escape_newlines(s: &str) -> String {
    s.replace("\r\n", "\\n").replace('\n', "\\n")
}

/// Cut `s` to at most `max` characters, appending `...` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
