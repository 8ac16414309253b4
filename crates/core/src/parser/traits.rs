//! Inline trait annotations: `@name` and `@name(value)`.

use std::sync::LazyLock;

use regex::Regex;

use super::inline::{code_spans, in_spans};

// `@` must start the line or follow whitespace or a list marker
static TRAIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s\-\*])@(\w+)(?:\s*\(([^)]*)\))?").unwrap()
});

/// A trait annotation found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitMatch {
    pub name: String,
    pub value: Option<String>,
    /// Byte range of the whole match, including any prefix character.
    pub start: usize,
    pub end: usize,
    pub prefix: Option<char>,
    /// Trimmed text after the annotation.
    pub content: String,
}

/// Find trait annotations on a line, ignoring inline code.
pub fn find_traits(line: &str) -> Vec<TraitMatch> {
    let spans = code_spans(line);
    let mut out = Vec::new();

    for caps in TRAIT_RE.captures_iter(line) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // position of '@'
        let at = name.start() - 1;
        if in_spans(&spans, at) {
            continue;
        }

        let prefix = line[whole.start()..at].chars().next();
        let value = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty());

        out.push(TraitMatch {
            name: name.as_str().to_string(),
            value,
            start: whole.start(),
            end: whole.end(),
            prefix,
            content: line[whole.end()..].trim().to_string(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("@task", "task", None, None)]
    #[case("- @task(todo) buy milk", "task", Some("todo"), Some(' '))]
    #[case("*@due (2026-02-14)", "due", Some("2026-02-14"), Some('*'))]
    #[case("Call @done()", "done", None, Some(' '))]
    fn parses_annotation(
        #[case] line: &str,
        #[case] name: &str,
        #[case] value: Option<&str>,
        #[case] prefix: Option<char>,
    ) {
        let found = find_traits(line);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, name);
        assert_eq!(found[0].value.as_deref(), value);
        assert_eq!(found[0].prefix, prefix);
    }

    #[test]
    fn span_covers_prefix_and_value() {
        let line = "- @task(todo) buy milk";
        let t = &find_traits(line)[0];
        assert_eq!(&line[t.start..t.end], " @task(todo)");
        assert_eq!(t.content, "buy milk");
    }

    #[test]
    fn ignores_emails_and_inline_code() {
        assert!(find_traits("mail me@example.com").is_empty());
        assert!(find_traits("use `@task` syntax").is_empty());
    }

    #[test]
    fn multiple_on_one_line() {
        let found = find_traits("- @task(todo) @due(2026-03-01)");
        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["task", "due"]);
    }

    #[test]
    fn value_stops_at_first_closing_paren() {
        let t = &find_traits("@note(a (b) c)")[0];
        assert_eq!(t.value.as_deref(), Some("a (b"));
        assert_eq!(t.content, "c)");
    }
}
