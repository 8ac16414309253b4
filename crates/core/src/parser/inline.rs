//! Inline code span detection shared by the line scanners.

use std::ops::Range;

/// Byte ranges of backtick code spans on a single line.
pub(crate) fn code_spans(line: &str) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open_start;

        // Find a closing run of the same length
        let mut j = i;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close_start = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - close_start == run {
                    closed = Some(j);
                    break;
                }
            } else {
                j += 1;
            }
        }

        match closed {
            Some(end) => {
                spans.push(open_start..end);
                i = end;
            }
            None => break,
        }
    }

    spans
}

pub(crate) fn in_spans(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|r| r.contains(&pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_and_double_backtick_spans() {
        let line = "a `b` c ``d ` e`` f";
        assert_eq!(code_spans(line), vec![2..5, 8..17]);
    }

    #[test]
    fn unclosed_backticks_are_literal() {
        assert!(code_spans("a `b c").is_empty());
    }
}
