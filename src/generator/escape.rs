//! Python string-literal escaping (spec.md §4.3.2: "double-quoted with
//! standard escape table").

/// Escapes `s` for inclusion inside a double-quoted Python string literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_string(r#"say "hi"\n"#), r#"say \"hi\"\\n"#);
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_string("a\nb\tc"), "a\\nb\\tc");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(escape_string("hello world"), "hello world");
    }
}
