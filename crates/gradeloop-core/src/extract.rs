//! Locating a JSON object inside free-form oracle output.

/// Return the first balanced `{...}` region of `text`, or `None`.
///
/// Braces inside double-quoted strings are ignored, and a backslash inside a
/// string escapes the character that follows it. Surrounding prose, markdown
/// fences and trailing commentary are skipped. A `}` seen before any `{` is
/// ignored rather than treated as an error, so `oops } {"ok": true}` still
/// yields the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = None;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_between_prose() {
        let input = r#"Sure! Here is my verdict: {"covered": ["a"], "missed": []} Hope it helps."#;
        assert_eq!(
            extract_json_object(input),
            Some(r#"{"covered": ["a"], "missed": []}"#)
        );
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let input = r#"result -> {"covered": ["uses {} for blocks"], "missed": ["closing }"]} end"#;
        assert_eq!(
            extract_json_object(input),
            Some(r#"{"covered": ["uses {} for blocks"], "missed": ["closing }"]}"#)
        );
    }

    #[test]
    fn handles_escaped_quotes() {
        let input = r#"{"covered": ["said \"hi {\""], "missed": []}"#;
        assert_eq!(extract_json_object(input), Some(input));
    }

    #[test]
    fn handles_nested_objects() {
        let input = "```json\n{\"a\": {\"b\": {}}, \"c\": 1}\n```";
        assert_eq!(
            extract_json_object(input),
            Some("{\"a\": {\"b\": {}}, \"c\": 1}")
        );
    }

    #[test]
    fn returns_first_object_only() {
        let input = r#"{"first": 1} and {"second": 2}"#;
        assert_eq!(extract_json_object(input), Some(r#"{"first": 1}"#));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn unbalanced_object_yields_none() {
        assert_eq!(extract_json_object(r#"{"covered": ["a"]"#), None);
    }

    #[test]
    fn stray_closing_brace_before_object_is_ignored() {
        let input = r#"oops } then {"ok": true}"#;
        assert_eq!(extract_json_object(input), Some(r#"{"ok": true}"#));
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let input = "Ответ: {\"covered\": [\"владение\"], \"missed\": []} ✓";
        assert_eq!(
            extract_json_object(input),
            Some("{\"covered\": [\"владение\"], \"missed\": []}")
        );
    }
}
