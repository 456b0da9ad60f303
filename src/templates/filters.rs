//! Custom MiniJinja filters for Go generation

use crate::util;
use minijinja::Environment;

/// Register all custom filters with the environment
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("go_doc", go_doc);
    env.add_filter("snake_case", filter_snake_case);
}

fn filter_snake_case(value: &str) -> String {
    util::to_snake_case(value)
}

/// Wrap text into `//` comment lines of at most `width` columns. Blank lines
/// in the input become bare `//` lines; the result has no trailing newline.
fn go_doc(value: &str, width: Option<usize>) -> String {
    let width = width.unwrap_or(77);
    let mut lines = Vec::new();
    for paragraph in value.trim().split('\n') {
        let mut line = String::from("//");
        for word in paragraph.split_whitespace() {
            if line.len() > 2 && line.len() + 1 + word.len() > width {
                lines.push(std::mem::replace(&mut line, String::from("//")));
            }
            line.push(' ');
            line.push_str(word);
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_doc_wraps() {
        let doc = go_doc("one two three four", Some(12));
        assert_eq!(doc, "// one two\n// three\n// four");
    }

    #[test]
    fn test_go_doc_keeps_blank_lines() {
        assert_eq!(go_doc("a\n\nb\n", None), "// a\n//\n// b");
    }
}
