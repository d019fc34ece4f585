//! Escaping for filtergraph strings.
//!
//! A value inside a filter option goes through two parsers: the option
//! parser (`key=value:key=value`) and then the filtergraph parser
//! (`filter,filter;[label]`). Each level gets its own escaping pass.

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// First level: characters significant to the option parser.
pub fn escape_option_value(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ':'])
}

/// Second level: characters significant to the filtergraph parser.
pub fn escape_graph(value: &str) -> String {
    escape_chars(value, &['\\', '\'', '[', ']', ',', ';'])
}

/// A literal string placed as a filter option value inside a `-vf` graph.
pub fn graph_value(value: &str) -> String {
    escape_graph(&escape_option_value(value))
}

/// `key=value` pairs joined into one filter invocation.
pub struct FilterBuilder {
    name: &'static str,
    options: Vec<(String, String)>,
}

impl FilterBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            options: Vec::new(),
        }
    }

    /// Add an option whose value is already valid filter syntax (numbers,
    /// expressions).
    pub fn raw(mut self, key: &str, value: impl ToString) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }

    /// Add an option whose value is arbitrary text, escaped for both levels.
    pub fn literal(mut self, key: &str, value: &str) -> Self {
        self.options.push((key.to_string(), graph_value(value)));
        self
    }

    pub fn build(self) -> String {
        let options = self
            .options
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(":");
        format!("{}={}", self.name, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_level_escaping() {
        let text = "this is a 'string': may contain one, or more, special characters";
        assert_eq!(
            escape_option_value(text),
            r"this is a \'string\'\: may contain one, or more, special characters"
        );
        assert_eq!(
            graph_value(text),
            r"this is a \\\'string\\\'\\: may contain one\, or more\, special characters"
        );
    }

    #[test]
    fn test_windows_font_path() {
        assert_eq!(
            graph_value("C:/Windows/Fonts/simsun.ttc"),
            r"C\\:/Windows/Fonts/simsun.ttc"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(graph_value("上海旅行"), "上海旅行");
        assert_eq!(graph_value("2024-05-01\n上海"), "2024-05-01\n上海");
    }

    #[test]
    fn test_filter_builder() {
        let filter = FilterBuilder::new("drawtext")
            .literal("text", "a:b")
            .raw("fontsize", 32)
            .raw("x", "(w-text_w)-20")
            .build();
        assert_eq!(filter, r"drawtext=text=a\\:b:fontsize=32:x=(w-text_w)-20");
    }
}
