//! Bounded rendering of YAML values for error messages

use serde_yaml::Value;

/// Limits applied when rendering a value for diagnostics
#[derive(Debug, Clone)]
pub struct ReprOptions {
    pub max_depth: usize,
    pub max_entries: usize,
    pub max_items: usize,
    pub max_string: usize,
}

impl Default for ReprOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_entries: 4,
            max_items: 6,
            max_string: 30,
        }
    }
}

/// Render `value` in flow style, eliding anything past the configured limits
pub fn elided_repr(value: &Value, options: &ReprOptions) -> String {
    let mut out = String::new();
    write_value(&mut out, value, options, options.max_depth);
    out
}

fn write_value(out: &mut String, value: &Value, options: &ReprOptions, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(&b.to_string()),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s, options.max_string),
        Value::Sequence(items) => {
            if depth == 0 {
                out.push_str("[...]");
                return;
            }
            out.push('[');
            for (i, item) in items.iter().take(options.max_items).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, options, depth - 1);
            }
            if items.len() > options.max_items {
                out.push_str(", ...");
            }
            out.push(']');
        }
        Value::Mapping(map) => {
            if depth == 0 {
                out.push_str("{...}");
                return;
            }
            out.push('{');
            for (i, (k, v)) in map.iter().take(options.max_entries).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, options, 0);
                out.push_str(": ");
                write_value(out, v, options, depth - 1);
            }
            if map.len() > options.max_entries {
                out.push_str(", ...");
            }
            out.push('}');
        }
        Value::Tagged(tagged) => {
            out.push_str(&tagged.tag.to_string());
            out.push(' ');
            write_value(out, &tagged.value, options, depth);
        }
    }
}

fn write_string(out: &mut String, s: &str, max: usize) {
    out.push('\'');
    if s.chars().count() > max {
        // keep both ends like `'abcdefghijk...uvwxyz'`
        let head = (max.saturating_sub(3)) / 2;
        let tail = max.saturating_sub(3) - head;
        let chars: Vec<char> = s.chars().collect();
        out.extend(&chars[..head]);
        out.push_str("...");
        out.extend(&chars[chars.len() - tail..]);
    } else {
        out.push_str(s);
    }
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_small_mapping_is_rendered_fully() {
        let value = parse("a:\n  b: 1\nc: x\n");
        assert_eq!(elided_repr(&value, &ReprOptions::default()), "{'a': {'b': 1}, 'c': 'x'}");
    }

    #[test]
    fn test_deep_nesting_is_elided() {
        let value = parse("a:\n  b:\n    c: 1\n");
        assert_eq!(elided_repr(&value, &ReprOptions::default()), "{'a': {'b': {...}}}");
    }

    #[test]
    fn test_extra_entries_are_elided() {
        let value = parse("a: 1\nb: 2\nc: 3\nd: 4\ne: 5\n");
        assert_eq!(
            elided_repr(&value, &ReprOptions::default()),
            "{'a': 1, 'b': 2, 'c': 3, 'd': 4, ...}"
        );
    }

    #[test]
    fn test_long_strings_are_shortened() {
        let value = Value::String("x".repeat(100));
        let rendered = elided_repr(&value, &ReprOptions::default());
        assert!(rendered.contains("..."));
        assert_eq!(rendered.chars().count(), 32);
    }
}
