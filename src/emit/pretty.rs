//! Human pretty-printer.
use crate::bencode::Value;

const INDENT: &str = "  ";
const STRING_TRUNCATE_AT: usize = 50;

/// Renders `value` as an indented, human-readable dump.
pub fn pretty_print(value: &Value) -> String {
    let mut out = String::new();
    render(value, 0, &mut out);
    out
}

fn render(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Bytes(b) => out.push_str(&escape_bytes(b)),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::List(items) => {
            out.push_str("list\n");
            for (i, item) in items.iter().enumerate() {
                push_indent(out, depth + 1);
                out.push_str(&format!("{i}: "));
                render(item, depth + 1, out);
                out.push('\n');
            }
        }
        Value::Dict(map) => {
            out.push_str("dict\n");
            for (key, val) in map {
                push_indent(out, depth + 1);
                out.push_str(&escape_bytes(key));
                out.push_str(": ");
                render(val, depth + 1, out);
                out.push('\n');
            }
        }
    }
    // trailing newline added by caller for nested entries; trim for
    // the outermost call so pretty_print doesn't end with a blank line
    if depth == 0 && out.ends_with('\n') {
        out.pop();
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Printable-escape form: a double-quoted string where non-printable
/// bytes become `\xNN`, with the byte content truncated to 50 bytes
/// (appending `...`) when emitted at the top level of a string.
fn escape_bytes(bytes: &[u8]) -> String {
    let (shown, truncated) = if bytes.len() > STRING_TRUNCATE_AT {
        (&bytes[..STRING_TRUNCATE_AT], true)
    } else {
        (bytes, false)
    };

    let mut out = String::with_capacity(shown.len() + 2);
    out.push('"');
    for &b in shown {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('"');
    if truncated {
        out.push_str("...");
    }
    out
}
