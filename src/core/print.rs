//! Purpose: Serialize documents to JSON text with caller-selected indentation.
//! Exports: `render`, `colorize`.
//! Role: Single formatting seam for `print`, `ToString`, `ToFile`, and CLI output.
//! Invariants: `indent <= 0` renders compact text with no whitespace.
//! Invariants: Uncolored `colorize` output equals `render` for the same indent.
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

// 8/16-color palette; bright variants lose contrast on some themes.
const COLOR_KEY: &str = "36";
const COLOR_STRING: &str = "32";
const COLOR_NUMBER: &str = "33";
const COLOR_BOOL: &str = "35";
const COLOR_NULL: &str = "39";
const COLOR_PUNCT: &str = "39";

pub fn render(value: &Value, indent: i32) -> Result<String, Error> {
    let Some(width) = indent_width(indent) else {
        return serde_json::to_string(value).map_err(encode_error);
    };
    let pad = vec![b' '; width];
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&pad));
    value.serialize(&mut ser).map_err(encode_error)?;
    String::from_utf8(out).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("serializer produced invalid utf-8")
            .with_source(err)
    })
}

pub fn colorize(value: &Value, indent: i32, use_color: bool) -> String {
    let mut out = String::new();
    let style = Style {
        width: indent_width(indent),
        use_color,
    };
    write_value(value, 0, style, &mut out);
    out
}

fn indent_width(indent: i32) -> Option<usize> {
    usize::try_from(indent).ok().filter(|width| *width > 0)
}

fn encode_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to serialize document")
        .with_source(err)
}

#[derive(Clone, Copy)]
struct Style {
    width: Option<usize>,
    use_color: bool,
}

fn write_value(value: &Value, level: usize, style: Style, out: &mut String) {
    match value {
        Value::Null => push_colored("null", COLOR_NULL, style, out),
        Value::Bool(val) => {
            let text = if *val { "true" } else { "false" };
            push_colored(text, COLOR_BOOL, style, out);
        }
        Value::Number(num) => push_colored(&num.to_string(), COLOR_NUMBER, style, out),
        Value::String(text) => push_colored(&quote(text), COLOR_STRING, style, out),
        Value::Array(items) => write_array(items, level, style, out),
        Value::Object(map) => write_object(map, level, style, out),
    }
}

fn write_array(items: &[Value], level: usize, style: Style, out: &mut String) {
    if items.is_empty() {
        push_colored("[]", COLOR_PUNCT, style, out);
        return;
    }
    push_colored("[", COLOR_PUNCT, style, out);
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            push_colored(",", COLOR_PUNCT, style, out);
        }
        push_newline(level + 1, style, out);
        write_value(item, level + 1, style, out);
    }
    push_newline(level, style, out);
    push_colored("]", COLOR_PUNCT, style, out);
}

fn write_object(map: &Map<String, Value>, level: usize, style: Style, out: &mut String) {
    if map.is_empty() {
        push_colored("{}", COLOR_PUNCT, style, out);
        return;
    }
    push_colored("{", COLOR_PUNCT, style, out);
    for (idx, (key, value)) in map.iter().enumerate() {
        if idx > 0 {
            push_colored(",", COLOR_PUNCT, style, out);
        }
        push_newline(level + 1, style, out);
        push_colored(&quote(key), COLOR_KEY, style, out);
        push_colored(":", COLOR_PUNCT, style, out);
        if style.width.is_some() {
            out.push(' ');
        }
        write_value(value, level + 1, style, out);
    }
    push_newline(level, style, out);
    push_colored("}", COLOR_PUNCT, style, out);
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn push_newline(level: usize, style: Style, out: &mut String) {
    let Some(width) = style.width else {
        return;
    };
    out.push('\n');
    for _ in 0..level * width {
        out.push(' ');
    }
}

fn push_colored(text: &str, color: &str, style: Style, out: &mut String) {
    if !style.use_color {
        out.push_str(text);
        return;
    }
    out.push_str("\u{1b}[");
    out.push_str(color);
    out.push('m');
    out.push_str(text);
    out.push_str("\u{1b}[0m");
}
