use crate::ui::{theme, Icons};
use crate::value::Value;
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    println!("{} {}", icon, text.style(theme().header));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn empty(label: &str) {
    println!("{} {}", Icons::EMPTY, label.style(theme().dim));
}

pub fn field(label: &str, value: &str) {
    println!("  {} {}", format!("{}:", label).style(theme().dim), value);
}

pub fn key(text: &str) -> String {
    text.style(theme().key).to_string()
}

pub fn relation(text: Option<&str>) -> String {
    match text {
        Some(text) => text.style(theme().relation).to_string(),
        None => "-".style(theme().dim).to_string(),
    }
}

/// Render a stored value for a terminal cell.
pub fn value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".style(theme().null).to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()).style(theme().dim).to_string(),
    }
}
