//! Shared output formatting: JSON envelopes and tables.

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// `{ "ok": ..., "data": ..., "error": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Print a successful result as JSON.
pub fn print_json<T: Serialize>(data: &T) {
    print_envelope(&Envelope { ok: true, data: Some(data), error: None });
}

/// Print a failed result that still carries data (e.g. an ambiguous resolve).
pub fn print_json_failure<T: Serialize>(data: &T, error: &str) {
    print_envelope(&Envelope { ok: false, data: Some(data), error: Some(error.to_string()) });
}

pub fn print_error(error: &str) {
    print_envelope::<()>(&Envelope { ok: false, data: None, error: Some(error.to_string()) });
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) {
    println!("{}", serde_json::to_string_pretty(envelope).unwrap_or_default());
}

/// Print rows under a header, followed by a count line.
pub fn print_table(headers: &[&str], rows: &[Vec<String>], noun: &str) {
    if rows.is_empty() {
        println!("(no {} found)", noun);
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    let table = builder.build().with(Style::rounded()).to_string();

    println!("{}", table);
    println!();
    println!("-- {} {} --", rows.len(), noun);
}
