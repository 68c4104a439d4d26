//! Cell coercion.
//!
//! Console cells are untyped. Both functions here are total: malformed input
//! becomes `NaN` (numbers) or an empty string (labels), so one bad cell never
//! hides the rest of a row.

use crate::console::Cell;

/// Converts a cell into a sample value.
pub fn to_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Int(v) => *v as f64,
        Cell::Float(v) => *v,
        Cell::Bool(true) => 1.0,
        Cell::Bool(false) => 0.0,
        Cell::Text(text) => parse_float(text),
        Cell::Bytes(bytes) => std::str::from_utf8(bytes).map_or(f64::NAN, parse_float),
        Cell::Timestamp(ts) => ts.timestamp() as f64,
        Cell::Duration(d) => d.num_nanoseconds().map_or(f64::NAN, |ns| ns as f64),
        Cell::Null => f64::NAN,
    }
}

fn parse_float(text: &str) -> f64 {
    match text.parse::<f64>() {
        // Out-of-range literals such as `1e400` overflow to infinity.
        Ok(v) if v.is_infinite() && !is_infinity_word(text) => f64::NAN,
        Ok(v) => v,
        Err(_) => f64::NAN,
    }
}

fn is_infinity_word(text: &str) -> bool {
    let word = text.trim_start_matches(['+', '-']);
    word.eq_ignore_ascii_case("inf") || word.eq_ignore_ascii_case("infinity")
}

/// Converts a cell into a label value.
pub fn to_label_text(cell: &Cell) -> String {
    match cell {
        Cell::Int(v) => v.to_string(),
        Cell::Float(v) => format_float(*v),
        Cell::Bool(v) => v.to_string(),
        Cell::Text(text) => text.clone(),
        Cell::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cell::Timestamp(ts) => ts.timestamp().to_string(),
        Cell::Null | Cell::Duration(_) => String::new(),
    }
}

/// Shortest decimal form, switching to `1e+21` / `1e-05` exponent notation
/// outside `[1e-4, 1e21)`.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let exponent_form = format!("{:e}", v);
    let (mantissa, exp) = match exponent_form.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => return v.to_string(),
    };

    if v != 0.0 && !(-4..21).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        v.to_string()
    }
}
