//! # Operand parsing helpers
//!
//! Per-kind parsers for the four operand shapes an instruction line can
//! contain (spec.md §4.4): type, label, constant, and value. Grounded in
//! `examples/original_source/src/il/io/OperandParse_*.cpp`, adapted from a
//! `Cursor`-based char scan to a `&str` token (the textual instruction parser
//! in `il/parser.rs` has already split the line into whitespace/comma
//! delimited tokens, respecting quoted strings and bracket nesting).

use crate::il::escape;
use crate::il::types::Type;
use crate::il::value::Value;

fn strip_trailing_punct(token: &str) -> &str {
    token.trim_end_matches(|c| c == ',')
}

/// Parses a type operand: a bare token mapped through [`Type::parse`].
pub fn parse_type(token: &str) -> Result<Type, String> {
    let token = strip_trailing_punct(token.trim());
    if token.is_empty() {
        return Err("missing type".to_string());
    }
    Type::parse(token).ok_or_else(|| format!("unknown type '{token}'"))
}

/// Parses a branch label: strips an optional leading `label` keyword and an
/// optional leading `^`.
pub fn parse_label(token: &str) -> Result<String, String> {
    let mut text = token.trim();
    if let Some(rest) = text.strip_prefix("label ") {
        text = rest.trim_start();
    } else if text == "label" {
        text = "";
    }
    let text = text.strip_prefix('^').unwrap_or(text);
    let text = text.trim();
    if text.is_empty() {
        return Err("malformed branch target: missing label".to_string());
    }
    Ok(text.to_string())
}

fn equals_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Parses a constant literal: quoted string, `true`/`false`, `null`, or a
/// numeric token dispatched to integer or float parsing based on its shape.
pub fn parse_const(token: &str) -> Result<Value, String> {
    let trimmed = token.trim();
    if let Some(body) = trimmed.strip_prefix('"') {
        let body = body.strip_suffix('"').ok_or("unterminated string literal")?;
        let bytes = escape::decode(body).map_err(|e| e.to_string())?;
        return Ok(Value::const_str(bytes));
    }

    let token = strip_trailing_punct(trimmed);
    if token.is_empty() {
        return Err("missing operand".to_string());
    }
    if equals_ignore_case(token, "true") {
        return Ok(Value::const_bool(true));
    }
    if equals_ignore_case(token, "false") {
        return Ok(Value::const_bool(false));
    }
    if token == "null" {
        return Ok(Value::NullPtr);
    }

    parse_numeric(token)
}

fn is_hex_prefixed(token: &str) -> bool {
    let t = token.strip_prefix(['+', '-']).unwrap_or(token);
    t.len() >= 2 && &t[..2].to_ascii_lowercase() == "0x"
}

fn parse_numeric(token: &str) -> Result<Value, String> {
    let has_dot = token.contains('.');
    let hex = is_hex_prefixed(token);
    let has_exp = !hex && (token.contains('e') || token.contains('E'));
    let is_special_float = matches!(
        token.to_ascii_lowercase().as_str(),
        "nan" | "inf" | "+inf" | "-inf"
    );

    if has_dot || has_exp || is_special_float {
        return parse_float_literal(token).map(Value::const_float);
    }

    parse_int_literal(token)
        .map(Value::const_int)
        .ok_or_else(|| format!("invalid integer literal '{token}'"))
}

fn parse_float_literal(token: &str) -> Result<f64, String> {
    match token.to_ascii_lowercase().as_str() {
        "nan" => return Ok(f64::NAN),
        "inf" | "+inf" => return Ok(f64::INFINITY),
        "-inf" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    token.parse::<f64>().map_err(|_| format!("invalid floating literal '{token}'"))
}

/// Parses a signed 64-bit integer literal, supporting `0x`/`0b` prefixes
/// (with an optional leading sign).
fn parse_int_literal(token: &str) -> Option<i64> {
    let (neg, rest) = match token.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let value: i64 = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };

    Some(if neg { -value } else { value })
}

/// Parses a value operand: `%name` temporary, `@name` global, quoted string
/// or bare literal constant. `[...]` memory operands are explicitly
/// unsupported at this layer (lowering never emits them here).
pub fn parse_value(token: &str, lookup_temp: impl Fn(&str) -> Option<u32>) -> Result<Value, String> {
    let token = strip_trailing_punct(token.trim());
    if token.is_empty() {
        return Err("missing operand".to_string());
    }
    if let Some(name) = token.strip_prefix('%') {
        if let Some(id) = lookup_temp(name) {
            return Ok(Value::Temp(id));
        }
        if let Some(digits) = name.strip_prefix('t') {
            if let Ok(id) = digits.parse::<u32>() {
                return Ok(Value::Temp(id));
            }
        }
        return Err(format!("unknown temp '%{name}'"));
    }
    if let Some(name) = token.strip_prefix('@') {
        return Ok(Value::GlobalAddr(name.to_string()));
    }
    if token.starts_with('[') {
        return Err("unsupported memory operand".to_string());
    }
    parse_const(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_operand_rejects_unknown_spelling() {
        assert_eq!(parse_type("i32,"), Ok(Type::I32));
        assert!(parse_type("i128").is_err());
    }

    #[test]
    fn label_operand_strips_keyword_and_caret() {
        assert_eq!(parse_label("label ^entry"), Ok("entry".to_string()));
        assert_eq!(parse_label("^entry"), Ok("entry".to_string()));
        assert_eq!(parse_label("entry"), Ok("entry".to_string()));
        assert!(parse_label("  ").is_err());
    }

    #[test]
    fn const_operand_dispatches_numeric_shape() {
        assert_eq!(parse_const("true"), Ok(Value::const_bool(true)));
        assert_eq!(parse_const("null"), Ok(Value::NullPtr));
        assert_eq!(parse_const("42"), Ok(Value::const_int(42)));
        assert_eq!(parse_const("-0x2A"), Ok(Value::const_int(-42)));
        assert_eq!(parse_const("0b101"), Ok(Value::const_int(5)));
        assert_eq!(parse_const("3.5"), Ok(Value::const_float(3.5)));
        assert_eq!(parse_const("nan").map(|v| matches!(v, Value::ConstFloat(f) if f.is_nan())), Ok(true));
        assert_eq!(parse_const("\"hi\\n\""), Ok(Value::const_str(b"hi\n".to_vec())));
    }

    #[test]
    fn value_operand_resolves_temp_and_global() {
        assert_eq!(parse_value("%t3", |_| None), Ok(Value::Temp(3)));
        assert_eq!(parse_value("%foo", |n| if n == "foo" { Some(7) } else { None }), Ok(Value::Temp(7)));
        assert_eq!(parse_value("@g", |_| None), Ok(Value::GlobalAddr("g".to_string())));
        assert!(parse_value("[%t0]", |_| None).is_err());
    }
}
