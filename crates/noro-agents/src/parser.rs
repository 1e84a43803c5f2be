//! Two-tier extraction of structured fields from free-text capability output.
//!
//! Tier one locates the JSON object that directly encloses a known anchor key
//! and decodes only that object, so prose, markdown fences or a second
//! unrelated object around it do not matter. Tier two scans the text for
//! `name: number` pairs. Anything neither tier finds takes its default.
//! Parsing never fails and is a pure function of its input.

use noro_models::estimate::NEUTRAL_PROBABILITY;
use noro_models::{clamp_unit, Estimate};
use serde_json::{Map, Value};

/// How a field is coerced and what it falls back to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Number clamped to `[0, 1]`.
    Unit { default: f64 },
    /// Non-negative integer, default 0.
    Count,
    /// Free text; falls back to the whole raw response.
    Text,
    /// Short categorical word; falls back to nothing.
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn unit(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: FieldKind::Unit { default },
        }
    }

    pub const fn count(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Count,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn label(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Label,
        }
    }
}

/// Fields of an analyst response. `probability` is the anchor.
pub const ESTIMATE_FIELDS: &[FieldSpec] = &[
    FieldSpec::unit("probability", NEUTRAL_PROBABILITY),
    FieldSpec::unit("confidence", NEUTRAL_PROBABILITY),
    FieldSpec::text("evidence"),
    FieldSpec::count("sources_count"),
];

/// Fields of a judge response. `consensus_probability` is the anchor.
pub const JUDGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::unit("consensus_probability", NEUTRAL_PROBABILITY),
    FieldSpec::unit("consensus_confidence", NEUTRAL_PROBABILITY),
    FieldSpec::label("agreement_level"),
    FieldSpec::text("reasoning"),
];

/// Which extraction strategy produced the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    /// Decoded from an embedded JSON object.
    Strict,
    /// At least one numeric field recovered by text scanning.
    Lenient,
    /// Nothing recognisable; every field is its default.
    Defaulted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Count(u32),
    Text(String),
    Label(Option<String>),
}

/// Every requested field, present and typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFields {
    pub tier: ParseTier,
    values: Vec<(&'static str, FieldValue)>,
    supplied: Vec<&'static str>,
}

impl ParsedFields {
    /// Whether the response actually carried `name`, as opposed to it
    /// taking its default.
    pub fn supplied(&self, name: &str) -> bool {
        self.supplied.contains(&name)
    }

    fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Unit field value; `NEUTRAL_PROBABILITY` for names not requested.
    pub fn number(&self, name: &str) -> f64 {
        match self.get(name) {
            Some(FieldValue::Number(n)) => *n,
            _ => NEUTRAL_PROBABILITY,
        }
    }

    pub fn count(&self, name: &str) -> u32 {
        match self.get(name) {
            Some(FieldValue::Count(c)) => *c,
            _ => 0,
        }
    }

    pub fn text(&self, name: &str) -> &str {
        match self.get(name) {
            Some(FieldValue::Text(t)) => t,
            _ => "",
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Label(l)) => l.as_deref(),
            _ => None,
        }
    }
}

/// Parse `raw` into the requested fields. The first spec is the anchor.
pub fn parse_fields(raw: &str, fields: &[FieldSpec]) -> ParsedFields {
    let anchor = fields.first().map(|f| f.name).unwrap_or_default();

    if let Some(object) = extract_anchored_object(raw, anchor) {
        let values = fields
            .iter()
            .map(|spec| (spec.name, coerce_json(object.get(spec.name), spec, raw)))
            .collect();
        let supplied = fields
            .iter()
            .filter(|spec| object.get(spec.name).is_some_and(|v| !v.is_null()))
            .map(|spec| spec.name)
            .collect();
        return ParsedFields {
            tier: ParseTier::Strict,
            values,
            supplied,
        };
    }

    let mut supplied = Vec::new();
    let values = fields
        .iter()
        .map(|spec| {
            let value = match spec.kind {
                FieldKind::Unit { default } => match scan_number(raw, spec.name) {
                    Some(n) => {
                        supplied.push(spec.name);
                        FieldValue::Number(clamp_unit(n, default))
                    }
                    None => FieldValue::Number(default),
                },
                FieldKind::Count => match scan_number(raw, spec.name) {
                    Some(n) => {
                        supplied.push(spec.name);
                        FieldValue::Count(to_count(n))
                    }
                    None => FieldValue::Count(0),
                },
                FieldKind::Text => FieldValue::Text(raw.trim().to_string()),
                FieldKind::Label => FieldValue::Label(scan_word(raw, spec.name)),
            };
            (spec.name, value)
        })
        .collect::<Vec<_>>();

    ParsedFields {
        tier: if supplied.is_empty() {
            ParseTier::Defaulted
        } else {
            ParseTier::Lenient
        },
        values,
        supplied,
    }
}

/// Parse an analyst response into an [`Estimate`].
pub fn parse_estimate(raw: &str) -> (Estimate, ParseTier) {
    let fields = parse_fields(raw, ESTIMATE_FIELDS);
    let estimate = Estimate::new(
        fields.number("probability"),
        fields.number("confidence"),
        fields.text("evidence"),
        fields.count("sources_count"),
    );
    (estimate, fields.tier)
}

fn coerce_json(value: Option<&Value>, spec: &FieldSpec, raw: &str) -> FieldValue {
    match spec.kind {
        FieldKind::Unit { default } => {
            FieldValue::Number(value.and_then(json_number).map_or(default, |n| clamp_unit(n, default)))
        }
        FieldKind::Count => FieldValue::Count(value.and_then(json_number).map_or(0, to_count)),
        FieldKind::Text => FieldValue::Text(match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => raw.trim().to_string(),
            Some(other) => other.to_string(),
        }),
        FieldKind::Label => FieldValue::Label(
            value
                .and_then(Value::as_str)
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty()),
        ),
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_token(s.trim()),
        _ => None,
    }
}

fn to_count(n: f64) -> u32 {
    if n.is_finite() && n > 0.0 {
        n.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Parse a numeric token, reading a trailing `%` as a percentage.
fn parse_number_token(token: &str) -> Option<f64> {
    match token.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|n| n / 100.0),
        None => token.parse::<f64>().ok(),
    }
}

/// Find the JSON object that most tightly encloses the quoted `anchor` key and
/// decodes cleanly. Tries every anchor occurrence in order.
pub fn extract_anchored_object(text: &str, anchor: &str) -> Option<Map<String, Value>> {
    if anchor.is_empty() {
        return None;
    }
    let needle = format!("\"{anchor}\"");

    for (anchor_at, _) in text.match_indices(&needle) {
        // Walk outwards: nearest opening brace first.
        for (open, _) in text[..anchor_at].rmatch_indices('{') {
            let Some(close) = balanced_object_end(text, open) else {
                continue;
            };
            if close < anchor_at {
                continue;
            }
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[open..=close]) {
                if map.contains_key(anchor) {
                    return Some(map);
                }
            }
        }
    }

    None
}

/// Byte index of the `}` closing the object that opens at `start`.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Byte offsets just past each whole-word, case-insensitive occurrence of
/// `name` followed by at least one separator (`:`, `=`, quote, whitespace).
fn value_starts<'a>(text: &'a str, name: &'a str) -> impl Iterator<Item = usize> + 'a {
    let lower = text.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();
    let positions: Vec<usize> = lower.match_indices(&name).map(|(i, _)| i).collect();

    positions.into_iter().filter_map(move |at| {
        let bytes = text.as_bytes();
        let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
        if at > 0 && is_word(bytes[at - 1]) {
            return None;
        }
        let mut i = at + name.len();
        if i < bytes.len() && is_word(bytes[i]) {
            return None;
        }
        let sep_start = i;
        while i < bytes.len() && matches!(bytes[i], b':' | b'=' | b'"' | b'\'' | b' ' | b'\t' | b'\r' | b'\n') {
            i += 1;
        }
        (i > sep_start).then_some(i)
    })
}

fn scan_number(text: &str, name: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    value_starts(text, name).find_map(|start| {
        let mut end = start;
        if end < bytes.len() && bytes[end] == b'-' {
            end += 1;
        }
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b'%' {
            end += 1;
        }
        parse_number_token(&text[start..end])
    })
}

fn scan_word(text: &str, name: &str) -> Option<String> {
    let bytes = text.as_bytes();
    value_starts(text, name).find_map(|start| {
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
            end += 1;
        }
        (end > start).then(|| text[start..end].to_ascii_lowercase())
    })
}
