use std::collections::HashMap;

use crate::types::{Field, Purpose, FIELDS};

pub const REQUIRED_MSG: &str = "This field is required.";

pub struct Rule {
    pub min: f64,
    pub max: f64,
    pub error: &'static str,
}

pub fn rule_for(field: Field) -> Rule {
    match field {
        Field::SqftLiving => Rule {
            min: 200.0,
            max: 10000.0,
            error: "Living area must be between 200 and 10,000 sqft.",
        },
        Field::Bedrooms => Rule {
            min: 1.0,
            max: 25.0,
            error: "Number of bedrooms must be between 1 and 25.",
        },
        Field::Bathrooms => Rule {
            min: 1.0,
            max: 15.0,
            error: "Number of bathrooms must be between 1 and 15.",
        },
        Field::SqftLot => Rule {
            min: 500.0,
            max: 50000.0,
            error: "Lot size must be between 500 and 50,000 sqft.",
        },
        Field::Floors => Rule {
            min: 0.0,
            max: 10.0,
            error: "Floors must be between 0 and 10.",
        },
        Field::HouseAge => Rule {
            min: 0.0,
            max: 150.0,
            error: "House age must be between 0 and 150 years.",
        },
        Field::Zipcode => Rule {
            min: 98001.0,
            max: 99001.0,
            error: "Invalid ZIP code. Must be between 98001 and 99001.",
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn err(msg: &str) -> Self {
        Self {
            valid: false,
            message: msg.to_string(),
        }
    }
}

/// Parses the longest leading decimal number, ignoring leading whitespace.
/// "12.5ft" yields 12.5; "abc" yields None.
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            end = j;
        }
    }
    if digits == 0 {
        return None;
    }
    // exponent only counts when it carries digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut j = end + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }
    s[..end].parse().ok()
}

pub fn validate(field: Field, raw: &str) -> Validation {
    let value = match parse_leading_float(raw) {
        Some(v) if !raw.trim().is_empty() => v,
        _ => return Validation::err(REQUIRED_MSG),
    };
    let rule = rule_for(field);
    if value < rule.min || value > rule.max {
        return Validation::err(rule.error);
    }
    Validation::ok()
}

/// Field values plus whatever inline messages are attached to them.
#[derive(Debug, Default)]
pub struct FormState {
    values: HashMap<Field, String>,
    errors: HashMap<Field, String>,
    guidance: HashMap<Field, String>,
    pub submit_enabled: bool,
}

impl FormState {
    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn guidance(&self, field: Field) -> Option<&str> {
        self.guidance.get(&field).map(String::as_str)
    }

    /// Replaces a field's raw value and revalidates the whole form.
    pub fn set_value(&mut self, field: Field, raw: &str, purpose: Purpose) {
        self.values.insert(field, raw.to_string());
        self.check_validity(purpose);
    }

    pub fn push_char(&mut self, field: Field, c: char, purpose: Purpose) {
        let mut v = self.value(field).to_string();
        v.push(c);
        self.set_value(field, &v, purpose);
    }

    pub fn pop_char(&mut self, field: Field, purpose: Purpose) {
        let mut v = self.value(field).to_string();
        v.pop();
        self.set_value(field, &v, purpose);
    }

    /// Validates one field, attaching or clearing its inline message.
    pub fn validate_field(&mut self, field: Field) -> Validation {
        let result = validate(field, self.value(field));
        if result.valid {
            self.errors.remove(&field);
        } else {
            self.errors.insert(field, result.message.clone());
        }
        result
    }

    /// Validates every field; all are checked so every message is current.
    pub fn validate_all(&mut self) -> bool {
        let mut valid = true;
        for field in FIELDS {
            if !self.validate_field(field).valid {
                valid = false;
            }
        }
        valid
    }

    pub fn check_validity(&mut self, purpose: Purpose) -> bool {
        let fields_ok = self.validate_all();
        self.submit_enabled = fields_ok && purpose.is_set();
        self.submit_enabled
    }

    /// Attaches the purpose guidance to a field; returns false if it was
    /// already there.
    pub fn attach_guidance(&mut self, field: Field, msg: &str) -> bool {
        if self.guidance.contains_key(&field) {
            return false;
        }
        self.guidance.insert(field, msg.to_string());
        true
    }

    /// Empties every field and drops all inline messages.
    pub fn clear(&mut self) {
        self.values.clear();
        self.errors.clear();
        self.guidance.clear();
        self.submit_enabled = false;
    }
}
