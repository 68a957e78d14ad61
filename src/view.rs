use crate::types::{PredictionResponse, Section};

/// Everything the core logic may change on screen. Field values and inline
/// messages live in `FormState`; the chat panel is written directly by the
/// sequencer.
pub trait ViewPort {
    fn alert(&mut self, msg: &str);
    fn show_section(&mut self, section: Section);
    fn show_result(&mut self, result: ResultView);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub price: String,
    pub low: String,
    pub high: String,
    pub realtor_url: String,
}

impl ResultView {
    pub fn from_response(resp: &PredictionResponse) -> Self {
        let (low, high) = match resp.confidence_interval {
            Some((lo, hi)) => (format_usd(Some(lo)), format_usd(Some(hi))),
            None => (format_usd(None), format_usd(None)),
        };
        Self {
            price: format_usd(resp.predicted_price),
            low,
            high,
            realtor_url: resp.realtor_url.clone().unwrap_or_else(|| "--".to_string()),
        }
    }
}

/// The screen-level state the renderer reads.
#[derive(Debug)]
pub struct Screen {
    pub section: Section,
    pub result: Option<ResultView>,
    pub alert: Option<String>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            section: Section::Form,
            result: None,
            alert: None,
        }
    }
}

impl ViewPort for Screen {
    fn alert(&mut self, msg: &str) {
        self.alert = Some(msg.to_string());
    }

    fn show_section(&mut self, section: Section) {
        self.section = section;
    }

    fn show_result(&mut self, result: ResultView) {
        self.result = Some(result);
    }
}

/// "$" plus a locale-style number, or "--" when the value is missing.
pub fn format_usd(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("${}", format_locale(v)),
        None => "--".to_string(),
    }
}

/// Thousands separators, at most three fraction digits, no trailing zeros.
pub fn format_locale(v: f64) -> String {
    if !v.is_finite() {
        return "NaN".to_string();
    }
    let s = format!("{:.3}", v.abs());
    let (int_part, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    let mut out = String::new();
    if v < 0.0 && (int_part != "0" || !frac.is_empty()) {
        out.push('-');
    }
    out.push_str(&add_commas(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn add_commas(digits: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_formatting() {
        assert_eq!(format_locale(450000.0), "450,000");
        assert_eq!(format_locale(1234.5), "1,234.5");
        assert_eq!(format_locale(999.0), "999");
        assert_eq!(format_locale(1000000.125), "1,000,000.125");
        assert_eq!(format_locale(0.0004), "0");
        assert_eq!(format_locale(-1234.0), "-1,234");
        assert_eq!(format_locale(f64::NAN), "NaN");
    }

    #[test]
    fn missing_fields_render_as_placeholders() {
        let view = ResultView::from_response(&PredictionResponse {
            predicted_price: Some(450000.0),
            ..Default::default()
        });
        assert_eq!(view.price, "$450,000");
        assert_eq!(view.low, "--");
        assert_eq!(view.realtor_url, "--");
    }
}
