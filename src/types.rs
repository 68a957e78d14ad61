use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

fn f64_opt_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<serde_json::Value>::deserialize(d)?.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn interval_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<(f64, f64)>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    let arr = match v.as_ref().and_then(|v| v.as_array()) {
        Some(a) if a.len() >= 2 => a,
        _ => return Ok(None),
    };
    match (arr[0].as_f64(), arr[1].as_f64()) {
        (Some(lo), Some(hi)) => Ok(Some((lo, hi))),
        _ => Ok(None),
    }
}

fn string_opt_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Non-array values read as absent; string elements are kept, other scalars
/// keep their JSON text and nulls are dropped.
fn strings_opt_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let arr = match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::Array(a)) => a,
        _ => return Ok(None),
    };
    Ok(Some(
        arr.into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Purpose {
    #[default]
    Unset,
    Buy,
    Sell,
}

impl Purpose {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Purpose::Buy => Some("buy"),
            Purpose::Sell => Some("sell"),
            Purpose::Unset => None,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "buy" => Purpose::Buy,
            "sell" => Purpose::Sell,
            _ => Purpose::Unset,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Purpose::Buy => "Buying",
            Purpose::Sell => "Selling",
            Purpose::Unset => "N/A",
        }
    }

    pub fn is_set(self) -> bool {
        self != Purpose::Unset
    }
}

/// Form fields in on-screen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SqftLiving,
    Bedrooms,
    Bathrooms,
    SqftLot,
    Floors,
    HouseAge,
    Zipcode,
}

pub const FIELDS: [Field; 7] = [
    Field::SqftLiving,
    Field::Bedrooms,
    Field::Bathrooms,
    Field::SqftLot,
    Field::Floors,
    Field::HouseAge,
    Field::Zipcode,
];

impl Field {
    /// Wire name, also used as the persisted history key.
    pub fn name(self) -> &'static str {
        match self {
            Field::SqftLiving => "sqft_living",
            Field::Bedrooms => "no_of_bedrooms",
            Field::Bathrooms => "no_of_bathrooms",
            Field::SqftLot => "sqft_lot",
            Field::Floors => "no_of_floors",
            Field::HouseAge => "house_age",
            Field::Zipcode => "zipcode",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::SqftLiving => "Living area (sqft)",
            Field::Bedrooms => "Bedrooms",
            Field::Bathrooms => "Bathrooms",
            Field::SqftLot => "Lot size (sqft)",
            Field::Floors => "Floors",
            Field::HouseAge => "House age (years)",
            Field::Zipcode => "ZIP code",
        }
    }

    pub fn index(self) -> usize {
        FIELDS.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// One stored outcome of a prior submission. Field values are kept as typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub sqft_living: String,
    pub no_of_bedrooms: String,
    pub no_of_bathrooms: String,
    pub sqft_lot: String,
    pub no_of_floors: String,
    pub house_age: String,
    pub zipcode: String,
    pub purpose: String,
    #[serde(default)]
    pub predicted_price: Option<f64>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Local>>,
}

impl PredictionRecord {
    pub fn from_request(req: &PredictionRequest, predicted_price: Option<f64>) -> Self {
        Self {
            sqft_living: req.sqft_living.clone(),
            no_of_bedrooms: req.no_of_bedrooms.clone(),
            no_of_bathrooms: req.no_of_bathrooms.clone(),
            sqft_lot: req.sqft_lot.clone(),
            no_of_floors: req.no_of_floors.clone(),
            house_age: req.house_age.clone(),
            zipcode: req.zipcode.clone(),
            purpose: req.purpose.clone(),
            predicted_price: predicted_price.map(|p| (p * 100.0).round() / 100.0),
            recorded_at: Some(Local::now()),
        }
    }
}

/// Flat field -> value body posted to the backend. Values stay raw strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub purpose: String,
    pub sqft_living: String,
    pub no_of_bedrooms: String,
    pub no_of_bathrooms: String,
    pub sqft_lot: String,
    pub no_of_floors: String,
    pub house_age: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionResponse {
    #[serde(default, deserialize_with = "f64_opt_lenient")]
    pub predicted_price: Option<f64>,
    #[serde(default, deserialize_with = "interval_lenient")]
    pub confidence_interval: Option<(f64, f64)>,
    #[serde(default, deserialize_with = "string_opt_lenient")]
    pub realtor_url: Option<String>,
    #[serde(default, deserialize_with = "strings_opt_lenient")]
    pub recommendations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Form,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Compact,
    Full,
}

impl HistoryMode {
    pub fn toggle(self) -> Self {
        match self {
            HistoryMode::Compact => HistoryMode::Full,
            HistoryMode::Full => HistoryMode::Compact,
        }
    }
}

/// What currently owns keyboard focus on the form section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Purpose,
    Field(Field),
    Predict,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Purpose => Focus::Field(FIELDS[0]),
            Focus::Field(f) => match FIELDS.get(f.index() + 1) {
                Some(n) => Focus::Field(*n),
                None => Focus::Predict,
            },
            Focus::Predict => Focus::Purpose,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Purpose => Focus::Predict,
            Focus::Field(f) => match f.index() {
                0 => Focus::Purpose,
                i => Focus::Field(FIELDS[i - 1]),
            },
            Focus::Predict => Focus::Field(FIELDS[FIELDS.len() - 1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycle_visits_every_field() {
        let mut f = Focus::Purpose;
        let mut seen = Vec::new();
        for _ in 0..9 {
            f = f.next();
            seen.push(f);
        }
        assert_eq!(seen[0], Focus::Field(Field::SqftLiving));
        assert_eq!(seen[6], Focus::Field(Field::Zipcode));
        assert_eq!(seen[7], Focus::Predict);
        assert_eq!(seen[8], Focus::Purpose);
        assert_eq!(Focus::Field(Field::SqftLiving).prev(), Focus::Purpose);
    }

    #[test]
    fn response_parses_leniently() {
        let r: PredictionResponse = serde_json::from_str(
            r#"{"predicted_price": 450000, "confidence_interval": [420000, 480000],
                "realtor_url": "https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(r.predicted_price, Some(450000.0));
        assert_eq!(r.confidence_interval, Some((420000.0, 480000.0)));
        assert!(r.recommendations.is_none());

        let r: PredictionResponse =
            serde_json::from_str(r#"{"confidence_interval": [1]}"#).unwrap();
        assert_eq!(r, PredictionResponse::default());
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let r: PredictionResponse = serde_json::from_str(
            r#"{"predicted_price": 450000, "confidence_interval": [420000, 480000],
                "realtor_url": 123, "recommendations": "tip"}"#,
        )
        .unwrap();
        assert_eq!(r.predicted_price, Some(450000.0));
        assert_eq!(r.realtor_url, None);
        assert_eq!(r.recommendations, None);

        let r: PredictionResponse =
            serde_json::from_str(r#"{"recommendations": ["a", 2, null, true]}"#).unwrap();
        assert_eq!(
            r.recommendations,
            Some(vec!["a".to_string(), "2".to_string(), "true".to_string()])
        );
    }

    #[test]
    fn record_price_is_rounded_to_cents() {
        let req = PredictionRequest {
            purpose: "sell".into(),
            sqft_living: "1500".into(),
            no_of_bedrooms: "3".into(),
            no_of_bathrooms: "2".into(),
            sqft_lot: "5000".into(),
            no_of_floors: "1".into(),
            house_age: "10".into(),
            zipcode: "98101".into(),
        };
        let rec = PredictionRecord::from_request(&req, Some(123456.789));
        assert_eq!(rec.predicted_price, Some(123456.79));
        assert_eq!(rec.purpose, "sell");
        assert!(rec.recorded_at.is_some());
    }
}
