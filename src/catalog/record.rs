use serde::Serialize;
use serde_json::{Map, Value};

/// One artifact as returned by the object listing endpoint.
///
/// Every known field has its own optional slot. Upstream records routinely omit
/// fields or send them with a different JSON type than usual, so construction
/// goes through [`RawRecord::from_json`], which never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub culture: Option<String>,
    pub period: Option<String>,
    pub century: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub classification: Option<String>,
    pub accessionyear: Option<i64>,
    pub accessionmethod: Option<String>,
    pub imagecount: Option<i64>,
    pub mediacount: Option<i64>,
    pub rank: Option<f64>,
    pub datebegin: Option<i64>,
    pub dateend: Option<i64>,
    pub colors: Vec<RawColor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawColor {
    pub color: Option<String>,
    pub spectrum: Option<String>,
    pub hue: Option<String>,
    pub percent: Option<f64>,
    pub css3: Option<String>,
}

impl RawRecord {
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let fields = Fields(obj);

        let colors = obj
            .get("colors")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(RawColor::from_json).collect())
            .unwrap_or_default();

        Self {
            id: fields.int("id"),
            title: fields.text("title"),
            culture: fields.text("culture"),
            period: fields.text("period"),
            century: fields.text("century"),
            medium: fields.text("medium"),
            dimensions: fields.text("dimensions"),
            description: fields.text("description"),
            department: fields.text("department"),
            classification: fields.text("classification"),
            accessionyear: fields.int("accessionyear"),
            accessionmethod: fields.text("accessionmethod"),
            imagecount: fields.int("imagecount"),
            mediacount: fields.int("mediacount"),
            rank: fields.real("rank"),
            datebegin: fields.int("datebegin"),
            dateend: fields.int("dateend"),
            colors,
        }
    }
}

impl RawColor {
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let fields = Fields(obj);
        Self {
            color: fields.text("color"),
            spectrum: fields.text("spectrum"),
            hue: fields.text("hue"),
            percent: fields.real("percent"),
            css3: fields.text("css3"),
        }
    }
}

/// Optional-field accessor over a JSON object. Missing keys, `null` and values
/// that cannot be coerced to the requested type all come back as `None`.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn real(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
