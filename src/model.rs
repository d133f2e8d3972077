//! Listing and dataset types shared by the store, novelty and analysis layers.
//!
//! Required fields (id, price, square_meters) are checked once at the decode
//! boundary by [`PropertyRecord::from_value`]; everything downstream works
//! with fully typed records.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Physical condition as reported by the listing feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Condition {
    NewFromBuilder,
    NewOrRenovated,
    Good,
    NeedsRenovation,
    NeedsFullRenovation,
    #[default]
    Unknown,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::NewFromBuilder => "new_from_builder",
            Condition::NewOrRenovated => "new_or_renovated",
            Condition::Good => "good",
            Condition::NeedsRenovation => "needs_renovation",
            Condition::NeedsFullRenovation => "needs_full_renovation",
            Condition::Unknown => "unknown",
        }
    }

    /// Maps the feed's numeric condition ids (1..=5).
    pub fn from_feed_id(id: i64) -> Self {
        match id {
            1 => Condition::NewFromBuilder,
            2 => Condition::NewOrRenovated,
            3 => Condition::Good,
            4 => Condition::NeedsRenovation,
            5 => Condition::NeedsFullRenovation,
            _ => Condition::Unknown,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "new_from_builder" => Condition::NewFromBuilder,
            "new_or_renovated" => Condition::NewOrRenovated,
            "good" => Condition::Good,
            "needs_renovation" => Condition::NeedsRenovation,
            "needs_full_renovation" => Condition::NeedsFullRenovation,
            _ => Condition::Unknown,
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// accepts labels, raw feed ids, or anything else as Unknown so a bad
// condition never costs us the whole record
impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Label(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Condition::from_feed_id(id),
            Raw::Label(label) => Condition::from_label(&label),
            Raw::Other(_) => Condition::Unknown,
        })
    }
}

/// Parse an ISO-8601 timestamp. Offsets are honored; naive timestamps (as
/// written by the scraper) are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

// Optional listing fields never reject a record: a value of the wrong shape
// reads as absent.
mod lenient {
    use super::parse_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Value::deserialize(d)?.as_str().and_then(parse_timestamp))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite()))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }
}

/// One listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub price: f64,
    #[serde(rename = "square_meters")]
    pub area: f64,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub rooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(
        rename = "scraped_at",
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "full_url",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    /// Fields this crate does not model. Carried through save/load untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Why a raw record was dropped at the decode boundary.
#[derive(Debug)]
pub enum RecordRejection {
    NotAnObject,
    MissingIdentity,
    MissingField(&'static str),
    Invalid(serde_json::Error),
}

impl std::fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordRejection::NotAnObject => write!(f, "record is not an object"),
            RecordRejection::MissingIdentity => write!(f, "record has no identity"),
            RecordRejection::MissingField(name) => write!(f, "record is missing '{name}'"),
            RecordRejection::Invalid(e) => write!(f, "record is malformed: {e}"),
        }
    }
}

impl PropertyRecord {
    pub fn new(id: impl Into<String>, price: f64, area: f64) -> Self {
        PropertyRecord {
            id: id.into(),
            price,
            area,
            rooms: None,
            lat: None,
            lng: None,
            neighborhood: None,
            condition: Condition::Unknown,
            observed_at: None,
            url: None,
            extra: Map::new(),
        }
    }

    pub fn with_neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.neighborhood = Some(neighborhood.into());
        self
    }

    pub fn with_rooms(mut self, rooms: f64) -> Self {
        self.rooms = Some(rooms);
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    /// Parses one stored record, enforcing the required fields.
    pub fn from_value(value: Value) -> Result<Self, RecordRejection> {
        let Some(object) = value.as_object() else {
            return Err(RecordRejection::NotAnObject);
        };

        match object.get("id").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {}
            _ => return Err(RecordRejection::MissingIdentity),
        }

        for field in ["price", "square_meters"] {
            if !object.get(field).is_some_and(Value::is_number) {
                return Err(RecordRejection::MissingField(field));
            }
        }

        // the scraper sends the numeric condition as `condition_id`
        let feed_condition = match (object.get("condition"), object.get("condition_id")) {
            (None, Some(Value::Number(id))) => id.as_i64().map(Condition::from_feed_id),
            (None, Some(Value::String(id))) => id.trim().parse().ok().map(Condition::from_feed_id),
            _ => None,
        };

        let mut record: PropertyRecord = serde_json::from_value(value).map_err(RecordRejection::Invalid)?;
        if let Some(condition) = feed_condition {
            record.condition = condition;
        }
        Ok(record)
    }

    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Price and area are both positive finite numbers.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.area.is_finite() && self.area > 0.0
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn price_per_area(&self) -> Option<f64> {
        self.is_valid().then(|| self.price / self.area)
    }

    pub fn area_per_room(&self) -> Option<f64> {
        match self.rooms {
            Some(rooms) if rooms > 0.0 && self.area.is_finite() && self.area > 0.0 => {
                Some(self.area / rooms)
            }
            _ => None,
        }
    }
}

/// Dataset metadata. `search_params` is opaque: persisted, never interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub record_count: usize,
    #[serde(default)]
    pub valid_count: usize,
    #[serde(default)]
    pub location_count: usize,
    #[serde(default)]
    pub search_params: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetMetadata {
    pub fn new(search_params: Value) -> Self {
        DatasetMetadata {
            search_params,
            ..Default::default()
        }
    }

    /// Recomputes the count fields from the records about to be stored.
    pub fn refresh_counts(&mut self, records: &[PropertyRecord]) {
        self.record_count = records.len();
        self.valid_count = records.iter().filter(|r| r.is_valid()).count();
        self.location_count = records.iter().filter(|r| r.coordinates().is_some()).count();
    }
}

/// The single live dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub metadata: DatasetMetadata,
    pub records: Vec<PropertyRecord>,
}
