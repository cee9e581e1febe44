//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Telemetry records and the sensor collaborator interface."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single field value in a telemetry document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Integer(u64),
    Number(f64),
    Text(String),
}

/// One raw sample from the sensor collaborator. `None` marks a failed read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub ppm: Option<f64>,
}

/// Producer of sensor samples.
pub trait TelemetrySource: Send {
    fn read(&mut self) -> SensorReading;
}

/// Flat, ordered key/value document published to the broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord {
    fields: IndexMap<String, Option<TelemetryValue>>,
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard document: identity, sequence, then the three measurements.
    pub fn from_reading(device_id: &str, counter: u64, reading: &SensorReading) -> Self {
        let mut record = Self::new();
        record.insert("device_id", Some(TelemetryValue::Text(device_id.to_owned())));
        record.insert("counter", Some(TelemetryValue::Integer(counter)));
        record.insert("temperature", reading.temperature.map(one_decimal));
        record.insert("humidity", reading.humidity.map(one_decimal));
        record.insert("ppm", reading.ppm.map(one_decimal));
        record
    }

    pub fn insert(&mut self, key: &str, value: Option<TelemetryValue>) {
        self.fields.insert(key.to_owned(), value);
    }

    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialise to the compact JSON payload.
    pub fn to_payload(&self) -> String {
        // map of strings to scalars cannot fail to serialise
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_owned())
    }
}

fn one_decimal(value: f64) -> TelemetryValue {
    TelemetryValue::Number((value * 10.0).round() / 10.0)
}
