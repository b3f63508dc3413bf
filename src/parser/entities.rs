use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::fmt;

/// A `host:port` pair as written by the load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Address {
    /// An address that split cleanly into ip and port
    Socket { ip: String, port: u16 },
    /// Anything without a `:` (ELB writes `-` when no backend was reached)
    Opaque(String),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Socket { ip, port } => write!(f, "{}:{}", ip, port),
            Address::Opaque(raw) => write!(f, "{}", raw),
        }
    }
}

/// A decoded value for a single field of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Address(Address),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            FieldValue::Address(Address::Opaque(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            FieldValue::Address(addr) => Some(addr),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// One decoded access-log entry
///
/// Fields keep the order of the schema they were decoded with. Records are
/// immutable once built; the only way to get one is through decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
    line: String,
    source: String,
}

impl Record {
    pub(crate) fn new(fields: Vec<(String, FieldValue)>, line: String, source: String) -> Self {
        Self {
            fields,
            line,
            source,
        }
    }

    /// Look up a decoded field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Decoded fields in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of decoded fields, not counting `_line` and `_source`
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The original, unaltered log line
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Identifier of the stream the line came from
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("_line", &self.line)?;
        map.serialize_entry("_source", &self.source)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_serializes_as_object_or_string() {
        let socket = FieldValue::Address(Address::Socket {
            ip: "10.0.0.1".to_string(),
            port: 80,
        });
        let opaque = FieldValue::Address(Address::Opaque("-".to_string()));

        assert_eq!(
            serde_json::to_value(&socket).unwrap(),
            json!({"ip": "10.0.0.1", "port": 80})
        );
        assert_eq!(serde_json::to_value(&opaque).unwrap(), json!("-"));
    }

    #[test]
    fn test_record_serializes_synthetic_attributes_last() {
        let record = Record::new(
            vec![
                ("elb".to_string(), FieldValue::Text("my-elb".to_string())),
                ("sent_bytes".to_string(), FieldValue::Integer(10)),
            ],
            "raw".to_string(),
            "a.log".to_string(),
        );

        let rendered = serde_json::to_string(&record).unwrap();
        assert_eq!(
            rendered,
            r#"{"elb":"my-elb","sent_bytes":10,"_line":"raw","_source":"a.log"}"#
        );
    }

    #[test]
    fn test_record_lookup() {
        let record = Record::new(
            vec![("elb_status_code".to_string(), FieldValue::Integer(503))],
            String::new(),
            String::new(),
        );

        assert_eq!(record.get("elb_status_code").and_then(FieldValue::as_i64), Some(503));
        assert!(record.get("backend").is_none());
        assert_eq!(record.len(), 1);
    }
}
