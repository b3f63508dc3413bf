use super::entities::{Address, FieldValue};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

/// Naive layouts accepted after RFC 3339; these are interpreted as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a single token could not be converted into its field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field '{field}': '{value}' is not a valid timestamp")]
    Timestamp { field: String, value: String },

    #[error("field '{field}': '{value}' is not a valid integer")]
    Integer { field: String, value: String },

    #[error("field '{field}': '{value}' is not a valid number")]
    Float { field: String, value: String },

    #[error("field '{field}': '{value}' does not end in a valid port")]
    Port { field: String, value: String },
}

/// How a field converts between its token and its decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// ISO-8601 text decoded to whole epoch seconds (UTC)
    Timestamp,
    /// Kept verbatim
    Text,
    /// `ip:port`, split on the last colon
    Address,
    Float,
    Integer,
}

/// A named, positional field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Convert a raw token into this field's typed value
    pub fn decode(&self, token: &str) -> Result<FieldValue, FieldError> {
        match self.kind {
            FieldKind::Timestamp => parse_timestamp(token)
                .map(FieldValue::Integer)
                .ok_or_else(|| FieldError::Timestamp {
                    field: self.name.clone(),
                    value: token.to_string(),
                }),
            FieldKind::Text => Ok(FieldValue::Text(token.to_string())),
            FieldKind::Address => self.decode_address(token).map(FieldValue::Address),
            FieldKind::Float => token
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| FieldError::Float {
                    field: self.name.clone(),
                    value: token.to_string(),
                }),
            FieldKind::Integer => token
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| FieldError::Integer {
                    field: self.name.clone(),
                    value: token.to_string(),
                }),
        }
    }

    /// Render a decoded value back to the textual form it was read from
    pub fn encode(&self, value: &FieldValue) -> String {
        match (self.kind, value) {
            (FieldKind::Timestamp, FieldValue::Integer(secs)) => format_timestamp(*secs)
                .unwrap_or_else(|| secs.to_string()),
            _ => value.to_string(),
        }
    }

    fn decode_address(&self, token: &str) -> Result<Address, FieldError> {
        let Some((ip, port)) = token.rsplit_once(':') else {
            return Ok(Address::Opaque(token.to_string()));
        };

        let port = port.parse::<u16>().map_err(|_| FieldError::Port {
            field: self.name.clone(),
            value: token.to_string(),
        })?;

        Ok(Address::Socket {
            ip: ip.to_string(),
            port,
        })
    }
}

/// Ordered list of field definitions matched positionally against tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// The classic ELB access-log layout
    pub fn elb() -> Self {
        Self::new(vec![
            FieldDef::new("timestamp", FieldKind::Timestamp),
            FieldDef::new("elb", FieldKind::Text),
            FieldDef::new("client", FieldKind::Address),
            FieldDef::new("backend", FieldKind::Address),
            FieldDef::new("request_processing_time", FieldKind::Float),
            FieldDef::new("backend_processing_time", FieldKind::Float),
            FieldDef::new("response_processing_time", FieldKind::Float),
            FieldDef::new("elb_status_code", FieldKind::Integer),
            FieldDef::new("backend_status_code", FieldKind::Integer),
            FieldDef::new("received_bytes", FieldKind::Integer),
            FieldDef::new("sent_bytes", FieldKind::Integer),
            FieldDef::new("request", FieldKind::Text),
        ])
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::elb()
    }
}

/// Parse an ISO-8601 timestamp into whole epoch seconds (UTC)
pub fn parse_timestamp(value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }

    NAIVE_TIMESTAMP_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|ndt| Utc.from_utc_datetime(&ndt).timestamp())
    })
}

/// Render epoch seconds as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_timestamp(secs: i64) -> Option<String> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        assert_eq!(parse_timestamp("2015-01-01T00:00:00.000000Z"), Some(1420070400));
        assert_eq!(parse_timestamp("2015-01-01T01:00:00+01:00"), Some(1420070400));
        assert_eq!(parse_timestamp("2015-01-01T00:00:00.999"), Some(1420070400));
        assert_eq!(parse_timestamp("2015-01-01 00:00:01"), Some(1420070401));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_timestamp_encode() {
        let def = FieldDef::new("timestamp", FieldKind::Timestamp);
        assert_eq!(
            def.encode(&FieldValue::Integer(1420070400)),
            "2015-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_address_decode() {
        let def = FieldDef::new("client", FieldKind::Address);

        assert_eq!(
            def.decode("10.0.0.1:80").unwrap(),
            FieldValue::Address(Address::Socket {
                ip: "10.0.0.1".to_string(),
                port: 80
            })
        );
        assert_eq!(
            def.decode("-").unwrap(),
            FieldValue::Address(Address::Opaque("-".to_string()))
        );
        assert!(matches!(
            def.decode("10.0.0.1:http"),
            Err(FieldError::Port { .. })
        ));
    }

    #[test]
    fn test_address_splits_on_last_colon() {
        let def = FieldDef::new("client", FieldKind::Address);
        let value = def.decode("::1:443").unwrap();

        assert_eq!(
            value,
            FieldValue::Address(Address::Socket {
                ip: "::1".to_string(),
                port: 443
            })
        );
        assert_eq!(def.encode(&value), "::1:443");
    }

    #[test]
    fn test_numeric_decode_errors_name_the_field() {
        let def = FieldDef::new("elb_status_code", FieldKind::Integer);
        let err = def.decode("-").unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'elb_status_code': '-' is not a valid integer"
        );
    }

    #[test]
    fn test_elb_schema_order() {
        let schema = Schema::elb();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"timestamp"));
        assert_eq!(names.last(), Some(&"request"));
        assert_eq!(schema.len(), 12);
        assert_eq!(schema.field("sent_bytes").map(|f| f.kind), Some(FieldKind::Integer));
    }
}
