use crate::input::InputStream;
use crate::report::ErrorChannel;
use std::io::{self, Write};
use thiserror::Error;
use tracing::debug;

mod entities;
mod schema;
mod tokenize;

pub use entities::{Address, FieldValue, Record};
pub use schema::{
    FieldDef, FieldError, FieldKind, Schema, format_timestamp, parse_timestamp,
};
pub use tokenize::{TokenizeError, split as split_tokens};

/// What went wrong while decoding a line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("{0}")]
    Tokenize(#[from] TokenizeError),

    #[error("{0}")]
    Field(#[from] FieldError),
}

/// A line that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}: {kind}")]
pub struct DecodeError {
    pub line: String,
    pub source_name: String,
    pub kind: DecodeErrorKind,
}

/// Counters for one `parse` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub records: usize,
    pub errors: usize,
}

impl std::ops::AddAssign for ParseSummary {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.errors += other.errors;
    }
}

/// Decodes raw access-log lines into records using a fixed schema
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    schema: Schema,
}

impl RecordCodec {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode one line into a record
    ///
    /// Tokens are paired positionally with the schema's fields. Extra tokens
    /// are ignored and fields past the last token are left out. Any failed
    /// conversion rejects the whole line.
    pub fn decode(&self, line: &str, source: &str) -> Result<Record, DecodeError> {
        let fail = |kind: DecodeErrorKind| DecodeError {
            line: line.to_string(),
            source_name: source.to_string(),
            kind,
        };

        let tokens = tokenize::split(line).map_err(|e| fail(e.into()))?;
        let fields = self
            .schema
            .fields()
            .iter()
            .zip(&tokens)
            .map(|(def, token)| -> Result<_, FieldError> {
                Ok((def.name.clone(), def.decode(token)?))
            })
            .collect::<Result<Vec<_>, FieldError>>()
            .map_err(|e| fail(e.into()))?;

        Ok(Record::new(fields, line.to_string(), source.to_string()))
    }

    /// Render one field of a record back to its textual form
    ///
    /// Returns `None` if the schema has no such field or the record does not
    /// carry it.
    pub fn encode(&self, record: &Record, field: &str) -> Option<String> {
        let def = self.schema.field(field)?;
        record.get(field).map(|value| def.encode(value))
    }

    /// Decode every line of a stream, writing one JSON record per line
    ///
    /// Decode failures go to the error channel together with the raw line.
    /// Blank lines are skipped. Only I/O failures abort the stream.
    pub fn parse_stream<W: Write, E: Write>(
        &self,
        input: InputStream,
        out: &mut W,
        errors: &mut ErrorChannel<E>,
    ) -> io::Result<ParseSummary> {
        let source = input.name().to_string();
        let mut summary = ParseSummary::default();

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.decode(&line, &source) {
                Ok(record) => {
                    serde_json::to_writer(&mut *out, &record)?;
                    out.write_all(b"\n")?;
                    summary.records += 1;
                }
                Err(e) => {
                    debug!(source = %source, error = %e.kind, "skipping undecodable line");
                    errors.report(&e, Some(e.line.as_str()))?;
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}
