use crate::input::InputStream;
use crate::query::{CompileError, CompiledQuery, EvalError};
use crate::report::ErrorChannel;
use serde_json::Value;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use tracing::debug;

mod window;

pub use window::{Batched, Window, Windows};

/// Counters for one `filter` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Number of query evaluations performed
    pub batches: usize,
    /// Records that parsed and were handed to the query
    pub records: usize,
    /// Values written to the output
    pub emitted: usize,
    pub parse_errors: usize,
    pub eval_errors: usize,
}

impl std::ops::AddAssign for FilterSummary {
    fn add_assign(&mut self, other: Self) {
        self.batches += other.batches;
        self.records += other.records;
        self.emitted += other.emitted;
        self.parse_errors += other.parse_errors;
        self.eval_errors += other.eval_errors;
    }
}

/// Evaluates a compiled query over fixed-size windows of JSON records
#[derive(Debug, Clone)]
pub struct BatchFilter {
    query: CompiledQuery,
    batch_size: NonZeroUsize,
}

impl BatchFilter {
    pub fn new(query: CompiledQuery, batch_size: NonZeroUsize) -> Self {
        Self { query, batch_size }
    }

    pub fn compile(expression: &str, batch_size: NonZeroUsize) -> Result<Self, CompileError> {
        Ok(Self::new(CompiledQuery::compile(expression)?, batch_size))
    }

    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Run the query over one batch of parsed records
    ///
    /// Returns the values to emit, in the order the query produced them.
    pub fn evaluate_batch(&self, records: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        let result = self.query.search(&Value::Array(records))?;
        Ok(match result {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    /// Window one input stream and emit every selected value as a JSON line
    ///
    /// Windows never span streams. A line that is not valid JSON is reported
    /// and left out of its window; a batch whose evaluation fails is reported
    /// with its line range and the raw lines it evaluated, then skipped.
    /// Blank lines are ignored. Only I/O failures abort.
    pub fn filter_stream<W: Write, E: Write>(
        &self,
        input: InputStream,
        out: &mut W,
        errors: &mut ErrorChannel<E>,
    ) -> io::Result<FilterSummary> {
        let name = input.name().to_string();
        let mut summary = FilterSummary::default();
        let lines = input
            .lines()
            .enumerate()
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()));

        for window in lines.batched(self.batch_size) {
            let batch = window.index + 1;
            let first = window.items.first().map_or(0, |(number, _)| number + 1);
            let last = window.items.last().map_or(0, |(number, _)| number + 1);
            let mut records = Vec::with_capacity(window.len());
            let mut raw = Vec::with_capacity(window.len());

            for (_, line) in window.items {
                let line = line?;
                match serde_json::from_str::<Value>(&line) {
                    Ok(record) => {
                        records.push(record);
                        raw.push(line);
                    }
                    Err(e) => {
                        errors.report(
                            format_args!("{name}: batch {batch}: invalid JSON: {e}"),
                            Some(line.as_str()),
                        )?;
                        summary.parse_errors += 1;
                    }
                }
            }

            summary.batches += 1;
            let count = records.len();
            summary.records += count;
            debug!(source = %name, batch, records = count, first, last, "evaluating batch");

            match self.evaluate_batch(records) {
                Ok(values) => {
                    for value in &values {
                        serde_json::to_writer(&mut *out, value)?;
                        out.write_all(b"\n")?;
                    }
                    summary.emitted += values.len();
                }
                Err(e) => {
                    let raw = raw.join("\n");
                    errors.report(
                        format_args!(
                            "{name}: batch {batch} (lines {first}-{last}, {count} records): {e}"
                        ),
                        (!raw.is_empty()).then_some(raw.as_str()),
                    )?;
                    summary.eval_errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn filter(expr: &str, size: usize) -> BatchFilter {
        BatchFilter::compile(expr, NonZeroUsize::new(size).unwrap()).unwrap()
    }

    #[test]
    fn test_evaluate_batch_unwraps_results() {
        let f = filter("[*].a", 10);
        assert_eq!(
            f.evaluate_batch(vec![json!({"a": 1}), json!({"a": 2})]).unwrap(),
            vec![json!(1), json!(2)]
        );

        let f = filter("length(@)", 10);
        assert_eq!(f.evaluate_batch(vec![json!({})]).unwrap(), vec![json!(1)]);

        let f = filter("[0].missing", 10);
        assert!(f.evaluate_batch(vec![json!({})]).unwrap().is_empty());
    }

    #[test]
    fn test_filter_stream_skips_blank_lines() {
        colored::control::set_override(false);
        let input = "{\"a\":1}\n\n   \n{\"a\":2}\n";
        let stream = InputStream::new("mem", Cursor::new(input.as_bytes().to_vec()));
        let mut out = Vec::new();
        let mut errors = ErrorChannel::new(Vec::new());

        let summary = filter("[*].a", 1)
            .filter_stream(stream, &mut out, &mut errors)
            .unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.emitted, 2);
        assert_eq!(errors.reported(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "1\n2\n");
    }
}
