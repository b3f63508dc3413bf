use super::error::{CompileError, EvalError};
use super::eval::type_name;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// Built-in functions callable from a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Avg,
    Contains,
    EndsWith,
    Join,
    Keys,
    Length,
    Max,
    Min,
    NotNull,
    Reverse,
    Sort,
    StartsWith,
    Sum,
    ToNumber,
    ToString,
    Type,
    Values,
}

enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Function {
    pub fn lookup(name: &str) -> Result<Self, CompileError> {
        let function = match name {
            "abs" => Function::Abs,
            "avg" => Function::Avg,
            "contains" => Function::Contains,
            "ends_with" => Function::EndsWith,
            "join" => Function::Join,
            "keys" => Function::Keys,
            "length" => Function::Length,
            "max" => Function::Max,
            "min" => Function::Min,
            "not_null" => Function::NotNull,
            "reverse" => Function::Reverse,
            "sort" => Function::Sort,
            "starts_with" => Function::StartsWith,
            "sum" => Function::Sum,
            "to_number" => Function::ToNumber,
            "to_string" => Function::ToString,
            "type" => Function::Type,
            "values" => Function::Values,
            _ => return Err(CompileError::UnknownFunction(name.to_string())),
        };
        Ok(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Avg => "avg",
            Function::Contains => "contains",
            Function::EndsWith => "ends_with",
            Function::Join => "join",
            Function::Keys => "keys",
            Function::Length => "length",
            Function::Max => "max",
            Function::Min => "min",
            Function::NotNull => "not_null",
            Function::Reverse => "reverse",
            Function::Sort => "sort",
            Function::StartsWith => "starts_with",
            Function::Sum => "sum",
            Function::ToNumber => "to_number",
            Function::ToString => "to_string",
            Function::Type => "type",
            Function::Values => "values",
        }
    }

    fn arity(&self) -> Arity {
        match self {
            Function::Contains
            | Function::EndsWith
            | Function::Join
            | Function::StartsWith => Arity::Exact(2),
            Function::NotNull => Arity::AtLeast(1),
            _ => Arity::Exact(1),
        }
    }

    pub fn check_arity(&self, actual: usize) -> Result<(), CompileError> {
        let (ok, expected) = match self.arity() {
            Arity::Exact(n) => (actual == n, n.to_string()),
            Arity::AtLeast(n) => (actual >= n, format!("at least {n}")),
        };
        if ok {
            Ok(())
        } else {
            Err(CompileError::Arity {
                name: self.name().to_string(),
                expected,
                actual,
            })
        }
    }

    /// Apply the function to already-evaluated arguments
    pub fn call(&self, args: Vec<Value>) -> Result<Value, EvalError> {
        let call = Call {
            function: *self,
            args: &args,
        };

        match self {
            Function::Abs => Ok(number(call.number(0)?.abs())),
            Function::Avg => {
                let items = call.numbers(0)?;
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(number(items.iter().sum::<f64>() / items.len() as f64))
                }
            }
            Function::Contains => match &args[0] {
                Value::Array(items) => Ok(Value::Bool(
                    items.iter().any(|item| values_equal(item, &args[1])),
                )),
                Value::String(text) => {
                    let needle = call.string(1)?;
                    Ok(Value::Bool(text.contains(needle)))
                }
                other => Err(call.invalid(0, "array or string", other)),
            },
            Function::EndsWith => Ok(Value::Bool(call.string(0)?.ends_with(call.string(1)?))),
            Function::StartsWith => {
                Ok(Value::Bool(call.string(0)?.starts_with(call.string(1)?)))
            }
            Function::Join => {
                let separator = call.string(0)?;
                let parts = call
                    .array(1)?
                    .iter()
                    .map(|item| item.as_str().ok_or_else(|| call.invalid(1, "array[string]", item)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::String(parts.join(separator)))
            }
            Function::Keys => Ok(Value::Array(
                call.object(0)?.keys().cloned().map(Value::String).collect(),
            )),
            Function::Values => Ok(Value::Array(call.object(0)?.values().cloned().collect())),
            Function::Length => match &args[0] {
                Value::String(text) => Ok(Value::from(text.chars().count())),
                Value::Array(items) => Ok(Value::from(items.len())),
                Value::Object(map) => Ok(Value::from(map.len())),
                other => Err(call.invalid(0, "string, array or object", other)),
            },
            Function::Max => call.extreme(Ordering::Greater),
            Function::Min => call.extreme(Ordering::Less),
            Function::NotNull => Ok(args
                .iter()
                .find(|value| !value.is_null())
                .cloned()
                .unwrap_or(Value::Null)),
            Function::Reverse => match &args[0] {
                Value::String(text) => Ok(Value::String(text.chars().rev().collect())),
                Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
                other => Err(call.invalid(0, "array or string", other)),
            },
            Function::Sort => {
                let mut items = call.array(0)?.clone();
                call.check_sortable(&items)?;
                items.sort_by(compare_sortable);
                Ok(Value::Array(items))
            }
            Function::Sum => Ok(number(call.numbers(0)?.iter().sum())),
            Function::ToNumber => Ok(match &args[0] {
                Value::Number(_) => args[0].clone(),
                Value::String(text) => text
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| text.trim().parse::<f64>().map(number))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            Function::ToString => Ok(match &args[0] {
                Value::String(_) => args[0].clone(),
                other => Value::String(other.to_string()),
            }),
            Function::Type => Ok(Value::String(type_name(&args[0]).to_string())),
        }
    }
}

struct Call<'a> {
    function: Function,
    args: &'a [Value],
}

impl<'a> Call<'a> {
    fn invalid(&self, position: usize, expected: &str, actual: &Value) -> EvalError {
        EvalError::InvalidType {
            name: self.function.name().to_string(),
            position: position + 1,
            expected: expected.to_string(),
            actual: type_name(actual).to_string(),
        }
    }

    fn number(&self, i: usize) -> Result<f64, EvalError> {
        self.args[i]
            .as_f64()
            .ok_or_else(|| self.invalid(i, "number", &self.args[i]))
    }

    fn string(&self, i: usize) -> Result<&'a str, EvalError> {
        self.args[i]
            .as_str()
            .ok_or_else(|| self.invalid(i, "string", &self.args[i]))
    }

    fn array(&self, i: usize) -> Result<&'a Vec<Value>, EvalError> {
        self.args[i]
            .as_array()
            .ok_or_else(|| self.invalid(i, "array", &self.args[i]))
    }

    fn object(&self, i: usize) -> Result<&'a Map<String, Value>, EvalError> {
        self.args[i]
            .as_object()
            .ok_or_else(|| self.invalid(i, "object", &self.args[i]))
    }

    fn numbers(&self, i: usize) -> Result<Vec<f64>, EvalError> {
        self.array(i)?
            .iter()
            .map(|item| item.as_f64().ok_or_else(|| self.invalid(i, "array[number]", item)))
            .collect()
    }

    /// Arrays must hold only numbers or only strings
    fn check_sortable(&self, items: &[Value]) -> Result<(), EvalError> {
        let all_numbers = items.iter().all(Value::is_number);
        let all_strings = items.iter().all(Value::is_string);
        if all_numbers || all_strings {
            Ok(())
        } else {
            let offender = items
                .iter()
                .find(|item| !item.is_number() && !item.is_string())
                .unwrap_or(&items[0]);
            Err(self.invalid(0, "array[number] or array[string]", offender))
        }
    }

    fn extreme(&self, want: Ordering) -> Result<Value, EvalError> {
        let items = self.array(0)?;
        self.check_sortable(items)?;
        Ok(items
            .iter()
            .reduce(|best, item| {
                if compare_sortable(item, best) == want {
                    item
                } else {
                    best
                }
            })
            .cloned()
            .unwrap_or(Value::Null))
    }
}

fn compare_sortable(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Integers compare exactly; floats fall back to `f64`
pub(crate) fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    fn integer(n: &Number) -> Option<i128> {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    }

    match (integer(a), integer(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Build a JSON number, preferring an integer when the value is integral
pub(crate) fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// JSON equality that treats `1` and `1.0` as the same number
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => a == b,
    }
}
