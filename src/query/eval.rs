use super::ast::{Ast, Comparator};
use super::error::EvalError;
use super::functions::{compare_numbers, values_equal};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Evaluate a syntax tree against a JSON value
pub fn evaluate(ast: &Ast, data: &Value) -> Result<Value, EvalError> {
    match ast {
        Ast::Identity => Ok(data.clone()),
        Ast::Field(name) => Ok(data.get(name.as_str()).cloned().unwrap_or(Value::Null)),
        Ast::Subexpr(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            evaluate(rhs, &left)
        }
        Ast::Index(index) => Ok(match data {
            Value::Array(items) => resolve_index(items.len(), *index)
                .map(|i| items[i].clone())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Ast::Slice { start, stop, step } => match data {
            Value::Array(items) => Ok(Value::Array(slice(items, *start, *stop, *step)?)),
            _ => Ok(Value::Null),
        },
        Ast::Projection { lhs, rhs } => match evaluate(lhs, data)? {
            Value::Array(items) => project(&items, rhs),
            _ => Ok(Value::Null),
        },
        Ast::ObjectProjection { lhs, rhs } => match evaluate(lhs, data)? {
            Value::Object(map) => {
                let items: Vec<Value> = map.into_iter().map(|(_, value)| value).collect();
                project(&items, rhs)
            }
            _ => Ok(Value::Null),
        },
        Ast::Flatten(inner) => match evaluate(inner, data)? {
            Value::Array(items) => {
                let mut flat = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(nested) => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                Ok(Value::Array(flat))
            }
            _ => Ok(Value::Null),
        },
        Ast::FilterProjection {
            lhs,
            predicate,
            rhs,
        } => match evaluate(lhs, data)? {
            Value::Array(items) => {
                let mut selected = Vec::new();
                for item in &items {
                    if is_truthy(&evaluate(predicate, item)?) {
                        let value = evaluate(rhs, item)?;
                        if !value.is_null() {
                            selected.push(value);
                        }
                    }
                }
                Ok(Value::Array(selected))
            }
            _ => Ok(Value::Null),
        },
        Ast::Comparison { op, lhs, rhs } => {
            let left = evaluate(lhs, data)?;
            let right = evaluate(rhs, data)?;
            Ok(compare(*op, &left, &right))
        }
        Ast::And(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            if is_truthy(&left) {
                evaluate(rhs, data)
            } else {
                Ok(left)
            }
        }
        Ast::Or(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(rhs, data)
            }
        }
        Ast::Not(inner) => Ok(Value::Bool(!is_truthy(&evaluate(inner, data)?))),
        Ast::Pipe(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            evaluate(rhs, &left)
        }
        Ast::MultiList(items) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            items
                .iter()
                .map(|item| evaluate(item, data))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Ast::MultiHash(pairs) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            let mut map = Map::new();
            for (key, item) in pairs {
                map.insert(key.clone(), evaluate(item, data)?);
            }
            Ok(Value::Object(map))
        }
        Ast::Literal(value) => Ok(value.clone()),
        Ast::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, data))
                .collect::<Result<Vec<_>, _>>()?;
            function.call(args)
        }
    }
}

fn project(items: &[Value], rhs: &Ast) -> Result<Value, EvalError> {
    let mut projected = Vec::with_capacity(items.len());
    for item in items {
        let value = evaluate(rhs, item)?;
        if !value.is_null() {
            projected.push(value);
        }
    }
    Ok(Value::Array(projected))
}

fn compare(op: Comparator, left: &Value, right: &Value) -> Value {
    match op {
        Comparator::Eq => Value::Bool(values_equal(left, right)),
        Comparator::Ne => Value::Bool(!values_equal(left, right)),
        Comparator::Lt => ordered(left, right, Ordering::is_lt),
        Comparator::Le => ordered(left, right, Ordering::is_le),
        Comparator::Gt => ordered(left, right, Ordering::is_gt),
        Comparator::Ge => ordered(left, right, Ordering::is_ge),
    }
}

/// Ordering is only defined between numbers; anything else yields null
fn ordered(left: &Value, right: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            compare_numbers(a, b).map_or(Value::Null, |ordering| Value::Bool(test(ordering)))
        }
        _ => Value::Null,
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn slice(
    items: &[Value],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<Value>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::ZeroStep);
    }

    let len = items.len() as i64;
    let cap = |value: i64| -> i64 {
        if value < 0 {
            let shifted = value + len;
            if shifted >= 0 {
                shifted
            } else if step < 0 {
                -1
            } else {
                0
            }
        } else if value >= len {
            if step < 0 { len - 1 } else { len }
        } else {
            value
        }
    };

    let start = start.map_or(if step < 0 { len - 1 } else { 0 }, cap);
    let stop = stop.map_or(if step < 0 { -1 } else { len }, cap);

    let mut selected = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        selected.push(items[i as usize].clone());
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(selected)
}

/// `false`, `null`, empty strings, arrays and objects are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;
    use serde_json::json;

    fn search(expr: &str, data: &Value) -> Value {
        evaluate(&parse(expr).unwrap(), data).unwrap()
    }

    #[test]
    fn test_field_access_on_non_objects_is_null() {
        assert_eq!(search("a.b", &json!({"a": 1})), Value::Null);
        assert_eq!(search("a", &json!([1])), Value::Null);
    }

    #[test]
    fn test_index_and_slice() {
        let data = json!([0, 1, 2, 3, 4]);
        assert_eq!(search("[-1]", &data), json!(4));
        assert_eq!(search("[9]", &data), Value::Null);
        assert_eq!(search("[1:3]", &data), json!([1, 2]));
        assert_eq!(search("[::2]", &data), json!([0, 2, 4]));
        assert_eq!(search("[::-1]", &data), json!([4, 3, 2, 1, 0]));
        assert_eq!(search("[-2:]", &data), json!([3, 4]));
    }

    #[test]
    fn test_zero_step_is_an_eval_error() {
        let ast = parse("[::0]").unwrap();
        assert_eq!(evaluate(&ast, &json!([1])), Err(EvalError::ZeroStep));
    }

    #[test]
    fn test_huge_slice_steps_take_one_item() {
        let data = json!([1, 2, 3]);
        assert_eq!(search("[1::9223372036854775807]", &data), json!([2]));
        assert_eq!(search("[::-9223372036854775807]", &data), json!([3]));
    }

    #[test]
    fn test_ordering_of_large_integers_is_exact() {
        let data = json!({"a": 9007199254740993u64, "b": 9007199254740992u64});
        assert_eq!(search("a > b", &data), json!(true));
        assert_eq!(search("a == b", &data), json!(false));
        assert_eq!(search("a < `1.5`", &data), json!(false));
        assert_eq!(search("a < 'x'", &data), Value::Null);
    }

    #[test]
    fn test_projections_drop_nulls() {
        let data = json!([{"a": 1}, {"b": 2}, {"a": 3}]);
        assert_eq!(search("[*].a", &data), json!([1, 3]));
        assert_eq!(search("*", &json!({"x": 1, "y": 2})).as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_flatten() {
        assert_eq!(search("[]", &json!([[1, 2], 3, [4]])), json!([1, 2, 3, 4]));
        assert_eq!(search("[][]", &json!([[[1]], [[2]]])), json!([1, 2]));
    }

    #[test]
    fn test_filter_with_boolean_logic() {
        let data = json!([
            {"code": 200, "elb": "a"},
            {"code": 503, "elb": "a"},
            {"code": 504, "elb": "b"}
        ]);
        assert_eq!(
            search("[?code >= `500` && elb == 'a'].code", &data),
            json!([503])
        );
        assert_eq!(search("[?!(code == `200`)].elb", &data), json!(["a", "b"]));
        assert_eq!(search("[?code < 'x']", &data), json!([]));
    }

    #[test]
    fn test_pipe_stops_projection() {
        let data = json!([{"a": [1, 2]}, {"a": [3]}]);
        assert_eq!(search("[*].a[0]", &data), json!([1, 3]));
        assert_eq!(search("[*].a | [0]", &data), json!([1, 2]));
    }

    #[test]
    fn test_multi_select() {
        let data = json!({"client": {"ip": "1.2.3.4", "port": 80}, "code": 200});
        assert_eq!(
            search("{ip: client.ip, code: code}", &data),
            json!({"ip": "1.2.3.4", "code": 200})
        );
        assert_eq!(search("[code, client.port]", &data), json!([200, 80]));
        assert_eq!(search("missing.[a, b]", &data), Value::Null);
    }

    #[test]
    fn test_function_type_errors_surface() {
        let ast = parse("length(code)").unwrap();
        assert!(matches!(
            evaluate(&ast, &json!({"code": 200})),
            Err(EvalError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(0)));
    }
}
