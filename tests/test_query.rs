use elb_logs::parser::RecordCodec;
use elb_logs::query::{CompileError, CompiledQuery, EvalError};
use serde_json::{Value, json};

fn records() -> Value {
    json!([
        {"elb": "web", "elb_status_code": 200, "client": {"ip": "10.0.0.1", "port": 80},
         "request": "GET http://x/ HTTP/1.1", "sent_bytes": 100},
        {"elb": "web", "elb_status_code": 503, "client": {"ip": "10.0.0.2", "port": 81},
         "request": "POST http://x/api HTTP/1.1", "sent_bytes": 0},
        {"elb": "api", "elb_status_code": 404, "client": "-",
         "request": "GET http://y/missing HTTP/1.1", "sent_bytes": 12}
    ])
}

fn search(expr: &str) -> Value {
    CompiledQuery::compile(expr)
        .expect("expression should compile")
        .search(&records())
        .expect("expression should evaluate")
}

#[test]
fn test_status_filter_selects_failed_request() {
    let batch = json!([{"elb_status_code": 200}, {"elb_status_code": 503}]);
    let query = CompiledQuery::compile("[?elb_status_code > `299`]").unwrap();

    assert_eq!(query.search(&batch).unwrap(), json!([{"elb_status_code": 503}]));
}

#[test]
fn test_projection_of_nested_fields() {
    assert_eq!(search("[*].client.ip"), json!(["10.0.0.1", "10.0.0.2"]));
    assert_eq!(search("[?elb == 'api'].client"), json!(["-"]));
}

#[test]
fn test_function_predicates() {
    assert_eq!(
        search("[?starts_with(request, 'POST')].client.port"),
        json!([81])
    );
    assert_eq!(
        search("[?contains(request, 'missing')].elb_status_code"),
        json!([404])
    );
    assert_eq!(search("[*].sent_bytes | sum(@)"), json!(112));
    assert_eq!(search("length([?elb == 'web'])"), json!(2));
}

#[test]
fn test_reshaping_output() {
    assert_eq!(
        search("[?elb_status_code >= `400`].{code: elb_status_code, elb: elb}"),
        json!([{"code": 503, "elb": "web"}, {"code": 404, "elb": "api"}])
    );
    assert_eq!(search("[0:2].elb_status_code"), json!([200, 503]));
    assert_eq!(search("reverse([*].elb_status_code)"), json!([404, 503, 200]));
}

#[test]
fn test_query_over_decoded_records() {
    let codec = RecordCodec::default();
    let lines = [
        r#"2015-01-01T00:00:00Z a 10.0.0.1:80 10.0.0.2:80 0.1 0.2 0.0 200 200 0 10 "GET http://x/ HTTP/1.1""#,
        r#"2015-01-01T00:00:05Z a 10.0.0.3:80 10.0.0.2:80 0.1 2.5 0.0 504 504 0 0 "GET http://x/slow HTTP/1.1""#,
    ];
    let batch: Vec<Value> = lines
        .iter()
        .map(|line| serde_json::to_value(codec.decode(line, "mem").unwrap()).unwrap())
        .collect();

    let query =
        CompiledQuery::compile("[?backend_processing_time > `1.0`].[timestamp, _source]").unwrap();
    assert_eq!(
        query.search(&Value::Array(batch)).unwrap(),
        json!([[1420070405, "mem"]])
    );
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        CompiledQuery::compile("[?elb_status_code >"),
        Err(CompileError::Syntax { .. })
    ));
    assert_eq!(
        CompiledQuery::compile("frobnicate(@)"),
        Err(CompileError::UnknownFunction("frobnicate".to_string()))
    );
    assert!(matches!(
        CompiledQuery::compile("starts_with(request)"),
        Err(CompileError::Arity { .. })
    ));
}

#[test]
fn test_eval_error_on_type_mismatch() {
    let query = CompiledQuery::compile("[?starts_with(client, '10.')]").unwrap();
    let err = query.search(&records()).unwrap_err();

    assert!(matches!(err, EvalError::InvalidType { ref name, .. } if name == "starts_with"));
}
