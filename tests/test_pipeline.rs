use elb_logs::input::InputStream;
use elb_logs::pipeline::BatchFilter;
use elb_logs::report::ErrorChannel;
use std::io::Cursor;
use std::num::NonZeroUsize;

fn stream(name: &str, lines: &[String]) -> InputStream {
    let mut data = lines.join("\n");
    data.push('\n');
    InputStream::new(name, Cursor::new(data.into_bytes()))
}

fn numbered(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("{{\"n\": {n}}}")).collect()
}

fn run(expr: &str, size: usize, input: InputStream) -> (elb_logs::FilterSummary, String, String) {
    colored::control::set_override(false);
    let filter = BatchFilter::compile(expr, NonZeroUsize::new(size).unwrap()).unwrap();
    let mut out = Vec::new();
    let mut errors = ErrorChannel::new(Vec::new());

    let summary = filter
        .filter_stream(input, &mut out, &mut errors)
        .expect("in-memory streams do not fail");

    (
        summary,
        String::from_utf8(out).unwrap(),
        String::from_utf8(errors.into_inner()).unwrap(),
    )
}

#[test]
fn test_1500_lines_take_two_evaluations() {
    let (summary, out, _) = run("[*].n | [length(@)]", 1000, stream("big", &numbered(1500)));

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records, 1500);
    // Each batch reports how many records the query saw
    assert_eq!(out, "1000\n500\n");
}

#[test]
fn test_malformed_line_is_excluded_not_fatal() {
    let mut lines = numbered(1500);
    lines[1000] = "{not json".to_string();

    let (summary, out, err) = run("[length(@)]", 1000, stream("big", &lines));

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(out, "1000\n499\n");
    assert!(err.contains("big: batch 2: invalid JSON"), "stderr: {err}");
    assert!(err.contains("{not json"));
}

#[test]
fn test_eval_error_skips_only_that_batch() {
    // Batch 2 carries a string where a number is expected
    let lines = vec![
        "{\"v\": 1}".to_string(),
        "{\"v\": 2}".to_string(),
        "{\"v\": \"x\"}".to_string(),
        "{\"v\": 4}".to_string(),
        "{\"v\": 5}".to_string(),
    ];

    let (summary, out, err) = run("[*].abs(v)", 2, stream("mixed", &lines));

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.eval_errors, 1);
    assert_eq!(out, "1\n2\n5\n");
    assert!(
        err.contains("mixed: batch 2 (lines 3-4, 2 records): function abs()"),
        "stderr: {err}"
    );
}

#[test]
fn test_failed_batch_reports_its_raw_lines() {
    let lines = vec![
        "{\"v\": 1}".to_string(),
        String::new(),
        "{\"v\": \"x\"}".to_string(),
        "not json".to_string(),
        "{\"v\": 2}".to_string(),
    ];

    let (summary, out, err) = run("[*].abs(v)", 10, stream("raw", &lines));

    assert_eq!(summary.eval_errors, 1);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(out, "");
    let reported: Vec<&str> = err.lines().collect();
    assert_eq!(reported.len(), 6, "stderr: {err}");
    assert!(reported[0].starts_with("error: raw: batch 1: invalid JSON"));
    assert_eq!(reported[1], "not json");
    assert!(reported[2].starts_with("error: raw: batch 1 (lines 1-5, 3 records): function abs()"));
    assert_eq!(&reported[3..], ["{\"v\": 1}", "{\"v\": \"x\"}", "{\"v\": 2}"]);
}

#[test]
fn test_output_order_follows_batches() {
    let (summary, out, _) = run("[*].n", 3, stream("ordered", &numbered(8)));

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.emitted, 8);
    let emitted: Vec<&str> = out.lines().collect();
    assert_eq!(emitted, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);
}

#[test]
fn test_query_controls_order_within_a_batch() {
    let (_, out, _) = run("reverse([*].n)", 2, stream("rev", &numbered(4)));
    assert_eq!(out, "2\n1\n4\n3\n");
}

#[test]
fn test_filter_selects_records_across_batches() {
    let lines: Vec<String> = [200, 503, 200, 500, 302]
        .iter()
        .map(|code| format!("{{\"elb_status_code\": {code}}}"))
        .collect();

    let (summary, out, _) = run("[?elb_status_code > `299`]", 2, stream("codes", &lines));

    assert_eq!(summary.emitted, 3);
    assert_eq!(
        out,
        "{\"elb_status_code\":503}\n{\"elb_status_code\":500}\n{\"elb_status_code\":302}\n"
    );
}

#[test]
fn test_windows_do_not_span_streams() {
    colored::control::set_override(false);
    let filter = BatchFilter::compile("[length(@)]", NonZeroUsize::new(4).unwrap()).unwrap();
    let mut out = Vec::new();
    let mut errors = ErrorChannel::new(Vec::new());

    let mut batches = 0;
    for input in [stream("a", &numbered(3)), stream("b", &numbered(3))] {
        batches += filter
            .filter_stream(input, &mut out, &mut errors)
            .unwrap()
            .batches;
    }

    assert_eq!(batches, 2);
    assert_eq!(String::from_utf8(out).unwrap(), "3\n3\n");
}

#[test]
fn test_window_with_only_bad_lines_still_evaluates_empty_batch() {
    let lines = vec!["nope".to_string(), "also nope".to_string()];
    let (summary, out, _) = run("[length(@)]", 5, stream("bad", &lines));

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.parse_errors, 2);
    assert_eq!(out, "0\n");
}
