use chrono::FixedOffset;
use histview::align::{CsvSink, ExportOutcome, JsonSink, ResultSink, merge_series};
use histview::core::{PanelConfig, PanelVariable, RunState, SeriesKind, VariableRef};
use histview::history::{
    HistoryData, HistoryQuery, HistoryQueryEngine, MemoryHistory, RUN_NUMBER_TAG, RUN_STATE_TAG,
    RUN_TRANSITIONS_EVENT, SeriesStatus,
};
use histview::HistoryError;

fn panel(tags: &[&str]) -> PanelConfig {
    PanelConfig::default().with_variables(
        tags.iter()
            .map(|tag| PanelVariable::new(VariableRef::new("Slow", *tag)))
            .collect(),
    )
}

fn two_series() -> HistoryData {
    let mut data = HistoryData::with_capacity(2);
    data.push(
        VariableRef::new("Slow", "A"),
        SeriesKind::Variable(0),
        SeriesStatus::Ok,
        vec![0, 10, 20],
        vec![1.0, 2.0, 3.0],
    )
    .expect("push a");
    data.push(
        VariableRef::new("Slow", "B"),
        SeriesKind::Variable(1),
        SeriesStatus::Ok,
        vec![0, 15],
        vec![100.0, 150.0],
    )
    .expect("push b");
    data
}

#[test]
fn rows_cover_union_of_sample_times() {
    let outcome = merge_series(&two_series(), &panel(&["A", "B"]));
    let table = outcome.table().expect("table");

    let times: Vec<i64> = table.rows.iter().map(|row| row.time).collect();
    assert_eq!(times, [0, 10, 15, 20]);

    let a: Vec<Option<f64>> = table.rows.iter().map(|row| row.values[0]).collect();
    let b: Vec<Option<f64>> = table.rows.iter().map(|row| row.values[1]).collect();
    assert_eq!(a, [Some(1.0), Some(2.0), Some(2.0), Some(3.0)]);
    assert_eq!(b, [Some(100.0), Some(100.0), Some(150.0), Some(150.0)]);

    let names: Vec<&str> = table.columns.iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, ["Slow:A", "Slow:B"]);
    assert!(!table.run_markers);
}

#[test]
fn first_row_waits_for_the_latest_starting_variable() {
    let mut data = HistoryData::with_capacity(2);
    data.push(
        VariableRef::new("Slow", "A"),
        SeriesKind::Variable(0),
        SeriesStatus::Ok,
        vec![0, 10, 20],
        vec![1.0, 2.0, 3.0],
    )
    .expect("push a");
    data.push(
        VariableRef::new("Slow", "B"),
        SeriesKind::Variable(1),
        SeriesStatus::Ok,
        vec![12],
        vec![7.0],
    )
    .expect("push b");

    let outcome = merge_series(&data, &panel(&["A", "B"]));
    let table = outcome.table().expect("table");
    let times: Vec<i64> = table.rows.iter().map(|row| row.time).collect();
    assert_eq!(times, [12, 20]);
    assert_eq!(table.rows[0].values.as_slice(), [Some(2.0), Some(7.0)]);
}

#[test]
fn empty_variable_leaves_blank_column() {
    let mut data = two_series();
    data.push(
        VariableRef::new("Slow", "C"),
        SeriesKind::Variable(2),
        SeriesStatus::NoDataInWindow,
        Vec::new(),
        Vec::new(),
    )
    .expect("push c");

    let outcome = merge_series(&data, &panel(&["A", "B", "C"]));
    let table = outcome.table().expect("table");
    assert_eq!(table.rows.len(), 4);
    assert!(table.rows.iter().all(|row| row.values[2].is_none()));
}

#[test]
fn no_samples_anywhere_is_no_data() {
    let mut data = HistoryData::with_capacity(1);
    data.push(
        VariableRef::new("Slow", "A"),
        SeriesKind::Variable(0),
        SeriesStatus::NotFound,
        Vec::new(),
        Vec::new(),
    )
    .expect("push");
    let outcome = merge_series(&data, &panel(&["A"]));
    assert_eq!(outcome, ExportOutcome::NoData);

    let mut sink = CsvSink::new(Vec::new(), FixedOffset::east_opt(0).expect("utc"));
    let err = sink.write_outcome(&outcome).expect_err("no data");
    assert!(matches!(err, HistoryError::NoDataEver));
}

#[test]
fn csv_output_is_idempotent() {
    let utc = FixedOffset::east_opt(0).expect("utc");
    let data = two_series();
    let panel = panel(&["A", "B"]);

    let render = || {
        let mut sink = CsvSink::new(Vec::new(), utc);
        sink.write_outcome(&merge_series(&data, &panel))
            .expect("csv");
        String::from_utf8(sink.into_inner()).expect("utf8")
    };
    let first = render();
    assert_eq!(first, render());

    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(lines[0], "Time,Timestamp,Slow:A,Slow:B");
    assert_eq!(lines[1], "1970/01/01 00:00:00,0,1,100");
    assert_eq!(lines[3], "1970/01/01 00:00:15,15,2,150");
    assert_eq!(lines.len(), 5);
}

#[test]
fn run_markers_add_rows_and_columns() {
    let mut history = MemoryHistory::new();
    history.write_scalar("Slow", "A", 100, 1.0).expect("write");
    history.write_scalar("Slow", "A", 200, 2.0).expect("write");
    history
        .write_scalar(RUN_TRANSITIONS_EVENT, RUN_STATE_TAG, 150, 3.0)
        .expect("write");
    history
        .write_scalar(RUN_TRANSITIONS_EVENT, RUN_NUMBER_TAG, 150, 42.0)
        .expect("write");

    let mut panel = panel(&["A"]);
    panel.variables[0] = panel.variables[0].clone().with_label("Temp, inlet");
    let window = histview::core::TimeWindow::new(50, 300).expect("window");
    let data = HistoryQueryEngine::new(&history)
        .query(&panel, HistoryQuery::new(window).with_run_markers(true))
        .expect("query");

    let outcome = merge_series(&data, &panel);
    let table = outcome.table().expect("table");
    assert!(table.run_markers);
    let times: Vec<i64> = table.rows.iter().map(|row| row.time).collect();
    assert_eq!(times, [100, 150, 200]);
    assert_eq!(table.rows[0].run.and_then(|run| run.state), None);
    let run = table.rows[1].run.expect("run cell");
    assert_eq!(run.number, Some(42));
    assert_eq!(run.state, Some(RunState::Running));

    let utc = FixedOffset::east_opt(0).expect("utc");
    let mut sink = CsvSink::new(Vec::new(), utc);
    sink.write_table(table).expect("csv");
    let csv = String::from_utf8(sink.into_inner()).expect("utf8");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Time,Timestamp,Run,Run State,\"Temp, inlet\"");
    assert_eq!(lines[1], "1970/01/01 00:01:40,100,,,1");
    assert_eq!(lines[2], "1970/01/01 00:02:30,150,42,Running,1");
}

#[test]
fn json_sink_writes_rows() {
    let outcome = merge_series(&two_series(), &panel(&["A", "B"]));
    let mut sink = JsonSink::new(Vec::new());
    sink.write_outcome(&outcome).expect("json");
    let value: serde_json::Value =
        serde_json::from_slice(&sink.into_inner()).expect("valid json");
    assert_eq!(value["rows"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["rows"][2]["time"], 15);
    assert_eq!(value["columns"][1]["name"], "Slow:B");
}
