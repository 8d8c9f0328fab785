use histview::core::{PanelConfig, PanelVariable, SeriesKind, TimeWindow, UnixTime, VariableRef};
use histview::history::{
    HistoryBackend, HistoryBackendHandle, HistoryQuery, HistoryQueryEngine, MemoryHistory,
    RUN_STATE_TAG, RUN_TRANSITIONS_EVENT, SeriesReadout, SeriesStatus, SharedBackend,
};
use histview::{EngineConfig, HistoryError, HistoryResult};

fn panel(tags: &[&str]) -> PanelConfig {
    PanelConfig::default().with_variables(
        tags.iter()
            .map(|tag| PanelVariable::new(VariableRef::new("Slow", *tag)))
            .collect(),
    )
}

fn sample_history() -> MemoryHistory {
    let mut history = MemoryHistory::new();
    for time in (100..=400).step_by(10) {
        history
            .write_scalar("Slow", "A", time, time as f64)
            .expect("write a");
    }
    history.write_scalar("Slow", "B", 50, 5.0).expect("write b");
    history
        .write("Slow", "Array", 120, vec![1.0, 2.0, 3.0])
        .expect("write array");
    history
}

struct FailingBackend;

impl HistoryBackend for FailingBackend {
    fn read_series(
        &self,
        _start: UnixTime,
        _end: UnixTime,
        _downsample: i64,
        _vars: &[VariableRef],
    ) -> HistoryResult<Vec<SeriesReadout>> {
        Err(HistoryError::BackendRead("channel closed".to_owned()))
    }

    fn last_written(&self, _at: UnixTime, _vars: &[VariableRef]) -> HistoryResult<Vec<UnixTime>> {
        Err(HistoryError::BackendRead("channel closed".to_owned()))
    }
}

/// Returns one readout too few for every batch.
struct ShortBackend;

impl HistoryBackend for ShortBackend {
    fn read_series(
        &self,
        _start: UnixTime,
        _end: UnixTime,
        _downsample: i64,
        vars: &[VariableRef],
    ) -> HistoryResult<Vec<SeriesReadout>> {
        Ok(vars
            .iter()
            .skip(1)
            .map(|_| SeriesReadout::new(vec![1], vec![1.0]))
            .collect())
    }

    fn last_written(&self, _at: UnixTime, vars: &[VariableRef]) -> HistoryResult<Vec<UnixTime>> {
        Ok(vec![0; vars.len()])
    }
}

#[test]
fn results_align_with_panel_variables() {
    let history = sample_history();
    let panel = panel(&["A", "B", "Missing"]);
    let window = TimeWindow::new(100, 200).expect("window");
    let data = HistoryQueryEngine::new(&history)
        .query(&panel, HistoryQuery::new(window))
        .expect("query");

    assert_eq!(data.len(), 3);
    assert_eq!(
        data.status(),
        [
            SeriesStatus::Ok,
            SeriesStatus::NoDataInWindow,
            SeriesStatus::NotFound
        ]
    );
    assert_eq!(data.num_entries(0), 11);
    let a = data.series(0).expect("series a");
    assert_eq!(a.kind, SeriesKind::Variable(0));
    assert_eq!(a.timestamps.first(), Some(&100));
    assert_eq!(a.timestamps.last(), Some(&200));

    // B was written before the window; the missing tag never was.
    let last_written = data.last_written().expect("last written attached");
    assert_eq!(last_written, [200, 50, 0]);
    assert!(!data.series(1).expect("b").never_written());
    assert!(data.series(2).expect("missing").never_written());
}

#[test]
fn complete_batches_skip_last_written_lookup() {
    let history = sample_history();
    let window = TimeWindow::new(100, 200).expect("window");
    let data = HistoryQueryEngine::new(&history)
        .query(&panel(&["A"]), HistoryQuery::new(window))
        .expect("query");
    assert!(data.last_written().is_none());
}

#[test]
fn array_elements_are_addressed_by_index() {
    let history = sample_history();
    let panel = PanelConfig::default().with_variables(vec![PanelVariable::new(
        VariableRef::new("Slow", "Array").with_index(2),
    )]);
    let window = TimeWindow::new(100, 200).expect("window");
    let data = HistoryQueryEngine::new(&history)
        .query(&panel, HistoryQuery::new(window))
        .expect("query");
    assert_eq!(data.series(0).expect("array").values, [3.0]);
}

#[test]
fn downsampling_thins_samples() {
    let history = sample_history();
    let window = TimeWindow::new(100, 400).expect("window");
    let data = HistoryQueryEngine::new(&history)
        .query(&panel(&["A"]), HistoryQuery::new(window).with_downsample(60))
        .expect("query");
    let times = data.series(0).expect("a").timestamps.to_vec();
    assert_eq!(times, [100, 160, 220, 280, 340, 400]);
}

#[test]
fn engine_config_supplies_default_downsampling() {
    let config = EngineConfig::from_json_str(r#"{"default_downsample_seconds": 100}"#)
        .expect("config");
    let panel = panel(&["A"]);
    let window = TimeWindow::new(100, 400).expect("window");
    let query = config.panel_query(&panel, window);
    assert_eq!(query.downsample, 100);
    assert!(!query.run_markers);

    let data = HistoryQueryEngine::new(sample_history())
        .query(&panel, query)
        .expect("query");
    assert_eq!(data.num_entries(0), 4);
}

#[test]
fn run_marker_channels_are_appended() {
    let mut history = sample_history();
    history
        .write_scalar(RUN_TRANSITIONS_EVENT, RUN_STATE_TAG, 150, 1.0)
        .expect("write");
    let mut panel = panel(&["A"]);
    panel.show_run_markers = true;
    let window = TimeWindow::new(100, 200).expect("window");

    let data = HistoryQueryEngine::new(&history)
        .query(&panel, HistoryQuery::for_panel(&panel, window))
        .expect("query");
    assert_eq!(data.len(), 3);
    assert!(data.has_run_markers());
    assert_eq!(data.position_of(SeriesKind::RunState), Some(1));
    assert_eq!(data.position_of(SeriesKind::RunNumber), Some(2));
    assert_eq!(data.status()[2], SeriesStatus::NotFound);
}

#[test]
fn backend_failure_aborts_the_query() {
    let window = TimeWindow::new(100, 200).expect("window");
    let err = HistoryQueryEngine::new(FailingBackend)
        .query(&panel(&["A"]), HistoryQuery::new(window))
        .expect_err("read fails");
    assert!(matches!(err, HistoryError::BackendRead(_)));
}

#[test]
fn short_batches_are_rejected() {
    let window = TimeWindow::new(100, 200).expect("window");
    let err = HistoryQueryEngine::new(ShortBackend)
        .query(&panel(&["A", "B"]), HistoryQuery::new(window))
        .expect_err("short batch");
    assert!(matches!(err, HistoryError::BackendRead(_)));
}

#[test]
fn negative_downsample_is_invalid() {
    let window = TimeWindow::new(100, 200).expect("window");
    let err = HistoryQueryEngine::new(sample_history())
        .query(&panel(&["A"]), HistoryQuery::new(window).with_downsample(-1))
        .expect_err("invalid");
    assert!(matches!(err, HistoryError::InvalidData(_)));
}

#[test]
fn handle_reports_unconfigured_history() {
    let mut handle = HistoryBackendHandle::new(|| -> HistoryResult<SharedBackend> {
        Ok(Box::new(sample_history()))
    });
    let err = handle.backend().expect_err("disconnected");
    assert!(matches!(err, HistoryError::BackendUnavailable(_)));
    assert!(err.to_string().starts_with("history is not configured"));

    handle.reconnect().expect("reconnect");
    assert!(handle.is_connected());
    let window = TimeWindow::new(100, 200).expect("window");
    let data = HistoryQueryEngine::new(handle.backend().expect("backend"))
        .query(&panel(&["A"]), HistoryQuery::new(window))
        .expect("query");
    assert_eq!(data.num_entries(0), 11);

    handle.disconnect();
    assert!(!handle.is_connected());
}

#[test]
fn failed_connection_maps_to_unavailable() {
    let err = HistoryBackendHandle::connect(|| -> HistoryResult<SharedBackend> {
        Err(HistoryError::BackendRead("no such channel".to_owned()))
    })
    .expect_err("connect fails");
    assert!(matches!(err, HistoryError::BackendUnavailable(_)));
}
