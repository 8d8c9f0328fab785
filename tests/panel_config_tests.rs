use histview::core::{DEFAULT_PALETTE, PanelConfig, PanelVariable, VariableRef};
use histview::store::{ConfigStore, MemoryConfigStore};
use histview::{EngineConfig, HistoryError};

#[test]
fn add_variables_sorts_dedups_and_colors() {
    let mut panel = PanelConfig::default();
    let added = panel.add_variables([
        VariableRef::new("Slow", "T10"),
        VariableRef::new("Slow", "T2"),
        VariableRef::new("Fast", "X"),
        VariableRef::new("Slow", "T2"),
    ]);
    assert_eq!(added, 3);

    let names: Vec<String> = panel
        .variables
        .iter()
        .map(PanelVariable::display_name)
        .collect();
    assert_eq!(names, ["Fast:X", "Slow:T2", "Slow:T10"]);
    let orders: Vec<i32> = panel.variables.iter().map(|variable| variable.order).collect();
    assert_eq!(orders, [10, 20, 30]);
    let colors: Vec<&str> = panel
        .variables
        .iter()
        .map(|variable| variable.color.as_str())
        .collect();
    assert_eq!(colors, DEFAULT_PALETTE[..3]);

    let added = panel.add_variables([
        VariableRef::new("Slow", "T2"),
        VariableRef::new("Slow", "P"),
    ]);
    assert_eq!(added, 1);
    let last = panel.variables.last().expect("new variable");
    assert_eq!(last.reference, VariableRef::new("Slow", "P"));
    assert_eq!(last.order, 40);
    assert_eq!(last.color, DEFAULT_PALETTE[3]);
}

#[test]
fn normalize_drops_deleted_and_renumbers() {
    let variable = |tag: &str, order: i32| {
        PanelVariable::new(VariableRef::new("Slow", tag))
            .with_order(order)
            .with_color(DEFAULT_PALETTE[0])
    };
    let mut panel = PanelConfig::default().with_variables(vec![
        variable("C", 35),
        variable("Gone", 0),
        variable("A", 5),
        variable("AlsoGone", -10),
        variable("B", 12).with_color(""),
    ]);
    panel.normalize_for_save();

    let tags: Vec<&str> = panel
        .variables
        .iter()
        .map(|variable| variable.reference.tag.as_str())
        .collect();
    assert_eq!(tags, ["A", "B", "C"]);
    let orders: Vec<i32> = panel.variables.iter().map(|variable| variable.order).collect();
    assert_eq!(orders, [10, 20, 30]);
    assert_eq!(panel.variables[1].color, DEFAULT_PALETTE[1]);
    assert_eq!(
        panel.variable_refs(),
        [
            VariableRef::new("Slow", "A"),
            VariableRef::new("Slow", "B"),
            VariableRef::new("Slow", "C")
        ]
    );
}

#[test]
fn panel_json_uses_defaults_for_missing_fields() {
    let json = r#"{
        "log_axis": true,
        "maximum": 100.0,
        "variables": [
            {"ref": {"event": "Slow", "tag": "T", "index": 2}, "factor": 0.5, "order": 10},
            {"ref": {"event": "Slow", "tag": "P"}}
        ]
    }"#;
    let panel: PanelConfig = serde_json::from_str(json).expect("panel json");
    assert!(panel.log_axis);
    assert_eq!(panel.timescale_seconds, 3_600);
    assert_eq!(panel.minimum, None);
    assert_eq!(panel.maximum, Some(100.0));
    assert_eq!(panel.variables[0].reference.to_string(), "Slow:T[2]");
    assert_eq!(panel.variables[0].scale(4.0), 2.0);
    assert_eq!(panel.variables[1].factor, 1.0);
    assert_eq!(panel.variables[1].reference.index, 0);
    panel.validate().expect("valid panel");
}

#[test]
fn inverted_bounds_fail_validation() {
    let panel = PanelConfig {
        minimum: Some(10.0),
        maximum: Some(1.0),
        ..PanelConfig::default()
    };
    assert!(matches!(panel.validate(), Err(HistoryError::InvalidData(_))));
}

#[test]
fn memory_store_round_trip() {
    let mut store = MemoryConfigStore::new();
    let err = store.load_panel("Cryo/Temperatures").expect_err("missing");
    assert!(matches!(
        err,
        HistoryError::ConfigNotFound { ref path } if path == "Cryo/Temperatures"
    ));

    let panel = PanelConfig::default().with_variables(vec![
        PanelVariable::new(VariableRef::new("Slow", "B")).with_order(20),
        PanelVariable::new(VariableRef::new("Slow", "A")).with_order(7),
        PanelVariable::new(VariableRef::new("Slow", "X")).with_order(0),
    ]);
    store.save_panel("Cryo/Temperatures", panel).expect("save");
    store
        .save_panel("Beam/Current", PanelConfig::default())
        .expect("save");

    let loaded = store.load_panel("Cryo/Temperatures").expect("load");
    let tags: Vec<&str> = loaded
        .variables
        .iter()
        .map(|variable| variable.reference.tag.as_str())
        .collect();
    assert_eq!(tags, ["A", "B"]);
    assert!(loaded.variables.iter().all(|variable| !variable.color.is_empty()));
    assert_eq!(store.list_panels(), ["Cryo/Temperatures", "Beam/Current"]);

    let json = store.to_json_string().expect("json");
    let restored = MemoryConfigStore::from_json_str(&json).expect("restore");
    assert_eq!(restored.list_panels(), store.list_panels());
    assert_eq!(restored.load_panel("Cryo/Temperatures").expect("load"), loaded);

    store.remove_panel("Beam/Current").expect("remove");
    assert_eq!(store.list_panels(), ["Cryo/Temperatures"]);
}

#[test]
fn engine_config_round_trips_through_json() {
    let config = EngineConfig::from_json_str(
        r#"{"utc_offset_seconds": 3600, "axis": {"char_width_px": 6.5}, "style": {"fill_alpha": 0.2}}"#,
    )
    .expect("config");
    assert_eq!(config.utc_offset_seconds, 3_600);
    assert_eq!(config.axis.char_width_px, 6.5);
    assert_eq!(config.axis.min_tick_spacing_px, 5.0);
    assert_eq!(config.style.fill_alpha, 0.2);
    assert_eq!(config.value_padding_ratio, 0.05);
    assert_eq!(config.utc_offset().expect("offset").local_minus_utc(), 3_600);

    let json = config.to_json_string().expect("json");
    assert_eq!(EngineConfig::from_json_str(&json).expect("reload"), config);
}

#[test]
fn engine_config_rejects_bad_values() {
    assert!(EngineConfig::from_json_str(r#"{"value_padding_ratio": -1.0}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"style": {"fill_alpha": 2.0}}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"axis": {"min_tick_spacing_px": 0.0}}"#).is_err());
    assert!(matches!(
        EngineConfig::from_json_str("not json"),
        Err(HistoryError::Json(_))
    ));
}
