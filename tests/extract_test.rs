//! Log extraction against realistic multi-loop solver logs.

use ftx_campaign::config::SimulationConfig;
use ftx_campaign::extract::{last_occurrence, LogParameterExtractor, DRIVER_TIME_MARKER};
use ftx_campaign::params::{keys, ParameterStore, ParameterValue};
use ftx_campaign::Error;
use proptest::prelude::*;

fn padded_log(elapsed: f64) -> Vec<String> {
    let mut log: Vec<String> = (0..10).map(|i| format!("solver diagnostics {i}")).collect();
    log.push("coupling loop 42: check for updates in time steps".to_string());
    log.push("no update (0.05) (1.23)".to_string());
    log.push("change in Xolotls".to_string());
    log.push("ts_adapt_dt_max 0.2".to_string());
    log.push(format!("driver time (in loop) {elapsed}"));
    log
}

fn with_cap(cap: f64) -> ParameterStore {
    [(keys::XOLOTL_MAX_TS, ParameterValue::Float(cap))]
        .into_iter()
        .collect()
}

#[test]
fn test_loop_marker_on_line_ten() {
    let log = padded_log(7.0);
    assert_eq!(
        last_occurrence(&log, "check for updates in time steps"),
        Some(10)
    );

    let params = LogParameterExtractor::default()
        .extract(&log, &with_cap(0.5))
        .unwrap();

    assert_eq!(params.loop_count, 42);
    assert!((params.loop_time_step - 0.05).abs() < f64::EPSILON);
    assert!((params.stop_time - 1.23).abs() < f64::EPSILON);
    assert!((params.adaptive_dt_max - 0.2).abs() < f64::EPSILON);
}

#[test]
fn test_elapsed_below_threshold_keeps_cap() {
    let params = LogParameterExtractor::default()
        .extract(&padded_log(3.0), &with_cap(0.5))
        .unwrap();
    assert_eq!(params.max_time_step, ParameterValue::Float(0.5));
}

#[test]
fn test_elapsed_above_threshold_reduces_cap() {
    let params = LogParameterExtractor::default()
        .extract(&padded_log(7.0), &with_cap(0.5))
        .unwrap();
    assert_eq!(params.max_time_step, ParameterValue::Float(0.1));
}

#[test]
fn test_custom_policy_thresholds() {
    let config = SimulationConfig::builder().step_cap(10.0, 0.01).build();
    let extractor = LogParameterExtractor::new(&config.policy);

    let early = extractor.extract(&padded_log(7.0), &with_cap(0.5)).unwrap();
    assert_eq!(early.max_time_step, ParameterValue::Float(0.5));

    let late = extractor.extract(&padded_log(12.0), &with_cap(0.5)).unwrap();
    assert_eq!(late.max_time_step, ParameterValue::Float(0.01));
}

#[test]
fn test_later_loop_wins() {
    let mut log = padded_log(1.0);
    log.push("coupling loop 43: check for updates in time steps".to_string());
    log.push("no update (0.07) (1.30)".to_string());
    log.push("driver time (in loop) 8.5".to_string());

    let params = LogParameterExtractor::default()
        .extract(&log, &ParameterStore::new())
        .unwrap();

    assert_eq!(params.loop_count, 43);
    assert!((params.loop_time_step - 0.07).abs() < f64::EPSILON);
    assert!((params.elapsed_time - 8.5).abs() < f64::EPSILON);
}

#[test]
fn test_missing_driver_time_marker() {
    let log: Vec<String> = padded_log(7.0)
        .into_iter()
        .filter(|l| !l.contains(DRIVER_TIME_MARKER))
        .collect();
    let err = LogParameterExtractor::default()
        .extract(&log, &with_cap(0.5))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MarkerNotFound {
            marker: DRIVER_TIME_MARKER
        }
    ));
}

#[test]
fn test_empty_log() {
    let log: Vec<String> = Vec::new();
    let err = LogParameterExtractor::default()
        .extract(&log, &ParameterStore::new())
        .unwrap_err();
    assert!(matches!(err, Error::MarkerNotFound { .. }));
}

#[test]
fn test_entries_feed_parameter_store() {
    let params = LogParameterExtractor::default()
        .extract(&padded_log(7.0), &with_cap(0.5))
        .unwrap();
    let mut store = with_cap(0.5);
    store.merge(params.entries());

    assert_eq!(store.get(keys::LOOP_N), Some(&ParameterValue::Int(42)));
    assert_eq!(store.get(keys::INIT_TIME), Some(&ParameterValue::Float(7.0)));
    assert_eq!(store.get(keys::XOLOTL_MAX_TS), Some(&ParameterValue::Float(0.1)));
}

proptest! {
    #[test]
    fn prop_loop_fields_follow_last_marker(
        noise in prop::collection::vec("[a-z ]{0,20}", 0..30),
        count in 0i64..100_000,
        step in 1e-6f64..10.0,
        stop in 0.0f64..1e4,
        elapsed in 0.0f64..100.0,
    ) {
        let mut log = noise;
        log.push(format!("coupling loop {count}: check for updates in time steps"));
        log.push(format!("no update ({step}) ({stop})"));
        log.push("change in Xolotls".to_string());
        log.push("dt 0.2".to_string());
        log.push(format!("driver time (in loop) {elapsed}"));

        let params = LogParameterExtractor::default()
            .extract(&log, &with_cap(0.5))
            .unwrap();

        prop_assert_eq!(params.loop_count, count);
        prop_assert_eq!(params.loop_time_step, step);
        prop_assert_eq!(params.stop_time, stop);
        prop_assert_eq!(params.elapsed_time, elapsed);
        let expected = if elapsed < 5.0 { 0.5 } else { 0.1 };
        prop_assert_eq!(params.max_time_step, ParameterValue::Float(expected));
    }

    #[test]
    fn prop_last_occurrence_is_last(lines in prop::collection::vec("[abx]{0,4}", 0..40)) {
        match last_occurrence(&lines, "x") {
            Some(i) => {
                prop_assert!(lines[i].contains('x'));
                prop_assert!(lines[i + 1..].iter().all(|l| !l.contains('x')));
            }
            None => prop_assert!(lines.iter().all(|l| !l.contains('x'))),
        }
    }
}
