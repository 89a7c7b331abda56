//! Tests for error types

use ftx_campaign::Error;
use std::path::PathBuf;

#[test]
fn test_invalid_state_error() {
    let error = Error::InvalidState("he_flux has not been started".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid state"));
    assert!(error_str.contains("has not been started"));
}

#[test]
fn test_not_loaded_error() {
    let error = Error::NotLoaded("retention");
    assert_eq!(
        format!("{error}"),
        "No retention data found, call load_retention() first"
    );
}

#[test]
fn test_already_exists_error() {
    let error = Error::AlreadyExists(PathBuf::from("/runs/he/simulation.json"));
    let error_str = format!("{error}");
    assert!(error_str.contains("/runs/he/simulation.json"));
    assert!(error_str.contains("overwrite=true"));
}

#[test]
fn test_missing_file_error() {
    let error = Error::MissingFile(PathBuf::from("xolotlStop.h5"));
    assert_eq!(format!("{error}"), "File xolotlStop.h5 does not exist");
}

#[test]
fn test_marker_not_found_error() {
    let error = Error::MarkerNotFound {
        marker: "driver time (in loop)",
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Log parse error"));
    assert!(error_str.contains("driver time (in loop)"));
}

#[test]
fn test_line_out_of_range_error() {
    let error = Error::LineOutOfRange {
        marker: "change in Xolotls",
        line: 120,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("line 120"));
    assert!(error_str.contains("change in Xolotls"));
}

#[test]
fn test_malformed_token_error() {
    let error = Error::MalformedToken {
        marker: "check for updates in time steps",
        token: "x1".to_string(),
        reason: "is not an integer".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("\"x1\""));
    assert!(error_str.contains("is not an integer"));
}

#[test]
fn test_truncation_error() {
    let error = Error::Truncation("exit status 1".to_string());
    assert!(format!("{error}").contains("Checkpoint truncation failed"));
}

#[test]
fn test_table_error() {
    let error = Error::Table {
        path: PathBuf::from("surface.txt"),
        reason: "line 3 has 1 columns, expected 2".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("surface.txt"));
    assert!(error_str.contains("expected 2"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    let error_str = format!("{error}");
    assert_eq!(error_str, "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::NotLoaded("surface");
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NotLoaded"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> ftx_campaign::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> ftx_campaign::Result<i32> {
        Err(Error::Other("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
