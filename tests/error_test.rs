//! Tests for error types

use ltgen_eval::Error;

#[test]
fn test_data_incomplete_error() {
    let error = Error::DataIncomplete("trial 3 is not finalized".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Data incomplete"));
    assert!(error_str.contains("trial 3"));
    assert!(error_str.contains("re-run"));
}

#[test]
fn test_tokenization_mismatch_error() {
    let error = Error::TokenizationMismatch {
        position: 7,
        answer_len: 3,
        trial_len: 2,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Tokenization mismatch at line 7"));
    assert!(error_str.contains("answer has 3 tokens"));
    assert!(error_str.contains("trial has 2"));
}

#[test]
fn test_empty_dataset_error() {
    let error = Error::EmptyDataset("no lines".to_string());
    assert!(format!("{error}").contains("Empty dataset"));
}

#[test]
fn test_delimiter_collision_error() {
    let error = Error::DelimiterCollision {
        position: 0,
        token: "a@@b".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("\"a@@b\""));
    assert!(error_str.contains("normalize tokens"));
}

#[test]
fn test_corrupt_record_error() {
    let error = Error::CorruptRecord {
        position: 12,
        reason: "bad cluster id".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Corrupt record at line 12"));
    assert!(error_str.contains("bad cluster id"));
}

#[test]
fn test_length_mismatch_error() {
    let error = Error::LengthMismatch { answer: 10, trial: 9 };
    let error_str = format!("{error}");
    assert!(error_str.contains("answer has 10 records"));
    assert!(error_str.contains("trial has 9"));
}

#[test]
fn test_storage_io_from_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "answer missing");
    let error: Error = io.into();
    assert!(matches!(error, Error::StorageIo(_)));
    assert!(format!("{error}").contains("Storage I/O error"));
}

#[test]
fn test_serialization_from_conversion() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = parse.into();
    assert!(matches!(error, Error::Serialization(_)));
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_generator_error() {
    let error = Error::Generator("parser crashed".to_string());
    assert!(format!("{error}").contains("Generator error: parser crashed"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("n_trials must be greater than 0".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("n_trials"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom".to_string());
    assert_eq!(format!("{error}"), "custom");
}

#[test]
fn test_error_debug() {
    let error = Error::EmptyDataset("debug".to_string());
    assert!(format!("{error:?}").contains("EmptyDataset"));
}
