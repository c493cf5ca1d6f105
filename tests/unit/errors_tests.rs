/*!
 * Tests for error types
 */

use std::path::PathBuf;
use subcondense::errors::{AppError, CondenseError, MediaError, SubtitleError};

/// Test that condense errors are sorted into retryable and fatal ones
#[test]
fn test_condenseError_classification_shouldSeparateInsufficientFromConfig() {
    assert!(CondenseError::NoEvents.is_insufficient());
    assert!(CondenseError::InsufficientDialogue { total: 3 }.is_insufficient());
    assert!(!CondenseError::NoEvents.is_configuration_error());

    let invalid = CondenseError::InvalidIgnoreRange { start_ms: 5, end_ms: 5 };
    assert!(invalid.is_configuration_error());
    assert!(!invalid.is_insufficient());
    assert!(CondenseError::InvalidTimeSpec("1x".to_string()).is_configuration_error());
}

/// Test that error messages carry their details
#[test]
fn test_errorMessages_shouldIncludeDetails() {
    let err = CondenseError::InsufficientDialogue { total: 12 };
    assert_eq!(err.to_string(), "No dialogue left after filtering 12 subtitle events");

    let err = MediaError::Timeout { tool: "ffmpeg".to_string(), secs: 60 };
    assert_eq!(err.to_string(), "ffmpeg timed out after 60 seconds");

    let err = MediaError::NoAudioStream(PathBuf::from("a.mkv"));
    assert!(err.to_string().contains("a.mkv"));
}

/// Test that the regex error converts through `?`
#[test]
fn test_condenseError_fromRegexError_shouldConvert() {
    let regex_error = regex::Regex::new("(").unwrap_err();
    let err: CondenseError = regex_error.into();
    assert!(matches!(err, CondenseError::InvalidRegex(_)));
    assert!(err.is_configuration_error());
}

/// Test that module errors wrap into the application error
#[test]
fn test_appError_fromModuleErrors_shouldWrap() {
    let app: AppError = SubtitleError::Parse("bad".to_string()).into();
    assert!(matches!(app, AppError::Subtitle(_)));

    let app: AppError = MediaError::InvalidProbeOutput("x".to_string()).into();
    assert!(app.to_string().starts_with("Media error:"));

    let app: AppError = CondenseError::NoEvents.into();
    assert!(matches!(app, AppError::Condense(_)));

    let app: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(app, AppError::File(_)));

    let app: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(app.to_string(), "Unknown error: boom");
}
