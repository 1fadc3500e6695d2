//! Unit tests for `AppError` display format and conversions.

use minecloud_wrapper::AppError;

#[test]
fn every_variant_has_a_distinct_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Launch("x".into()), "launch: x"),
        (AppError::Io("x".into()), "io: x"),
        (AppError::InvalidCommand("x".into()), "invalid command: x"),
        (AppError::NotRunning("x".into()), "not running: x"),
        (AppError::Abandoned("x".into()), "abandoned: x"),
        (AppError::Snapshot("x".into()), "snapshot: x"),
        (AppError::Http("x".into()), "http: x"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn io_error_converts_to_io_variant() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Io(ref msg) if msg == "pipe closed"));
}

#[test]
fn toml_error_converts_to_config_variant() {
    let toml_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err = AppError::from(toml_err);
    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn app_error_is_std_error() {
    let err: Box<dyn std::error::Error> = Box::new(AppError::NotRunning("server has stopped".into()));
    assert_eq!(err.to_string(), "not running: server has stopped");
}
