use axpert_gateway::error::GatewayError;

#[test]
fn domain_error_constructors() {
    assert!(matches!(
        GatewayError::not_found("x"),
        GatewayError::NotFound { .. }
    ));
    assert!(matches!(
        GatewayError::validation("value", "x"),
        GatewayError::Validation { .. }
    ));
    assert!(matches!(
        GatewayError::mapping("x"),
        GatewayError::Mapping { .. }
    ));
    assert!(matches!(
        GatewayError::device_io("x"),
        GatewayError::DeviceIo { .. }
    ));
}

#[test]
fn ambient_error_constructors() {
    assert!(matches!(GatewayError::config("x"), GatewayError::Config { .. }));
    assert!(matches!(GatewayError::io("x"), GatewayError::Io { .. }));
    assert!(matches!(GatewayError::timeout("x"), GatewayError::Timeout { .. }));
    assert!(matches!(GatewayError::web("x"), GatewayError::Web { .. }));
    assert!(matches!(GatewayError::metrics("x"), GatewayError::Metrics { .. }));
}

#[test]
fn conversions_and_device_io_classification() {
    let io = std::io::Error::other("boom");
    let err: GatewayError = io.into();
    assert!(matches!(err, GatewayError::Io { .. }));
    assert!(!err.is_device_io());

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: GatewayError = json_err.into();
    assert!(matches!(err, GatewayError::Serialization { .. }));

    assert!(GatewayError::timeout("QPIGS").is_device_io());
    assert!(!GatewayError::validation("value", "x").is_device_io());
}
