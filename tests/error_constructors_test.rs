use spotwatt::error::SpotwattError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        SpotwattError::config("x"),
        SpotwattError::Config { .. }
    ));
    assert!(matches!(
        SpotwattError::modbus("x"),
        SpotwattError::Modbus { .. }
    ));
    assert!(matches!(SpotwattError::mqtt("x"), SpotwattError::Mqtt { .. }));
}

#[test]
fn error_constructors_group_2() {
    let ser = SpotwattError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, SpotwattError::Serialization { .. }));
    assert!(matches!(SpotwattError::io("x"), SpotwattError::Io { .. }));
    assert!(matches!(
        SpotwattError::network("x"),
        SpotwattError::Network { .. }
    ));
}

#[test]
fn error_constructors_group_3() {
    assert!(matches!(
        SpotwattError::validation("f", "m"),
        SpotwattError::Validation { .. }
    ));
    assert!(matches!(
        SpotwattError::timeout("x"),
        SpotwattError::Timeout { .. }
    ));
}

#[test]
fn display_messages() {
    let e = SpotwattError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
}

#[test]
fn io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let e: SpotwattError = io.into();
    assert!(matches!(e, SpotwattError::Io { .. }));
}
