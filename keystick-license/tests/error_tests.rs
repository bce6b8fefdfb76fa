use keystick_crypto::CryptoError;
use keystick_license::{HardwareError, LicenseError, ReasonCode};

#[test]
fn reason_mapping() {
    let cases = [
        (LicenseError::InvalidInput("x".into()), ReasonCode::InvalidInput),
        (LicenseError::HardwareUnreadable("x".into()), ReasonCode::HardwareUnreadable),
        (
            LicenseError::Io(std::io::Error::other("disk gone")),
            ReasonCode::IoFailure,
        ),
        (
            LicenseError::Crypto(CryptoError::Decryption("x".into())),
            ReasonCode::DecryptionFailure,
        ),
        (LicenseError::CorruptBlob("x".into()), ReasonCode::DecryptionFailure),
        (LicenseError::Config("x".into()), ReasonCode::InvalidInput),
    ];
    for (err, reason) in cases {
        assert_eq!(err.reason(), reason, "{err}");
    }
}

#[test]
fn sealing_failures_share_a_code_but_name_the_step() {
    let encryption = LicenseError::Crypto(CryptoError::Encryption("aead".into()));
    assert_eq!(encryption.reason(), ReasonCode::DecryptionFailure);
    assert!(encryption.to_string().contains("encryption failed"));

    let serde_err: Result<serde_json::Value, _> = serde_json::from_str("{");
    let serialization = LicenseError::from(serde_err.unwrap_err());
    assert_eq!(serialization.reason(), ReasonCode::DecryptionFailure);
    assert!(serialization.to_string().contains("serialization"));
}

#[test]
fn error_display_hardware_unreadable() {
    let err = LicenseError::HardwareUnreadable("no serial".into());
    let msg = format!("{err}");
    assert!(msg.contains("hardware identity unreadable"));
    assert!(msg.contains("no serial"));
}

#[test]
fn error_from_io() {
    let err: LicenseError = std::io::Error::other("boom").into();
    assert!(format!("{err}").contains("i/o error"));
}

#[test]
fn error_from_crypto() {
    let err: LicenseError = CryptoError::EmptySecret.into();
    assert!(format!("{err}").contains("crypto error"));
}

#[test]
fn error_from_serde_json() {
    let serde_err: Result<serde_json::Value, _> = serde_json::from_str("not json");
    let err: LicenseError = serde_err.unwrap_err().into();
    assert!(format!("{err}").contains("serialization"));
}

#[test]
fn hardware_error_display() {
    let err = HardwareError::Unavailable("no wmi".into());
    assert!(format!("{err}").contains("unavailable"));
    let err: HardwareError = std::io::Error::other("eio").into();
    assert!(format!("{err}").contains("hardware query failed"));
}

#[test]
fn reason_codes_serialize_screaming_snake() {
    assert_eq!(
        serde_json::to_string(&ReasonCode::HardwareMismatch).unwrap(),
        "\"HARDWARE_MISMATCH\""
    );
    assert_eq!(
        serde_json::to_string(&ReasonCode::AttributeSetFailed).unwrap(),
        "\"ATTRIBUTE_SET_FAILED\""
    );
}
