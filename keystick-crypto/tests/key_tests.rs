use keystick_crypto::{CryptoError, DerivedKey, KEY_SIZE, MasterSecret, derive_key};

// ── MasterSecret ─────────────────────────────────────────────────

#[test]
fn empty_secret_rejected() {
    assert!(matches!(MasterSecret::new(""), Err(CryptoError::EmptySecret)));
}

#[test]
fn secret_exposes_value() {
    let secret = MasterSecret::new("rahasia").unwrap();
    assert_eq!(secret.expose(), "rahasia");
}

#[test]
fn secret_debug_is_redacted() {
    let secret = MasterSecret::new("do-not-print").unwrap();
    let debug = format!("{secret:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("do-not-print"));
}

// ── derive_key ───────────────────────────────────────────────────

#[test]
fn derive_key_is_deterministic() {
    let secret = MasterSecret::new("shared-secret").unwrap();
    let k1 = derive_key(&secret);
    let k2 = derive_key(&MasterSecret::new("shared-secret").unwrap());
    assert_eq!(k1.as_bytes(), k2.as_bytes());
}

#[test]
fn different_secrets_produce_different_keys() {
    let k1 = derive_key(&MasterSecret::new("secret-a").unwrap());
    let k2 = derive_key(&MasterSecret::new("secret-b").unwrap());
    assert_ne!(k1.as_bytes(), k2.as_bytes());
}

#[test]
fn derived_key_is_sha256_of_secret() {
    // SHA-256("abc")
    let expected = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
        0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
        0xf2, 0x00, 0x15, 0xad,
    ];
    let key = derive_key(&MasterSecret::new("abc").unwrap());
    assert_eq!(key.as_bytes(), &expected);
}

#[test]
fn derived_key_debug_is_redacted() {
    let key = derive_key(&MasterSecret::new("abc").unwrap());
    assert!(format!("{key:?}").contains("REDACTED"));
}

// ── DerivedKey ───────────────────────────────────────────────────

#[test]
fn from_slice_accepts_exact_length() {
    let key = DerivedKey::from_slice(&[7u8; KEY_SIZE]).unwrap();
    assert_eq!(key.as_bytes(), &[7u8; KEY_SIZE]);
}

#[test]
fn from_slice_rejects_wrong_length() {
    let err = DerivedKey::from_slice(&[0u8; 16]).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidKeyLength {
            expected: 32,
            actual: 16
        }
    ));
}
