//! Password-sealed text.
//!
//! A sealed text is compact JSON carrying everything needed to open it
//! except the password:
//!
//! ```text
//! {"v":1,"m":"StringV1","kdf":{...},"salt":"<b64>","data":"<b64 nonce||ct||tag>"}
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::aead;
use crate::kdf::{derive_key, KdfParams};
use crate::keys::Salt;
use crate::method::EncryptionMethod;
use ppkvault_common::{Error, Result};

/// Current sealed text format version.
pub const SEALED_VERSION: u32 = 1;

/// Upper bound on the Argon2 memory cost accepted from a sealed text (1 GiB).
pub const MAX_MEMORY_COST: u32 = 1024 * 1024;

/// Upper bound on the Argon2 iteration count accepted from a sealed text.
pub const MAX_TIME_COST: u32 = 16;

/// Upper bound on the Argon2 lanes accepted from a sealed text.
pub const MAX_PARALLELISM: u32 = 16;

#[derive(Debug, Serialize, Deserialize)]
struct SealedText {
    v: u32,
    m: EncryptionMethod,
    kdf: KdfParams,
    salt: String,
    data: String,
}

/// Seal `plaintext` under `password`.
///
/// # Errors
/// - `InvalidInput` if the method is not password based
/// - `Crypto` if the KDF parameters are invalid
pub fn seal(
    method: EncryptionMethod,
    password: &str,
    plaintext: &[u8],
    params: &KdfParams,
) -> Result<String> {
    if !method.is_password_based() {
        return Err(Error::InvalidInput(format!(
            "{} cannot be used with a password",
            method
        )));
    }

    let salt = Salt::generate();
    let key = derive_key(password.as_bytes(), &salt, params)?;
    let data = aead::encrypt(key.as_bytes(), plaintext)?;

    let sealed = SealedText {
        v: SEALED_VERSION,
        m: method,
        kdf: *params,
        salt: salt.to_base64(),
        data: STANDARD.encode(data),
    };

    serde_json::to_string(&sealed).map_err(|e| Error::Serialization(e.to_string()))
}

/// Open a sealed text.
///
/// Every failure, whether a wrong password, a method mismatch or a corrupt
/// text, is reported as `Decryption`.
pub fn open(
    method: EncryptionMethod,
    password: &str,
    sealed: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let sealed: SealedText = serde_json::from_str(sealed)
        .map_err(|_| Error::Decryption("Sealed text is corrupt".to_string()))?;

    if sealed.v != SEALED_VERSION {
        return Err(Error::Decryption(format!(
            "Unsupported sealed text version {}",
            sealed.v
        )));
    }
    if sealed.m != method {
        return Err(Error::Decryption(format!(
            "Sealed with {}, expected {}",
            sealed.m, method
        )));
    }
    if sealed.kdf.memory_cost > MAX_MEMORY_COST
        || sealed.kdf.time_cost > MAX_TIME_COST
        || sealed.kdf.parallelism > MAX_PARALLELISM
    {
        return Err(Error::Decryption("KDF parameters out of range".to_string()));
    }

    let salt = Salt::from_base64(&sealed.salt)?;
    let data = STANDARD
        .decode(&sealed.data)
        .map_err(|_| Error::Decryption("Sealed text is corrupt".to_string()))?;

    let key = derive_key(password.as_bytes(), &salt, &sealed.kdf).map_err(|e| match e {
        Error::InvalidInput(msg) | Error::Crypto(msg) => Error::Decryption(msg),
        other => other,
    })?;

    aead::decrypt(key.as_bytes(), &data).map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KdfParams {
        KdfParams::minimal()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(EncryptionMethod::StringV1, "pw", b"hello", &params()).unwrap();
        let opened = open(EncryptionMethod::StringV1, "pw", &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"hello");
    }

    #[test]
    fn test_same_input_seals_differently() {
        let a = seal(EncryptionMethod::KeyV1, "pw", b"x", &params()).unwrap();
        let b = seal(EncryptionMethod::KeyV1, "pw", b"x", &params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_password() {
        let sealed = seal(EncryptionMethod::StringV1, "right", b"hello", &params()).unwrap();
        let result = open(EncryptionMethod::StringV1, "wrong", &sealed);
        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn test_empty_password_on_open_is_decryption_error() {
        let sealed = seal(EncryptionMethod::StringV1, "right", b"hello", &params()).unwrap();
        assert!(matches!(
            open(EncryptionMethod::StringV1, "", &sealed),
            Err(Error::Decryption(_))
        ));
    }

    #[test]
    fn test_method_mismatch() {
        let sealed = seal(EncryptionMethod::StringV1, "pw", b"hello", &params()).unwrap();
        assert!(matches!(
            open(EncryptionMethod::KeyV1, "pw", &sealed),
            Err(Error::Decryption(_))
        ));
    }

    #[test]
    fn test_corrupt_text() {
        assert!(matches!(
            open(EncryptionMethod::StringV1, "pw", "not json"),
            Err(Error::Decryption(_))
        ));
    }

    #[test]
    fn test_custom_method_cannot_seal() {
        assert!(matches!(
            seal(EncryptionMethod::Custom, "pw", b"x", &params()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_params_travel_with_ciphertext() {
        let custom = KdfParams {
            memory_cost: 16,
            time_cost: 2,
            parallelism: 1,
        };
        let sealed = seal(EncryptionMethod::KeyV1, "pw", b"abc", &custom).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sealed).unwrap();
        assert_eq!(value["kdf"]["memory_cost"], 16);
        assert_eq!(value["m"], "KeyV1");
        assert!(open(EncryptionMethod::KeyV1, "pw", &sealed).is_ok());
    }

    fn tamper_kdf(sealed: &str, field: &str, value: u64) -> String {
        let mut value_json: serde_json::Value = serde_json::from_str(sealed).unwrap();
        value_json["kdf"][field] = serde_json::json!(value);
        value_json.to_string()
    }

    #[test]
    fn test_out_of_range_kdf_params_rejected() {
        let sealed = seal(EncryptionMethod::StringV1, "pw", b"hello", &params()).unwrap();

        for (field, value) in [
            ("time_cost", u32::MAX as u64),
            ("parallelism", (MAX_PARALLELISM + 1) as u64),
            ("memory_cost", (MAX_MEMORY_COST + 1) as u64),
        ] {
            let tampered = tamper_kdf(&sealed, field, value);
            assert!(
                matches!(
                    open(EncryptionMethod::StringV1, "pw", &tampered),
                    Err(Error::Decryption(_))
                ),
                "{} = {} was accepted",
                field,
                value
            );
        }
    }

    #[test]
    fn test_presets_within_bounds() {
        for preset in [
            KdfParams::interactive(),
            KdfParams::moderate(),
            KdfParams::sensitive(),
        ] {
            assert!(preset.memory_cost <= MAX_MEMORY_COST);
            assert!(preset.time_cost <= MAX_TIME_COST);
            assert!(preset.parallelism <= MAX_PARALLELISM);
        }
    }

    #[test]
    fn test_empty_password_roundtrip() {
        let sealed = seal(EncryptionMethod::KeyV1, "", b"hello", &params()).unwrap();
        assert_eq!(open(EncryptionMethod::KeyV1, "", &sealed).unwrap().as_slice(), b"hello");
        assert!(open(EncryptionMethod::KeyV1, "x", &sealed).is_err());
    }
}
