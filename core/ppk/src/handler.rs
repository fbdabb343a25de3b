//! Adapter exposing a key pair as an encryption service custom handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use ppkvault_common::{Error, KeyId, Result};
use ppkvault_crypto::{AsymmetricHandle, CustomHandler};

/// Serialized output of [`PpkHandler::encrypt`].
///
/// ```text
/// {"ppkId":"<key pair id>","scheme":"RSA-OAEP-SHA256","ciphertext":"<hex>"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Key pair the content was encrypted for.
    pub ppk_id: KeyId,
    /// Asymmetric scheme tag.
    pub scheme: String,
    /// Hex encoded ciphertext.
    pub ciphertext: String,
}

impl Envelope {
    /// Parse envelope text.
    ///
    /// # Errors
    /// - `MalformedEnvelope` if the text is not a valid envelope
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    /// Serialize to compact text.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Key pair handle bound to its owning id.
///
/// Built per operation and dropped afterwards.
pub struct PpkHandler {
    ppk_id: KeyId,
    handle: Box<dyn AsymmetricHandle>,
}

impl PpkHandler {
    /// Bind a loaded handle to the id of the key pair it came from.
    pub fn new(ppk_id: KeyId, handle: Box<dyn AsymmetricHandle>) -> Self {
        Self { ppk_id, handle }
    }

    /// Id of the key pair this handler encrypts for.
    pub fn ppk_id(&self) -> &KeyId {
        &self.ppk_id
    }

    /// Whether the handler holds a private key.
    pub fn can_decrypt(&self) -> bool {
        self.handle.has_private_key()
    }
}

impl fmt::Debug for PpkHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PpkHandler")
            .field("ppk_id", &self.ppk_id)
            .field("can_decrypt", &self.can_decrypt())
            .finish()
    }
}

impl CustomHandler for PpkHandler {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let ciphertext = self.handle.encrypt(plaintext.as_bytes())?;

        Envelope {
            ppk_id: self.ppk_id.clone(),
            scheme: self.handle.scheme().to_string(),
            ciphertext: hex::encode(ciphertext),
        }
        .to_text()
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>> {
        let envelope = Envelope::parse(ciphertext)?;

        if envelope.ppk_id != self.ppk_id {
            return Err(Error::KeyMismatch {
                expected: self.ppk_id.to_string(),
                actual: envelope.ppk_id.to_string(),
            });
        }
        if envelope.scheme != self.handle.scheme() {
            return Err(Error::MalformedEnvelope(format!(
                "Unsupported scheme {}",
                envelope.scheme
            )));
        }

        let bytes = hex::decode(&envelope.ciphertext)
            .map_err(|e| Error::MalformedEnvelope(format!("Invalid ciphertext: {}", e)))?;
        let mut plaintext = self.handle.decrypt(&bytes)?;

        String::from_utf8(std::mem::take(&mut *plaintext))
            .map(Zeroizing::new)
            .map_err(|_| Error::Decryption("Plaintext is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppkvault_crypto::{AsymmetricKeyProvider, RsaKeyProvider, RSA_OAEP_SHA256};
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn generate_handle() -> Box<dyn AsymmetricHandle> {
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(RsaKeyProvider::new().generate_key_pair(2048, 65537))
            .unwrap()
    }

    fn shared_handler() -> &'static PpkHandler {
        static HANDLER: OnceLock<PpkHandler> = OnceLock::new();
        HANDLER.get_or_init(|| PpkHandler::new(KeyId::generate(), generate_handle()))
    }

    fn public_only(handler: &PpkHandler) -> PpkHandler {
        let mut handle = RsaKeyProvider::new().new_handle();
        handle
            .import_public_key(&handler.handle.export_public_key().unwrap())
            .unwrap();
        PpkHandler::new(handler.ppk_id.clone(), handle)
    }

    #[test]
    fn test_envelope_fields() {
        let handler = shared_handler();
        let text = handler.encrypt("48656c6c6f").unwrap();
        let envelope = Envelope::parse(&text).unwrap();

        assert_eq!(&envelope.ppk_id, handler.ppk_id());
        assert_eq!(envelope.scheme, RSA_OAEP_SHA256);
        assert!(envelope.ciphertext.chars().all(|c| c.is_ascii_hexdigit()));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("ppkId").is_some());
    }

    #[test]
    fn test_key_mismatch_reports_both_ids() {
        let sender = shared_handler();
        let receiver = PpkHandler::new(KeyId::generate(), generate_handle());

        let envelope = sender.encrypt("00ff").unwrap();
        match receiver.decrypt(&envelope) {
            Err(Error::KeyMismatch { expected, actual }) => {
                assert_eq!(expected, receiver.ppk_id().to_string());
                assert_eq!(actual, sender.ppk_id().to_string());
            }
            other => panic!("expected KeyMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_public_only_handler_encrypts_but_cannot_decrypt() {
        let full = shared_handler();
        let public = public_only(full);
        assert!(!public.can_decrypt());

        let envelope = public.encrypt("cafe").unwrap();
        assert!(matches!(public.decrypt(&envelope), Err(Error::NoPrivateKey)));
        assert_eq!(full.decrypt(&envelope).unwrap().as_str(), "cafe");
    }

    #[test]
    fn test_malformed_envelopes() {
        let handler = shared_handler();

        assert!(matches!(
            handler.decrypt("not json"),
            Err(Error::MalformedEnvelope(_))
        ));
        assert!(matches!(
            handler.decrypt(r#"{"ppkId":"x"}"#),
            Err(Error::MalformedEnvelope(_))
        ));

        let bad_hex = Envelope {
            ppk_id: handler.ppk_id().clone(),
            scheme: RSA_OAEP_SHA256.to_string(),
            ciphertext: "zz".to_string(),
        };
        assert!(matches!(
            handler.decrypt(&bad_hex.to_text().unwrap()),
            Err(Error::MalformedEnvelope(_))
        ));

        let bad_scheme = Envelope {
            scheme: "RSA-PKCS1-V1_5".to_string(),
            ..bad_hex
        };
        assert!(matches!(
            handler.decrypt(&bad_scheme.to_text().unwrap()),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_master_key_sized_plaintext() {
        let handler = shared_handler();
        let plaintext = "ab".repeat(256);

        let envelope = handler.encrypt(&plaintext).unwrap();
        assert_eq!(handler.decrypt(&envelope).unwrap().as_str(), plaintext);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_handler_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            let handler = shared_handler();
            let plain_hex = hex::encode(&bytes);

            let envelope = handler.encrypt(&plain_hex).unwrap();
            let decrypted = handler.decrypt(&envelope).unwrap();

            prop_assert_eq!(decrypted.as_str(), plain_hex.as_str());
        }
    }
}
