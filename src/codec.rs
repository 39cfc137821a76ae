//! Session cookie cipher.
//!
//! AES-256-CBC with PKCS#7 padding under a configured key and IV, hex encoded.
//! The IV is fixed per deployment, so the output is deterministic: the same
//! session always yields the same cookie value. Cookies minted by earlier
//! deployments using the same key/IV remain readable.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::session::Session;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cookie is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("ciphertext is not a well-formed block sequence")]
    Malformed,
    #[error("plaintext is not utf-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("session json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct SessionCodec {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        SessionCodec { key, iv }
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(cfg.key, cfg.iv)
    }

    /// Encrypt `plaintext` and return lowercase hex.
    pub fn encipher(&self, plaintext: &str) -> String {
        let ct = Aes256CbcEnc::new((&self.key).into(), (&self.iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode(ct)
    }

    pub fn decipher(&self, ciphertext: &str) -> Result<String, CodecError> {
        let bytes = hex::decode(ciphertext)?;
        let pt = Aes256CbcDec::new((&self.key).into(), (&self.iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| CodecError::Malformed)?;
        Ok(String::from_utf8(pt)?)
    }

    /// Serialize and encrypt a session into a cookie value.
    pub fn seal(&self, session: &Session) -> Result<String, CodecError> {
        Ok(self.encipher(&session.to_json()?))
    }

    /// Decrypt and deserialize a cookie value.
    pub fn open(&self, cookie_value: &str) -> Result<Session, CodecError> {
        let text = self.decipher(cookie_value)?;
        Ok(Session::from_json(&text)?)
    }
}
