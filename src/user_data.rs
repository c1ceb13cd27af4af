//! User data codec.
//!
//! User data is addon-specific configuration held by the client and carried
//! as a single path segment, e.g. `/eyJrZXkiOiIxMjMifQ/stream/movie/tt1.json`.
//! It is decoded fresh on every request and never cached.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// How the user data segment is encoded in the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDataEncoding {
    /// URL path escaping, e.g. `%7B%22key%22%3A%22123%22%7D`.
    #[default]
    Url,
    /// URL-safe Base64, with or without `=` padding.
    Base64Url,
}

impl UserDataEncoding {
    /// Encode a value the way clients are expected to put it into the URL.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        Ok(match self {
            UserDataEncoding::Url => urlencoding::encode_binary(&json).into_owned(),
            UserDataEncoding::Base64Url => URL_SAFE_NO_PAD.encode(json),
        })
    }

    fn decode_bytes<'a>(&self, token: &'a str) -> Result<Cow<'a, [u8]>, BadUserData> {
        match self {
            UserDataEncoding::Base64Url => URL_SAFE_NO_PAD
                .decode(token.trim_end_matches('='))
                .map(Cow::Owned)
                .map_err(|e| BadUserData::Encoding(e.to_string())),
            UserDataEncoding::Url => urlencoding::decode(token)
                .map(|s| match s {
                    Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                    Cow::Owned(s) => Cow::Owned(s.into_bytes()),
                })
                .map_err(|e| BadUserData::Encoding(e.to_string())),
        }
    }
}

/// Decoder from raw user data bytes into the integrator's type.
pub type UserDataDecoder<U> = Arc<dyn Fn(&[u8]) -> Result<U, serde_json::Error> + Send + Sync>;

/// Declares the shape of the user data.
pub enum UserDataFormat<U> {
    /// No type was declared. The segment is handed to handlers as a string.
    Opaque,
    /// The segment is decoded into `U`.
    Typed(UserDataDecoder<U>),
}

impl<U: DeserializeOwned + 'static> UserDataFormat<U> {
    /// Decode the segment as JSON into `U`.
    pub fn json() -> Self {
        UserDataFormat::Typed(Arc::new(|bytes: &[u8]| serde_json::from_slice(bytes)))
    }
}

impl<U> Clone for UserDataFormat<U> {
    fn clone(&self) -> Self {
        match self {
            UserDataFormat::Opaque => UserDataFormat::Opaque,
            UserDataFormat::Typed(decoder) => UserDataFormat::Typed(decoder.clone()),
        }
    }
}

impl<U> fmt::Debug for UserDataFormat<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserDataFormat::Opaque => f.write_str("Opaque"),
            UserDataFormat::Typed(_) => f.write_str("Typed"),
        }
    }
}

/// Decoded user data as handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserData<U> {
    /// The request carried no user data.
    Absent,
    /// No type was declared; the percent-decoded segment.
    Opaque(String),
    /// A freshly decoded value.
    Typed(U),
}

impl<U> UserData<U> {
    pub fn is_absent(&self) -> bool {
        matches!(self, UserData::Absent)
    }

    pub fn typed(&self) -> Option<&U> {
        match self {
            UserData::Typed(u) => Some(u),
            _ => None,
        }
    }

    pub fn into_typed(self) -> Option<U> {
        match self {
            UserData::Typed(u) => Some(u),
            _ => None,
        }
    }

    pub fn opaque(&self) -> Option<&str> {
        match self {
            UserData::Opaque(s) => Some(s),
            _ => None,
        }
    }
}

/// User data that couldn't be decoded. Always answered with 400.
#[derive(Debug, thiserror::Error)]
pub enum BadUserData {
    #[error("Couldn't decode user data: {0}")]
    Encoding(String),
    #[error("Couldn't unmarshal user data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns the raw user data path segment into [`UserData`].
pub struct UserDataCodec<U> {
    format: UserDataFormat<U>,
    encoding: UserDataEncoding,
}

impl<U> Clone for UserDataCodec<U> {
    fn clone(&self) -> Self {
        Self {
            format: self.format.clone(),
            encoding: self.encoding,
        }
    }
}

impl<U> fmt::Debug for UserDataCodec<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDataCodec")
            .field("format", &self.format)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl<U: fmt::Debug> UserDataCodec<U> {
    pub fn new(format: UserDataFormat<U>, encoding: UserDataEncoding) -> Self {
        Self { format, encoding }
    }

    pub fn encoding(&self) -> UserDataEncoding {
        self.encoding
    }

    /// Decode a raw (still escaped) path segment.
    pub fn decode(&self, token: &str) -> Result<UserData<U>, BadUserData> {
        if token.is_empty() {
            return Ok(UserData::Absent);
        }

        tracing::debug!(user_data = token, "Decoding user data");

        let decoder = match &self.format {
            UserDataFormat::Opaque => {
                return urlencoding::decode(token)
                    .map(|s| UserData::Opaque(s.into_owned()))
                    .map_err(|e| {
                        tracing::warn!(user_data = token, error = %e, "Couldn't unescape user data");
                        BadUserData::Encoding(e.to_string())
                    });
            }
            UserDataFormat::Typed(decoder) => decoder,
        };

        let bytes = self.encoding.decode_bytes(token).inspect_err(|e| {
            tracing::warn!(user_data = token, error = %e, "Couldn't decode user data");
        })?;

        let user_data = decoder(&bytes).map_err(|e| {
            tracing::warn!(user_data = token, error = %e, "Couldn't unmarshal user data");
            BadUserData::Json(e)
        })?;

        tracing::debug!(user_data = ?user_data, "Decoded user data");
        Ok(UserData::Typed(user_data))
    }
}
