use crate::credential_store::CredentialFields;
use thiserror::Error;

/// Key under which the shared upstream credential is stored.
pub const CREDENTIAL_KEY: &str = "upstream_access_token";

const FIELD_ENCRYPTED_TOKEN: &str = "encrypted_token";
const FIELD_EXPIRES_IN: &str = "expires_in";
const FIELD_CREATED_AT: &str = "created_at";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("credential grant failed: {0:#}")]
    Grant(anyhow::Error),

    #[error("token cipher failure: {0}")]
    Cipher(String),

    #[error("stored credential is malformed: {0}")]
    MalformedRecord(String),

    #[error("credential store failure: {0:#}")]
    Store(anyhow::Error),
}

impl TokenError {
    /// Errors caused by the stored record itself, cured by writing a new one.
    pub fn is_bad_record(&self) -> bool {
        matches!(self, TokenError::MalformedRecord(_) | TokenError::Cipher(_))
    }
}

/// Persisted shape of the upstream credential.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub encrypted_token: String,
    pub expires_in_sec: i64,
    pub created_at_ms: i64,
}

/// Expiry instant of a credential created at `created_at_ms` and valid for
/// `expires_in_sec`, or `None` when the lifetime is negative or overflows.
pub fn checked_expiry_ms(created_at_ms: i64, expires_in_sec: i64) -> Option<i64> {
    if expires_in_sec < 0 {
        return None;
    }
    expires_in_sec.checked_mul(1000)?.checked_add(created_at_ms)
}

impl CredentialRecord {
    pub fn expires_at_ms(&self) -> i64 {
        self.expires_in_sec
            .saturating_mul(1000)
            .saturating_add(self.created_at_ms)
    }

    pub fn to_fields(&self) -> CredentialFields {
        CredentialFields::from([
            (
                FIELD_ENCRYPTED_TOKEN.to_string(),
                self.encrypted_token.clone(),
            ),
            (FIELD_EXPIRES_IN.to_string(), self.expires_in_sec.to_string()),
            (FIELD_CREATED_AT.to_string(), self.created_at_ms.to_string()),
        ])
    }

    pub fn from_fields(fields: &CredentialFields) -> Result<Self, TokenError> {
        let get = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| TokenError::MalformedRecord(format!("missing field {}", name)))
        };
        let get_int = |name: &str| {
            get(name)?.parse::<i64>().map_err(|e| {
                TokenError::MalformedRecord(format!("field {} is not an integer: {}", name, e))
            })
        };

        let record = Self {
            encrypted_token: get(FIELD_ENCRYPTED_TOKEN)?.clone(),
            expires_in_sec: get_int(FIELD_EXPIRES_IN)?,
            created_at_ms: get_int(FIELD_CREATED_AT)?,
        };
        if checked_expiry_ms(record.created_at_ms, record.expires_in_sec).is_none() {
            return Err(TokenError::MalformedRecord(format!(
                "lifetime of {}s from {} is out of range",
                record.expires_in_sec, record.created_at_ms
            )));
        }
        Ok(record)
    }
}
