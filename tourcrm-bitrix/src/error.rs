//! Error types for the Bitrix24 client

use thiserror::Error;

/// Errors returned by Bitrix24 REST calls
#[derive(Error, Debug)]
pub enum BitrixError {
    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP error calling {method}: {source}")]
    Http {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// Portal answered with an `error` envelope
    #[error("Bitrix24 error in {method}: {code}: {description}")]
    Api {
        method: String,
        code: String,
        description: String,
    },

    /// Non-2xx answer without a readable error envelope
    #[error("unexpected HTTP status {status} from {method}")]
    Status { method: String, status: u16 },

    /// `result` did not match the expected shape
    #[error("failed to decode {method} result: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// `result` was valid JSON but not what the method promises
    #[error("unexpected {method} result: {detail}")]
    UnexpectedResult { method: String, detail: String },

    /// Missing or malformed webhook settings
    #[error("Bitrix24 is not configured: {reason}")]
    NotConfigured { reason: String },
}

impl BitrixError {
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            reason: reason.into(),
        }
    }

    pub fn unexpected(method: &str, detail: impl Into<String>) -> Self {
        Self::UnexpectedResult {
            method: method.to_owned(),
            detail: detail.into(),
        }
    }

    /// Portal-side error code, when the portal supplied one.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BitrixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_code() {
        let err = BitrixError::Api {
            method: "crm.contact.add".into(),
            code: "ACCESS_DENIED".into(),
            description: "Access denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "Bitrix24 error in crm.contact.add: ACCESS_DENIED: Access denied"
        );
        assert_eq!(err.api_code(), Some("ACCESS_DENIED"));
    }

    #[test]
    fn non_api_errors_have_no_code() {
        let err = BitrixError::not_configured("webhook url missing");
        assert!(err.api_code().is_none());
        assert!(err.to_string().contains("webhook url missing"));
    }
}
