use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Download token is malformed")]
    Malformed,

    #[error("Download token has expired")]
    Expired,

    #[error("Download token signature is invalid")]
    InvalidSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks `"{expires_unix}.{hex_hmac}"` tokens bound to a report id
#[derive(Clone)]
pub struct DownloadSigner {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for DownloadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl DownloadSigner {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64),
        }
    }

    pub fn sign(&self, report_id: &str, now: DateTime<Utc>) -> SignedToken {
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();

        SignedToken {
            token: format!(
                "{}.{}",
                expires,
                hex::encode(self.mac(report_id, expires).finalize().into_bytes())
            ),
            expires_at,
        }
    }

    pub fn verify(
        &self,
        report_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let (expires, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        self.mac(report_id, expires)
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        if now.timestamp() > expires {
            return Err(TokenError::Expired);
        }

        Ok(())
    }

    fn mac(&self, report_id: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}:{}", report_id, expires).as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> DownloadSigner {
        DownloadSigner::new("secret", 3600)
    }

    #[test]
    fn test_token_format() {
        let now = Utc::now();
        let signed = signer().sign("r-1", now);
        let (expires, mac) = signed.token.split_once('.').unwrap();

        assert_eq!(expires, (now + Duration::hours(1)).timestamp().to_string());
        assert_eq!(mac.len(), 64);
    }

    #[test]
    fn test_valid_token_verifies() {
        let now = Utc::now();
        let signed = signer().sign("r-1", now);
        assert_eq!(signer().verify("r-1", &signed.token, now), Ok(()));
    }

    #[test]
    fn test_token_is_bound_to_report_and_secret() {
        let now = Utc::now();
        let signed = signer().sign("r-1", now);

        assert_eq!(
            signer().verify("r-2", &signed.token, now),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            DownloadSigner::new("other", 3600).verify("r-1", &signed.token, now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let signed = signer().sign("r-1", now);
        let later = now + Duration::hours(2);

        assert_eq!(signer().verify("r-1", &signed.token, later), Err(TokenError::Expired));
    }

    #[test]
    fn test_malformed_tokens() {
        let now = Utc::now();
        for token in ["", "abc", "123", "x.00", "123.zz"] {
            assert_eq!(
                signer().verify("r-1", token, now),
                Err(TokenError::Malformed),
                "{token}"
            );
        }
    }

    #[test]
    fn test_tampered_expiry_is_rejected() {
        let now = Utc::now();
        let signed = signer().sign("r-1", now);
        let (_, mac) = signed.token.split_once('.').unwrap();
        let forged = format!("{}.{}", now.timestamp() + 999_999, mac);

        assert_eq!(
            signer().verify("r-1", &forged, now),
            Err(TokenError::InvalidSignature)
        );
    }
}
