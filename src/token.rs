//! Request-Token challenges: `<yyyymmddHHmmss><hex-sha256>`, binding a
//! CA-side salt (`key`) to an applicant-specific value (`value`, typically a
//! CSR or an ACME account key thumbprint) and a timestamp.

use crate::errors::DcvError;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};

const TIMESTAMP_LEN: usize = 14;
const DIGEST_HEX_LEN: usize = 64;
const TOKEN_LEN: usize = TIMESTAMP_LEN + DIGEST_HEX_LEN;
const VALIDITY_DAYS: i64 = 30;

fn digest(key: &str, value: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(value.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds a token for `key`/`value` stamped at `now`.
pub fn generate(key: &str, value: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d%H%M%S").to_string();
    let hash = digest(key, value, &timestamp);
    format!("{}{}", timestamp, hash)
}

/// Scans `body` for every substring shaped like a Request-Token, and
/// returns the first one whose timestamp falls in `(now - 30d, now]` and
/// whose hash matches `key`/`value`.
pub fn find_in_body(body: &str, key: &str, value: &str, now: DateTime<Utc>) -> Result<String, DcvError> {
    if body.trim().is_empty() {
        return Err(DcvError::TextParse("empty text body".to_string()));
    }

    let bytes = body.as_bytes();
    let mut found_malformed = false;

    for start in 0..bytes.len() {
        if start + TOKEN_LEN > bytes.len() {
            break;
        }

        let candidate = &body[start..start + TOKEN_LEN];
        if !candidate.is_ascii() {
            continue;
        }

        let (ts_str, hash_str) = candidate.split_at(TIMESTAMP_LEN);
        if !ts_str.bytes().all(|b| b.is_ascii_digit())
            || !hash_str.bytes().all(|b| b.is_ascii_hexdigit())
        {
            continue;
        }

        let timestamp = match NaiveDateTime::parse_from_str(ts_str, "%Y%m%d%H%M%S") {
            Ok(t) => DateTime::<Utc>::from_utc(t, Utc),
            Err(_) => {
                found_malformed = true;
                continue;
            }
        };

        if timestamp > now {
            found_malformed = true;
            continue;
        }

        if now - timestamp > ChronoDuration::days(VALIDITY_DAYS) {
            found_malformed = true;
            continue;
        }

        let expected_hash = digest(key, value, ts_str);
        if hash_str.eq_ignore_ascii_case(&expected_hash) {
            return Ok(candidate.to_string());
        }
    }

    if found_malformed {
        Err(DcvError::TextParse(
            "request token present but outside its validity window".to_string(),
        ))
    } else {
        Err(DcvError::RecordNotFound {
            name: "request-token".to_string(),
            rtype: crate::dns::Type::TXT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_round_trips() {
        let now = Utc::now();
        let token = generate("salt", "csr-bytes", now);
        assert_eq!(token.len(), TOKEN_LEN);

        let body = format!("unrelated preamble {} trailing text", token);
        let found = find_in_body(&body, "salt", "csr-bytes", now).unwrap();
        assert_eq!(found, token);
    }

    #[test]
    fn wrong_key_does_not_match() {
        let now = Utc::now();
        let token = generate("salt", "csr-bytes", now);
        let body = format!("body with {}", token);
        assert!(find_in_body(&body, "other-salt", "csr-bytes", now).is_err());
    }
}
