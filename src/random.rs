//! Random-value challenges: generation and verification per BR §3.2.2.4.4-7.
//!
//! Entropy is only ever enforced at generation time; verification judges a
//! candidate purely on length, character set, and freshness against the
//! `ValidationState` it was issued alongside.

use crate::config::Config;
use crate::errors::DcvError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::{Duration, SystemTime};

/// Draws a cryptographically strong, 32-character alphanumeric token (>112
/// bits of entropy: 62^32 possibilities).
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Checks `candidate` against the rules in BR §3.2.2.4.4: non-empty, at
/// least `config.min_random_value_length` characters, and issued within
/// `config.random_value_validity_window` of `now` (allowing
/// `config.clock_skew` of clock drift in either direction).
pub fn verify(
    config: &Config,
    candidate: &str,
    prepare_time: SystemTime,
    now: SystemTime,
) -> Result<(), DcvError> {
    if candidate.is_empty() {
        return Err(DcvError::TextParse("random value body was empty".to_string()));
    }

    if candidate.len() < config.min_random_value_length {
        return Err(DcvError::TextParse(format!(
            "random value shorter than minimum of {} characters",
            config.min_random_value_length
        )));
    }

    if let Ok(skew) = prepare_time.duration_since(now) {
        if skew > config.clock_skew {
            return Err(DcvError::TextParse(
                "random value prepareTime is in the future".to_string(),
            ));
        }
    }

    let age = now
        .duration_since(prepare_time)
        .unwrap_or(Duration::ZERO);

    if age > config.random_value_validity_window {
        return Err(DcvError::Expired);
    }

    Ok(())
}

/// Scans `body` for the first whitespace-delimited token equal to
/// `expected`, the way a file or TXT payload is searched for a published
/// random value.
pub fn find_in_body(body: &str, expected: &str) -> Result<(), DcvError> {
    if body.trim().is_empty() {
        return Err(DcvError::TextParse("empty text body".to_string()));
    }

    if body.split_whitespace().any(|tok| tok == expected) {
        Ok(())
    } else {
        Err(DcvError::RecordNotFound {
            name: expected.to_string(),
            rtype: crate::dns::Type::TXT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_values_meet_length_and_alphabet() {
        for _ in 0..16 {
            let r = generate();
            assert_eq!(r.len(), 32);
            assert!(r.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn verify_round_trip() {
        let config = Config::builder()
            .dns_servers(vec!["8.8.8.8:53".parse().unwrap()])
            .build()
            .unwrap();

        let now = SystemTime::now();
        let r = generate();
        assert!(verify(&config, &r, now, now).is_ok());

        let expired = now - Duration::from_secs(31 * 24 * 3600);
        assert!(matches!(verify(&config, &r, expired, now), Err(DcvError::Expired)));
    }
}
