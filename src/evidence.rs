//! The protocol output: an immutable [`DomainValidationEvidence`] record,
//! plus the [`MpicDetails`] and [`DnssecDetails`] it carries. Serialized
//! with `serde_json` to the canonical wire shape an auditor replays.

use crate::dns::client::DnssecDetails;
use crate::method::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Per-agent corroboration outcome, plus the overall quorum decision.
/// Invariant: `corroborated` implies at least `total_quorum` entries in
/// `per_agent_corroboration` are `true`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MpicDetails {
    pub corroborated: bool,
    pub primary_agent_id: String,
    pub total_quorum: usize,
    pub attempt_count: usize,
    pub per_agent_corroboration: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_corroboration_reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnssecEvidence {
    pub secure: bool,
    pub ad_flag: bool,
}

impl From<&DnssecDetails> for DnssecEvidence {
    fn from(d: &DnssecDetails) -> Self {
        DnssecEvidence {
            secure: d.secure,
            ad_flag: d.ad_flag,
        }
    }
}

/// The audit artifact of one successful `validate` call. Exactly one of
/// `random_value`/`request_token` and one of
/// `file_url`/`dns_record_name`/`email_address` is populated, depending on
/// `method`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainValidationEvidence {
    pub domain: String,
    pub method: Method,
    #[serde(with = "humantime_serde_compat")]
    pub validation_date: SystemTime,
    pub br_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_record_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    pub mpic_details: MpicDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec_details: Option<DnssecEvidence>,
}

/// `SystemTime` has no native serde support; this mirrors the RFC 3339
/// rendering the teacher's `chrono` dependency already provides elsewhere.
mod humantime_serde_compat {
    use chrono::{DateTime, Utc};
    use serde::Serializer;
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let dt: DateTime<Utc> = (*t).into();
        s.serialize_str(&dt.to_rfc3339())
    }
}
