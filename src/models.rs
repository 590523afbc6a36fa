use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SchemaError;

/// One complete analysis of a call log, replaced wholesale on each submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "nullable_seq")]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub bye_info: Option<ByeInfo>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub rtp_stats: Vec<RtpRow>,
    #[serde(default)]
    pub sdp_info: Option<SdpInfo>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub anomalies: Vec<String>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub data_usage: Vec<UsageRecord>,
    #[serde(default)]
    pub answer_time: Option<String>,
    #[serde(default)]
    pub ring_time: Option<String>,
    #[serde(default)]
    pub call_duration: Option<String>,
    /// Gateway events, only present when `+pgw` or `+full` was requested.
    #[serde(default)]
    pub pgw_events: Option<Vec<String>>,
    /// Routing path detail, only present when `+routing` or `+full` was requested.
    #[serde(default)]
    pub routing_info: Option<Vec<String>>,
}

impl AnalysisResult {
    /// Call-timing chips in display order, skipping absent values.
    pub fn timing(&self) -> Vec<(&'static str, &str)> {
        [
            ("Post-Dial Delay", self.answer_time.as_deref()),
            ("Ring Time", self.ring_time.as_deref()),
            ("Call Duration", self.call_duration.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|v| (label, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
    Internal,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
            Direction::Internal => "INTERNAL",
        }
    }
}

/// One row of the call flow. Order in `AnalysisResult::timeline` is chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: String,
    pub direction: Direction,
    pub method: String,
    pub description: String,
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub imsi: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByeInfo {
    pub sender: String,
    #[serde(default)]
    pub sender_number: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub raw_snippet: String,
}

/// Per-leg media counters. Values are carried exactly as upstream sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpRow {
    pub leg: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ps: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pr: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub or_: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pl: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pd: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ji: Option<String>,
    #[serde(default)]
    pub codec: Option<String>,
}

impl RtpRow {
    /// True when the lost-packets counter is present and not `"0"`.
    pub fn has_loss(&self) -> bool {
        self.pl.as_deref().is_some_and(|pl| pl != "0")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdpInfo {
    #[serde(default, deserialize_with = "nullable_seq")]
    pub offered: Vec<SdpEntry>,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub answered: Vec<SdpEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdpEntry {
    pub ua: String,
    #[serde(default, deserialize_with = "nullable_seq")]
    pub codecs: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Terminated,
}

/// One Diameter charging session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default)]
    pub imsi: Option<String>,
    #[serde(default)]
    pub msisdn: Option<String>,
    #[serde(default)]
    pub apn: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    #[serde(default, deserialize_with = "clamped_bytes")]
    pub in_bytes: u64,
    #[serde(default, deserialize_with = "clamped_bytes")]
    pub out_bytes: u64,
    #[serde(default, deserialize_with = "clamped_bytes")]
    pub total_bytes: u64,
    #[serde(default)]
    pub in_bytes_fmt: Option<String>,
    #[serde(default)]
    pub out_bytes_fmt: Option<String>,
    #[serde(default)]
    pub total_bytes_fmt: Option<String>,
    #[serde(default)]
    pub voice_sec_fmt: Option<String>,
    #[serde(default)]
    pub req_count: u64,
    #[serde(default)]
    pub status: SessionStatus,
}

/// Deserialize a backend response body into an [`AnalysisResult`].
pub fn parse_analysis_result(raw: &str) -> Result<AnalysisResult, SchemaError> {
    Ok(serde_json::from_str(raw)?)
}

fn nullable_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    UInt(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => s,
        Scalar::UInt(n) => n.to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

fn clamped_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Scalar>::deserialize(deserializer)? {
        None => 0,
        Some(Scalar::UInt(n)) => n,
        Some(Scalar::Int(n)) => n.max(0) as u64,
        Some(Scalar::Float(n)) if n.is_finite() && n > 0.0 => n as u64,
        Some(Scalar::Float(_)) => 0,
        Some(Scalar::Text(s)) => s.trim().parse::<u64>().unwrap_or(0),
        Some(Scalar::Bool(_)) => 0,
    };
    Ok(value)
}
