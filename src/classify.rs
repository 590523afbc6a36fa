//! Presentation classifiers over backend-authored strings.
//!
//! Each classifier is an ordered rule table: the first matching rule wins and
//! a fixed default covers everything else. Matching is case-sensitive because
//! the strings are generated by the parser service, which controls their casing.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

const SEVERITY_RULES: &[(&[&str], Severity)] = &[
    (&["500", "Network down"], Severity::High),
    (&["SSRC", "charging", "quota"], Severity::Medium),
];

/// Classify a free-text anomaly. Total: unmatched text is `Low`.
pub fn classify_anomaly(text: &str) -> Severity {
    SEVERITY_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Low)
}

/// Colour class of a timeline row's method or status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodClass {
    Ok,
    Ringing,
    Progress,
    Trying,
    ServerError,
    Invite,
    Bye,
    Cancel,
    Register,
    Prack,
    Notify,
    Codec,
    Internal,
}

impl MethodClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodClass::Ok => "ok",
            MethodClass::Ringing => "ringing",
            MethodClass::Progress => "progress",
            MethodClass::Trying => "trying",
            MethodClass::ServerError => "serverError",
            MethodClass::Invite => "INVITE",
            MethodClass::Bye => "BYE",
            MethodClass::Cancel => "CANCEL",
            MethodClass::Register => "REGISTER",
            MethodClass::Prack => "PRACK",
            MethodClass::Notify => "NOTIFY",
            MethodClass::Codec => "CODEC",
            MethodClass::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Prefix(&'static str),
    Exact(&'static str),
}

impl Matcher {
    fn matches(&self, input: &str) -> bool {
        match self {
            Matcher::Prefix(prefix) => input.starts_with(prefix),
            Matcher::Exact(exact) => input == *exact,
        }
    }
}

// Status prefixes come first so that e.g. "503 Service Unavailable" never
// falls through to the method enumeration.
const METHOD_RULES: &[(Matcher, MethodClass)] = &[
    (Matcher::Prefix("200"), MethodClass::Ok),
    (Matcher::Prefix("180"), MethodClass::Ringing),
    (Matcher::Prefix("183"), MethodClass::Progress),
    (Matcher::Prefix("100"), MethodClass::Trying),
    (Matcher::Prefix("5"), MethodClass::ServerError),
    (Matcher::Exact("INVITE"), MethodClass::Invite),
    (Matcher::Exact("BYE"), MethodClass::Bye),
    (Matcher::Exact("CANCEL"), MethodClass::Cancel),
    (Matcher::Exact("REGISTER"), MethodClass::Register),
    (Matcher::Exact("PRACK"), MethodClass::Prack),
    (Matcher::Exact("NOTIFY"), MethodClass::Notify),
    (Matcher::Exact("CODEC"), MethodClass::Codec),
    (Matcher::Exact("INTERNAL"), MethodClass::Internal),
];

pub fn classify_method(method: &str) -> MethodClass {
    METHOD_RULES
        .iter()
        .find(|(matcher, _)| matcher.matches(method))
        .map(|(_, class)| *class)
        .unwrap_or(MethodClass::Internal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTag {
    Caller,
    Callee,
    Other,
}

pub fn classify_role(role: Option<&str>) -> RoleTag {
    match role {
        Some(r) if r.contains("Caller") => RoleTag::Caller,
        Some(r) if r.contains("Callee") => RoleTag::Callee,
        _ => RoleTag::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApnTag {
    Chili,
    Ims,
    Internet,
    Other,
}

pub fn classify_apn(apn: Option<&str>) -> ApnTag {
    match apn {
        Some("chili") => ApnTag::Chili,
        Some("ims") => ApnTag::Ims,
        Some("internet") => ApnTag::Internet,
        _ => ApnTag::Other,
    }
}
