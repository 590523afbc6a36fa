use crate::classify::{classify_anomaly, classify_method};
use crate::models::{AnalysisResult, SessionStatus, UsageRecord};
use crate::session::Tab;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Placeholder for absent optional values.
pub const DASH: &str = "\u{2014}";

/// Format a byte count with binary units, e.g. `1536` -> `"1.5 KB"`.
///
/// Zero is rendered as `"0 B"`; every other value carries one decimal.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Total output volume across charging records.
pub fn total_output(records: &[UsageRecord]) -> String {
    let total = records
        .iter()
        .fold(0u64, |acc, record| acc.saturating_add(record.out_bytes));
    format_bytes(total)
}

/// Render a byte field, preferring the upstream pre-formatted string for
/// positive values. Zero always renders as `"0 B"`.
pub fn usage_bytes(bytes: u64, upstream: Option<&str>) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    match upstream {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format_bytes(bytes),
    }
}

/// Timeline timestamps arrive as `date_time`; show them with a space.
pub fn display_timestamp(ts: &str) -> String {
    ts.replacen('_', " ", 1)
}

/// Charging timestamps: same separator fix, truncated to second precision.
pub fn display_session_ts(ts: Option<&str>) -> String {
    match ts {
        Some(ts) if !ts.is_empty() => display_timestamp(ts).chars().take(19).collect(),
        _ => DASH.to_string(),
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => DASH,
    }
}

fn heading(output: &mut String, title: &str) {
    output.push_str(&format!("=== {} ===\n", title));
}

pub fn format_timeline(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "CALL FLOW TIMELINE");
    if result.timeline.is_empty() {
        output.push_str("No timeline events found.\n");
    } else {
        output.push_str(&format!(
            "{:>4}  {:<26} {:<8} {:<24} {}\n",
            "#", "Timestamp", "Dir", "Method", "Description"
        ));
        for (i, ev) in result.timeline.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:<26} {:<8} {:<24} {}\n",
                i + 1,
                display_timestamp(&ev.timestamp),
                ev.direction.as_str(),
                format!("{} [{}]", ev.method, classify_method(&ev.method).as_str()),
                ev.description,
            ));
            if let Some(raw) = ev.raw.as_deref().filter(|r| !r.is_empty()) {
                for raw_line in raw.lines() {
                    output.push_str(&format!("{:>6}| {}\n", "", raw_line));
                }
            }
        }
    }
    if let Some(ref routing) = result.routing_info {
        output.push_str("\nRouting Path\n");
        for hop in routing {
            output.push_str(&format!("  {}\n", hop));
        }
    }
    output
}

pub fn format_participants(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "PARTICIPANTS");
    if result.participants.is_empty() {
        output.push_str("No participants detected.\n");
        return output;
    }
    output.push_str(&format!(
        "{:<14} {:<16} {:<18} {:<28} {}\n",
        "Role", "Number", "IMSI", "Device", "IP"
    ));
    for p in &result.participants {
        output.push_str(&format!(
            "{:<14} {:<16} {:<18} {:<28} {}\n",
            or_dash(p.role.as_deref()),
            or_dash(p.number.as_deref()),
            or_dash(p.imsi.as_deref()),
            or_dash(p.device.as_deref()),
            or_dash(p.ip.as_deref()),
        ));
    }
    output
}

pub fn format_bye(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "BYE ANALYSIS");
    let Some(ref bye) = result.bye_info else {
        output.push_str("No BYE detected in this log.\n");
        return output;
    };
    output.push_str(&format!(
        "Sender:  {} {}\n",
        bye.sender,
        or_dash(bye.sender_number.as_deref())
    ));
    output.push_str(&format!(
        "Reason:  {}\n",
        bye.reason.as_deref().unwrap_or("None (user hang-up)")
    ));
    for evidence in &bye.evidence {
        output.push_str(&format!("  \u{2022} {}\n", evidence));
    }
    if !bye.raw_snippet.is_empty() {
        output.push_str("Raw BYE snippet:\n");
        output.push_str(&bye.raw_snippet);
        if !bye.raw_snippet.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}

pub fn format_rtp(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "RTP STATS");
    if result.rtp_stats.is_empty() {
        output.push_str("No RTP stats found.\n");
    } else {
        output.push_str(&format!(
            "{:<16} {:>9} {:>10} {:>9} {:>10} {:>6} {:>9} {:>8}  {}\n",
            "Leg", "Sent Pkts", "Sent Bytes", "Recv Pkts", "Recv Bytes", "Lost", "Discarded", "Jitter", "Codec"
        ));
        for r in &result.rtp_stats {
            let jitter = r
                .ji
                .as_deref()
                .map(|ji| format!("{} ms", ji))
                .unwrap_or_else(|| DASH.to_string());
            output.push_str(&format!(
                "{:<16} {:>9} {:>10} {:>9} {:>10} {:>6} {:>9} {:>8}  {}{}\n",
                r.leg,
                or_dash(r.ps.as_deref()),
                or_dash(r.os.as_deref()),
                or_dash(r.pr.as_deref()),
                or_dash(r.or_.as_deref()),
                or_dash(r.pl.as_deref()),
                or_dash(r.pd.as_deref()),
                jitter,
                or_dash(r.codec.as_deref()),
                if r.has_loss() { "  (loss)" } else { "" },
            ));
        }
    }
    if let Some(ref sdp) = result.sdp_info {
        output.push_str("\nSDP Negotiation\n");
        for (label, entries) in [("Offered", &sdp.offered), ("Answered", &sdp.answered)] {
            output.push_str(&format!("  {}:\n", label));
            for entry in entries {
                output.push_str(&format!("    {}: {}\n", entry.ua, entry.codecs.join(", ")));
            }
        }
    }
    output
}

pub fn format_anomalies(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "ANOMALIES");
    if result.anomalies.is_empty() {
        output.push_str("No anomalies detected.\n");
        return output;
    }
    for anomaly in &result.anomalies {
        output.push_str(&format!(
            "[{:<6}] {}\n",
            classify_anomaly(anomaly).as_str(),
            anomaly
        ));
    }
    output
}

pub fn format_data_usage(result: &AnalysisResult) -> String {
    let mut output = String::new();
    heading(&mut output, "DATA USAGE");
    let data = &result.data_usage;
    if data.is_empty() {
        output.push_str("No Diameter charging data found.\n");
    } else {
        let has_voice = data.iter().any(|d| d.voice_sec_fmt.is_some());
        for d in data {
            output.push_str(&format!(
                "{:<16} {:<14} {:<10} {:<10} {:<16} {:<19} {:<19} in {:>10} out {:>10} total {:>10}",
                or_dash(d.imsi.as_deref()),
                or_dash(d.msisdn.as_deref()),
                or_dash(d.apn.as_deref()),
                or_dash(d.service.as_deref()),
                or_dash(d.ip.as_deref()),
                display_session_ts(d.start_ts.as_deref()),
                display_session_ts(d.end_ts.as_deref()),
                usage_bytes(d.in_bytes, d.in_bytes_fmt.as_deref()),
                usage_bytes(d.out_bytes, d.out_bytes_fmt.as_deref()),
                usage_bytes(d.total_bytes, d.total_bytes_fmt.as_deref()),
            ));
            if has_voice {
                output.push_str(&format!(" voice {:>8}", or_dash(d.voice_sec_fmt.as_deref())));
            }
            output.push_str(&format!(
                " req {:>3} {}\n",
                d.req_count,
                status_label(d.status)
            ));
        }
        output.push_str(&format!(
            "Total sessions: {}  Terminated: {}  Total output: {}\n",
            data.len(),
            data.iter().filter(|d| d.status == SessionStatus::Terminated).count(),
            total_output(data),
        ));
    }
    if let Some(ref events) = result.pgw_events {
        output.push_str("\nPGW Events\n");
        for event in events {
            output.push_str(&format!("  {}\n", event));
        }
    }
    output
}

pub fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Terminated => "terminated",
    }
}

/// Render one view of the result as plain text.
pub fn format_section(result: &AnalysisResult, tab: Tab, raw_log: &str) -> String {
    match tab {
        Tab::Timeline => format_timeline(result),
        Tab::Participants => format_participants(result),
        Tab::Bye => format_bye(result),
        Tab::Rtp => format_rtp(result),
        Tab::Anomalies => format_anomalies(result),
        Tab::DataUsage => format_data_usage(result),
        Tab::RawLog => {
            let mut output = String::new();
            heading(&mut output, "RAW LOG");
            output.push_str(raw_log);
            output
        }
    }
}

/// Full plain-text report: timing chips followed by every result section.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut output = String::new();
    let timing = result.timing();
    if !timing.is_empty() {
        let chips: Vec<String> = timing
            .iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect();
        output.push_str(&chips.join("  |  "));
        output.push_str("\n\n");
    }
    let sections: Vec<String> = Tab::ALL
        .iter()
        .filter(|tab| **tab != Tab::RawLog)
        .map(|tab| format_section(result, *tab, ""))
        .collect();
    output.push_str(&sections.join("\n"));
    output
}

/// Format an analysis result as pretty-printed JSON.
pub fn format_json(result: &AnalysisResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
