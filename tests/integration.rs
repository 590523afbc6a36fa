use std::io::Write;
use std::sync::Mutex;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use sipview::classify::{classify_anomaly, Severity};
use sipview::client::Backend;
use sipview::error::{ClientError, ExportError, ValidationError};
use sipview::export::{export_as, ExportFormat};
use sipview::format;
use sipview::models::{parse_analysis_result, AnalysisResult, SessionStatus};
use sipview::request::{AnalysisFlag, AnalysisRequest, FormState, InlinePayload, InputMode};
use sipview::session::{Phase, Session, Tab};

const SAMPLE_RESULT: &str = r#"{
  "timeline": [
    {"timestamp": "2024-05-01_10:00:00.100", "direction": "OUT", "method": "INVITE", "description": "Call setup"},
    {"timestamp": "2024-05-01_10:00:00.300", "direction": "IN", "method": "180 Ringing", "description": "Alerting"},
    {"timestamp": "2024-05-01_10:00:03.000", "direction": "IN", "method": "200 OK", "description": "Answered"},
    {"timestamp": "2024-05-01_10:01:00.000", "direction": "OUT", "method": "BYE", "description": "Hang-up"}
  ],
  "participants": [
    {"role": "Caller (A)", "number": "+4912345", "imsi": "262011234567890", "device": "Pixel", "ip": "10.0.0.1"},
    {"role": "Callee (B)", "number": "+4967890", "imsi": null, "device": null, "ip": "10.0.0.2"}
  ],
  "bye_info": {
    "sender": "Caller",
    "sender_number": "+4912345",
    "reason": null,
    "evidence": ["BYE sent from caller leg"],
    "raw_snippet": "BYE sip:+4967890@ims SIP/2.0"
  },
  "rtp_stats": [
    {"leg": "caller", "ps": "1500", "os": "240000", "pr": "1490", "or_": "238400", "pl": "10", "pd": "0", "ji": "3", "codec": "AMR-WB"}
  ],
  "sdp_info": {"offered": [{"ua": "Pixel", "codecs": ["AMR-WB", "AMR"]}], "answered": []},
  "anomalies": ["500 Server Internal Error on re-INVITE", "SSRC changed mid-call", "Late PRACK"],
  "data_usage": [
    {"imsi": "262011234567890", "msisdn": "4912345", "apn": "ims", "service": "voice", "ip": "10.1.1.1",
     "start_ts": "2024-05-01 10:00:00.123", "end_ts": null,
     "in_bytes": 2048, "out_bytes": 1048576, "total_bytes": 1050624,
     "req_count": 3, "status": "terminated"}
  ],
  "answer_time": "2.9s",
  "ring_time": "2.7s",
  "call_duration": "57s"
}"#;

/// Backend double that records requests and returns canned outcomes.
struct MockBackend {
    analysis: Mutex<Option<Result<AnalysisResult, ClientError>>>,
    export_bytes: Option<Vec<u8>>,
    requests: Mutex<Vec<AnalysisRequest>>,
    exports: Mutex<Vec<(ExportFormat, InlinePayload)>>,
}

impl MockBackend {
    fn new(analysis: Result<AnalysisResult, ClientError>) -> Self {
        Self {
            analysis: Mutex::new(Some(analysis)),
            export_bytes: Some(b"timestamp,direction,method\n".to_vec()),
            requests: Mutex::new(Vec::new()),
            exports: Mutex::new(Vec::new()),
        }
    }
}

impl Backend for MockBackend {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        self.analysis
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ClientError::Transport("no canned response".to_string())))
    }

    fn export(&self, format: ExportFormat, payload: &InlinePayload) -> Result<Vec<u8>, ClientError> {
        self.exports.lock().unwrap().push((format, payload.clone()));
        self.export_bytes.clone().ok_or_else(|| ClientError::Api {
            status: 422,
            detail: "No call data".to_string(),
        })
    }
}

fn pasted_form(log: &str) -> FormState {
    FormState {
        caller: "+4912345".to_string(),
        log: log.to_string(),
        ..Default::default()
    }
}

fn sample() -> AnalysisResult {
    parse_analysis_result(SAMPLE_RESULT).unwrap()
}

#[test]
fn test_sample_result_parses() {
    let result = sample();
    assert_eq!(result.timeline.len(), 4);
    assert_eq!(result.participants[1].imsi, None);
    assert_eq!(result.data_usage[0].status, SessionStatus::Terminated);
    assert_eq!(result.data_usage[0].out_bytes, 1_048_576);
    assert!(result.rtp_stats[0].has_loss());
    assert!(result.pgw_events.is_none());
}

#[test]
fn test_anomaly_severities_in_sample() {
    let severities: Vec<Severity> = sample().anomalies.iter().map(|a| classify_anomaly(a)).collect();
    assert_eq!(severities, vec![Severity::High, Severity::Medium, Severity::Low]);
}

#[test]
fn test_report_covers_every_section() {
    let report = format::format_report(&sample());
    assert!(report.contains("Post-Dial Delay"));
    assert!(report.contains("INVITE"));
    assert!(report.contains("+4967890"));
    assert!(report.contains("AMR-WB"));
    assert!(report.contains("[high  ] 500 Server Internal Error"));
    assert!(report.contains("1.0 MB"));
}

#[test]
fn test_session_submit_success_with_mock() {
    let backend = MockBackend::new(Ok(sample()));
    let mut session = Session::new(pasted_form("INVITE sip:bob SIP/2.0\nBYE sip:bob SIP/2.0\n"));
    session.select_tab(Tab::Anomalies);

    let phase = session.submit(&backend).unwrap();

    assert_eq!(phase, Phase::Succeeded);
    assert_eq!(session.tab(), Tab::Timeline);
    assert_eq!(session.badge(Tab::Timeline), Some(4));
    assert_eq!(session.badge(Tab::Bye), None);
    assert!(session.error().is_none());

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].endpoint(), "/analyze");
}

#[test]
fn test_session_submit_failure_shows_detail() {
    let backend = MockBackend::new(Err(ClientError::Api {
        status: 400,
        detail: "Log contains no SIP messages".to_string(),
    }));
    let mut session = Session::new(pasted_form("garbage"));

    let phase = session.submit(&backend).unwrap();

    assert_eq!(phase, Phase::Failed);
    assert!(session.result().is_none());
    assert_eq!(session.error(), Some("Log contains no SIP messages"));
}

#[test]
fn test_session_rejects_empty_log_without_request() {
    let backend = MockBackend::new(Ok(sample()));
    let mut session = Session::new(pasted_form("   \n"));

    let err = session.submit(&backend).unwrap_err();

    assert!(matches!(err, ValidationError::EmptyLog));
    assert!(backend.requests.lock().unwrap().is_empty());
}

#[test]
fn test_upload_request_with_mock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("call.log");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"INVITE sip:bob SIP/2.0\n").unwrap();

    let backend = MockBackend::new(Ok(AnalysisResult::default()));
    let mut form = pasted_form("");
    form.mode = InputMode::File;
    form.file = Some(path);
    form.flags.insert(AnalysisFlag::Sdp);
    let mut session = Session::new(form);

    assert_eq!(session.submit(&backend).unwrap(), Phase::Succeeded);
    assert_eq!(session.submitted_log(), "INVITE sip:bob SIP/2.0\n");

    let requests = backend.requests.lock().unwrap();
    match &requests[0] {
        AnalysisRequest::Upload(upload) => {
            assert_eq!(upload.file_name, "call.log");
            assert_eq!(upload.flags_json, r#"["+sdp"]"#);
            assert_eq!(upload.fields, vec![("caller", "+4912345".to_string())]);
        }
        other => panic!("expected upload, got {:?}", other),
    }
}

#[test]
fn test_export_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new(Ok(sample()));
    let form = pasted_form("INVITE sip:bob SIP/2.0");

    let path = export_as(&backend, ExportFormat::Csv, &form, dir.path()).unwrap();

    assert_eq!(path, dir.path().join("sip_analysis.csv"));
    assert_eq!(std::fs::read(&path).unwrap(), b"timestamp,direction,method\n");
    let exports = backend.exports.lock().unwrap();
    assert_eq!(exports[0].0, ExportFormat::Csv);
    assert_eq!(exports[0].1.log, "INVITE sip:bob SIP/2.0");
}

#[test]
fn test_export_failure_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = MockBackend::new(Ok(sample()));
    backend.export_bytes = None;

    let err = export_as(&backend, ExportFormat::Pdf, &pasted_form("log"), dir.path()).unwrap_err();

    assert!(matches!(err, ExportError::Request(ClientError::Api { status: 422, .. })));
    assert!(!dir.path().join("sip_analysis.pdf").exists());
}

// --- CLI tests ---

#[test]
fn test_cli_search_brackets_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("call.log");
    std::fs::write(&path, "INVITE sip:bob\n100 Trying\nSIP/2.0 200 OK\ninvite again\n").unwrap();

    cargo_bin_cmd!("sipview")
        .args(["search", path.to_str().unwrap(), "invite"])
        .assert()
        .success()
        .stdout(predicates::str::contains("1: [INVITE] sip:bob"))
        .stdout(predicates::str::contains("4: [invite] again"))
        .stdout(predicates::str::contains("Trying").not())
        .stderr(predicates::str::contains("2 / 4 lines"));
}

#[test]
fn test_cli_search_empty_query_lists_all_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("call.log");
    std::fs::write(&path, "a\nb\nc\n").unwrap();

    cargo_bin_cmd!("sipview")
        .args(["search", path.to_str().unwrap(), ""])
        .assert()
        .success()
        .stderr(predicates::str::contains("3 / 3 lines"));
}

#[test]
fn test_cli_analyze_empty_log_fails_before_request() {
    cargo_bin_cmd!("sipview")
        .args(["analyze", "--api-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("paste mode requires non-empty log text"));
}

#[test]
fn test_cli_analyze_reads_stdin() {
    // An empty STDIN is still an empty log.
    cargo_bin_cmd!("sipview")
        .args(["analyze", "-"])
        .write_stdin("   ")
        .assert()
        .failure()
        .stderr(predicates::str::contains("paste mode requires non-empty log text"));
}

#[test]
fn test_cli_export_empty_log_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("sipview")
        .args(["export", "--format", "pdf", "--out", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("paste mode requires non-empty log text"));
    assert!(!dir.path().join("sip_analysis.pdf").exists());
}

#[test]
fn test_cli_rejects_unknown_flag() {
    cargo_bin_cmd!("sipview")
        .args(["analyze", "--flag", "+bogus", "-"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("bogus"));
}

#[test]
fn test_cli_unreachable_service_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("call.log");
    std::fs::write(&path, "INVITE sip:bob SIP/2.0\n").unwrap();

    cargo_bin_cmd!("sipview")
        .args([
            "analyze",
            "--log-file",
            path.to_str().unwrap(),
            "--api-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure();
}
