use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValidationError;

/// Opt-in analysis detail toggles, passed through to the parser unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisFlag {
    Sdp,
    Pgw,
    Routing,
    Full,
}

impl AnalysisFlag {
    pub const ALL: [AnalysisFlag; 4] = [
        AnalysisFlag::Sdp,
        AnalysisFlag::Pgw,
        AnalysisFlag::Routing,
        AnalysisFlag::Full,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisFlag::Sdp => "+sdp",
            AnalysisFlag::Pgw => "+pgw",
            AnalysisFlag::Routing => "+routing",
            AnalysisFlag::Full => "+full",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisFlag::Sdp => "SDP Negotiation",
            AnalysisFlag::Pgw => "PGW Events",
            AnalysisFlag::Routing => "Routing Path",
            AnalysisFlag::Full => "Full Analysis",
        }
    }
}

impl fmt::Display for AnalysisFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisFlag {
    type Err = String;

    /// Accepts the wire form (`+sdp`) or the bare name (`sdp`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('+');
        AnalysisFlag::ALL
            .into_iter()
            .find(|flag| &flag.as_str()[1..] == name)
            .ok_or_else(|| {
                format!(
                    "unknown flag '{}' (expected one of: +sdp, +pgw, +routing, +full)",
                    s
                )
            })
    }
}

/// Selected flags with toggle semantics: no duplicates, selection order kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet(Vec<AnalysisFlag>);

impl FlagSet {
    pub fn toggle(&mut self, flag: AnalysisFlag) {
        if let Some(pos) = self.0.iter().position(|f| *f == flag) {
            self.0.remove(pos);
        } else {
            self.0.push(flag);
        }
    }

    pub fn insert(&mut self, flag: AnalysisFlag) {
        if !self.contains(flag) {
            self.0.push(flag);
        }
    }

    pub fn contains(&self, flag: AnalysisFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn to_wire(&self) -> Vec<String> {
        self.0.iter().map(|f| f.as_str().to_string()).collect()
    }
}

impl FromIterator<AnalysisFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = AnalysisFlag>>(iter: I) -> Self {
        let mut set = FlagSet::default();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Paste,
    File,
}

/// User-editable form. Read by submission and export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub caller: String,
    pub callee: String,
    pub caller_imsi: String,
    pub callee_imsi: String,
    pub log: String,
    pub file: Option<PathBuf>,
    pub flags: FlagSet,
    pub mode: InputMode,
}

impl FormState {
    /// Whether the current input is eligible for submission.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.mode {
            InputMode::Paste if self.log.trim().is_empty() => Err(ValidationError::EmptyLog),
            InputMode::File if self.file.is_none() => Err(ValidationError::NoFile),
            _ => Ok(()),
        }
    }

    fn inline_payload(&self, log: String) -> InlinePayload {
        InlinePayload {
            caller: self.caller.clone(),
            callee: self.callee.clone(),
            caller_imsi: self.caller_imsi.clone(),
            callee_imsi: self.callee_imsi.clone(),
            log,
            flags: self.flags.to_wire(),
        }
    }
}

/// JSON body of `POST /analyze` and `POST /export/{format}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinePayload {
    pub caller: String,
    pub callee: String,
    pub caller_imsi: String,
    pub callee_imsi: String,
    pub log: String,
    pub flags: Vec<String>,
}

/// Multipart body of `POST /analyze/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Only the optional party fields that are non-empty.
    pub fields: Vec<(&'static str, String)>,
    /// The flag list, JSON-encoded as one text field.
    pub flags_json: String,
}

/// One outbound analysis request, shaped by the form's input mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Inline(InlinePayload),
    Upload(UploadPayload),
}

impl AnalysisRequest {
    /// Build the request for the form's current mode. Reads the selected file
    /// in file mode; nothing is sent over the network here.
    pub fn from_form(form: &FormState) -> Result<Self, ValidationError> {
        form.validate()?;
        match (form.mode, &form.file) {
            (InputMode::File, Some(path)) => Ok(AnalysisRequest::Upload(upload_payload(form, path)?)),
            _ => Ok(AnalysisRequest::Inline(form.inline_payload(form.log.clone()))),
        }
    }

    /// The log text this request analyzes, for the raw log viewer.
    pub fn log_text(&self) -> String {
        match self {
            AnalysisRequest::Inline(payload) => payload.log.clone(),
            AnalysisRequest::Upload(payload) => String::from_utf8_lossy(&payload.bytes).into_owned(),
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            AnalysisRequest::Inline(_) => "/analyze",
            AnalysisRequest::Upload(_) => "/analyze/upload",
        }
    }
}

fn upload_payload(form: &FormState, path: &Path) -> Result<UploadPayload, ValidationError> {
    let bytes = std::fs::read(path).map_err(|source| ValidationError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.log".to_string());

    let fields = [
        ("caller", &form.caller),
        ("callee", &form.callee),
        ("caller_imsi", &form.caller_imsi),
        ("callee_imsi", &form.callee_imsi),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| (name, value.clone()))
    .collect();

    let flags_json = serde_json::to_string(&form.flags.to_wire()).unwrap_or_else(|_| "[]".to_string());

    Ok(UploadPayload {
        file_name,
        bytes,
        fields,
        flags_json,
    })
}

/// JSON body for the export endpoint. In file mode the file content stands in
/// for the log text, so the export describes the same input as the analysis.
pub fn export_payload(form: &FormState) -> Result<InlinePayload, ValidationError> {
    form.validate()?;
    let log = match (form.mode, &form.file) {
        (InputMode::File, Some(path)) => {
            let bytes = std::fs::read(path).map_err(|source| ValidationError::UnreadableFile {
                path: path.clone(),
                source,
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => form.log.clone(),
    };
    Ok(form.inline_payload(log))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_flag_toggle_semantics() {
        let mut flags = FlagSet::default();
        flags.toggle(AnalysisFlag::Pgw);
        flags.toggle(AnalysisFlag::Sdp);
        assert_eq!(flags.to_wire(), vec!["+pgw", "+sdp"]);
        flags.toggle(AnalysisFlag::Pgw);
        assert_eq!(flags.to_wire(), vec!["+sdp"]);
        flags.insert(AnalysisFlag::Sdp);
        assert_eq!(flags.to_wire(), vec!["+sdp"]);
    }

    #[test]
    fn test_flag_parse() {
        assert_eq!("+routing".parse::<AnalysisFlag>(), Ok(AnalysisFlag::Routing));
        assert_eq!("full".parse::<AnalysisFlag>(), Ok(AnalysisFlag::Full));
        assert!("+bogus".parse::<AnalysisFlag>().is_err());
    }

    #[test]
    fn test_paste_mode_requires_log() {
        let form = FormState {
            log: "   \n ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AnalysisRequest::from_form(&form),
            Err(ValidationError::EmptyLog)
        ));
    }

    #[test]
    fn test_file_mode_requires_file() {
        let form = FormState {
            mode: InputMode::File,
            log: "ignored".to_string(),
            ..Default::default()
        };
        assert!(matches!(form.validate(), Err(ValidationError::NoFile)));
    }

    #[test]
    fn test_inline_request_carries_all_fields() {
        let form = FormState {
            caller: "+41793873549".to_string(),
            log: "INVITE".to_string(),
            flags: [AnalysisFlag::Sdp].into_iter().collect(),
            ..Default::default()
        };
        let request = AnalysisRequest::from_form(&form).unwrap();
        assert_eq!(request.endpoint(), "/analyze");
        let AnalysisRequest::Inline(payload) = request else {
            panic!("expected inline request");
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["caller"], "+41793873549");
        assert_eq!(json["callee"], "");
        assert_eq!(json["flags"], serde_json::json!(["+sdp"]));
    }

    #[test]
    fn test_upload_request_skips_empty_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "BYE sip:x").unwrap();
        let form = FormState {
            callee_imsi: "228650000101898".to_string(),
            file: Some(file.path().to_path_buf()),
            mode: InputMode::File,
            flags: [AnalysisFlag::Pgw, AnalysisFlag::Full].into_iter().collect(),
            ..Default::default()
        };
        let request = AnalysisRequest::from_form(&form).unwrap();
        assert_eq!(request.endpoint(), "/analyze/upload");
        assert_eq!(request.log_text(), "BYE sip:x");
        let AnalysisRequest::Upload(payload) = request else {
            panic!("expected upload request");
        };
        assert_eq!(payload.fields, vec![("callee_imsi", "228650000101898".to_string())]);
        assert_eq!(payload.flags_json, r#"["+pgw","+full"]"#);
        assert_eq!(payload.bytes, b"BYE sip:x");
    }

    #[test]
    fn test_unreadable_file() {
        let form = FormState {
            file: Some(PathBuf::from("/nonexistent/sipview/log.txt")),
            mode: InputMode::File,
            ..Default::default()
        };
        assert!(matches!(
            AnalysisRequest::from_form(&form),
            Err(ValidationError::UnreadableFile { .. })
        ));
    }
}
