use std::path::PathBuf;

use crate::error::{ClientError, ExportError, ValidationError};
use crate::export::ExportFormat;
use crate::models::AnalysisResult;
use crate::request::{AnalysisFlag, AnalysisRequest, FormState, InputMode};
use crate::search::LogIndex;
use crate::session::{FormEdit, Session, Tab, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Form,
    Results,
    Export,
    /// Blocking notification, dismissed by any key.
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Caller,
    Callee,
    CallerImsi,
    CalleeImsi,
    /// Log text in paste mode, file path in file mode.
    Input,
}

impl Field {
    const ORDER: [Field; 5] = [
        Field::Caller,
        Field::Callee,
        Field::CallerImsi,
        Field::CalleeImsi,
        Field::Input,
    ];

    pub fn label(&self, mode: InputMode) -> &'static str {
        match (self, mode) {
            (Field::Caller, _) => "Caller Number",
            (Field::Callee, _) => "Callee Number",
            (Field::CallerImsi, _) => "Caller IMSI",
            (Field::CalleeImsi, _) => "Callee IMSI",
            (Field::Input, InputMode::Paste) => "Log",
            (Field::Input, InputMode::File) => "Log File",
        }
    }

    fn step(&self, delta: isize) -> Field {
        let len = Self::ORDER.len() as isize;
        let pos = Self::ORDER.iter().position(|f| f == self).unwrap_or(0) as isize;
        Self::ORDER[(pos + delta).rem_euclid(len) as usize]
    }
}

/// Sent from request worker threads back to the event loop.
pub enum Completion {
    Analysis {
        ticket: Ticket,
        outcome: Result<AnalysisResult, ClientError>,
    },
    Export {
        format: ExportFormat,
        outcome: Result<PathBuf, ExportError>,
    },
}

pub struct App {
    pub session: Session,
    pub view: View,
    pub field: Field,
    /// Path text typed in file mode; mirrored into the form as a path.
    pub file_input: String,
    pub search: String,
    pub search_editing: bool,
    pub log_index: LogIndex,
    pub scroll: usize,
    pub export_format: ExportFormat,
    pub export_dir: PathBuf,
    pub export_busy: bool,
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(form: FormState, export_dir: PathBuf) -> Self {
        let file_input = form
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Self {
            session: Session::new(form),
            view: View::Form,
            field: Field::Caller,
            file_input,
            search: String::new(),
            search_editing: false,
            log_index: LogIndex::default(),
            scroll: 0,
            export_format: ExportFormat::Csv,
            export_dir,
            export_busy: false,
            notice: None,
            should_quit: false,
        }
    }

    pub fn next_field(&mut self) {
        self.field = self.field.step(1);
    }

    pub fn prev_field(&mut self) {
        self.field = self.field.step(-1);
    }

    /// The text currently shown in the focused form field.
    pub fn field_value(&self, field: Field) -> &str {
        let form = self.session.form();
        match field {
            Field::Caller => &form.caller,
            Field::Callee => &form.callee,
            Field::CallerImsi => &form.caller_imsi,
            Field::CalleeImsi => &form.callee_imsi,
            Field::Input => match form.mode {
                InputMode::Paste => &form.log,
                InputMode::File => &self.file_input,
            },
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.edit_field(|value| value.push(c));
    }

    pub fn pop_char(&mut self) {
        self.edit_field(|value| {
            value.pop();
        });
    }

    fn edit_field(&mut self, edit: impl FnOnce(&mut String)) {
        if self.field == Field::Input && self.session.form().mode == InputMode::File {
            edit(&mut self.file_input);
            let path = (!self.file_input.trim().is_empty())
                .then(|| PathBuf::from(self.file_input.trim()));
            self.session.update_form(FormEdit::File(path));
            return;
        }
        let form = self.session.form_mut();
        let value = match self.field {
            Field::Caller => &mut form.caller,
            Field::Callee => &mut form.callee,
            Field::CallerImsi => &mut form.caller_imsi,
            Field::CalleeImsi => &mut form.callee_imsi,
            Field::Input => &mut form.log,
        };
        edit(value);
    }

    pub fn toggle_mode(&mut self) {
        let mode = match self.session.form().mode {
            InputMode::Paste => InputMode::File,
            InputMode::File => InputMode::Paste,
        };
        self.session.update_form(FormEdit::Mode(mode));
    }

    pub fn toggle_flag(&mut self, flag: AnalysisFlag) {
        self.session.update_form(FormEdit::ToggleFlag(flag));
    }

    /// Start a submission if the form allows it. Validation failures other
    /// than "nothing to submit" surface as a notice.
    pub fn begin_submit(&mut self) -> Option<(Ticket, AnalysisRequest)> {
        match self.session.begin_submit() {
            Ok(started) => {
                self.log_index = LogIndex::new(self.session.submitted_log());
                self.search.clear();
                self.search_editing = false;
                self.scroll = 0;
                self.view = View::Results;
                Some(started)
            }
            Err(err @ ValidationError::UnreadableFile { .. }) => {
                self.show_notice(err.to_string());
                None
            }
            Err(_) => None,
        }
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Analysis { ticket, outcome } => {
                if self.session.complete(ticket, outcome) {
                    self.scroll = 0;
                }
            }
            Completion::Export { format, outcome } => {
                self.export_busy = false;
                match outcome {
                    Ok(path) => {
                        self.show_notice(format!("Saved {} export to {}", format, path.display()))
                    }
                    Err(err) => self.show_notice(format!("Export failed: {}", err)),
                }
            }
        }
    }

    pub fn show_notice(&mut self, message: String) {
        self.notice = Some(message);
        self.view = View::Notice;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        self.view = if self.session.result().is_some() || self.session.error().is_some() {
            View::Results
        } else {
            View::Form
        };
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if self.session.select_tab(tab) {
            self.scroll = 0;
            self.search_editing = false;
        }
    }

    pub fn next_tab(&mut self) {
        self.select_tab(self.session.tab().next());
    }

    pub fn prev_tab(&mut self) {
        self.select_tab(self.session.tab().prev());
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll = (self.scroll + rows).min(self.content_len().saturating_sub(1));
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll = self.scroll.saturating_sub(rows);
    }

    /// Number of scrollable rows in the active tab.
    pub fn content_len(&self) -> usize {
        let Some(result) = self.session.result() else {
            return 0;
        };
        match self.session.tab() {
            Tab::Timeline => result.timeline.len(),
            Tab::Participants => result.participants.len(),
            Tab::Rtp => result.rtp_stats.len(),
            Tab::Anomalies => result.anomalies.len(),
            Tab::DataUsage => result.data_usage.len(),
            Tab::RawLog => self.log_index.search(&self.search).len(),
            Tab::Bye => result
                .bye_info
                .as_ref()
                .map(|b| b.evidence.len() + b.raw_snippet.lines().count() + 6)
                .unwrap_or(1),
        }
    }

    pub fn start_search(&mut self) {
        self.select_tab(Tab::RawLog);
        self.search_editing = true;
    }

    pub fn search_push(&mut self, c: char) {
        self.search.push(c);
        self.scroll = 0;
    }

    pub fn search_pop(&mut self) {
        self.search.pop();
        self.scroll = 0;
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.search_editing = false;
        self.scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(FormState::default(), PathBuf::from("."))
    }

    #[test]
    fn test_typing_edits_focused_field() {
        let mut app = app();
        app.push_char('+');
        app.push_char('4');
        app.next_field();
        app.push_char('9');
        app.pop_char();
        assert_eq!(app.session.form().caller, "+4");
        assert_eq!(app.session.form().callee, "");
    }

    #[test]
    fn test_file_mode_input_sets_path() {
        let mut app = app();
        app.toggle_mode();
        app.field = Field::Input;
        for c in "call.log".chars() {
            app.push_char(c);
        }
        assert_eq!(app.session.form().file, Some(PathBuf::from("call.log")));
        for _ in 0..8 {
            app.pop_char();
        }
        assert_eq!(app.session.form().file, None);
    }

    #[test]
    fn test_empty_form_does_not_submit() {
        let mut app = app();
        assert!(app.begin_submit().is_none());
        assert_eq!(app.view, View::Form);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_submit_indexes_log_and_switches_view() {
        let mut app = app();
        app.field = Field::Input;
        for c in "INVITE\nBYE".chars() {
            app.push_char(c);
        }
        let (ticket, _) = app.begin_submit().unwrap();
        assert_eq!(app.view, View::Results);
        assert_eq!(app.log_index.line_count(), 2);

        app.apply(Completion::Analysis {
            ticket,
            outcome: Ok(AnalysisResult::default()),
        });
        assert!(app.session.result().is_some());
    }

    #[test]
    fn test_export_failure_is_a_notice_not_session_error() {
        let mut app = app();
        app.export_busy = true;
        app.apply(Completion::Export {
            format: ExportFormat::Pdf,
            outcome: Err(ExportError::Request(ClientError::Transport("refused".to_string()))),
        });
        assert!(!app.export_busy);
        assert_eq!(app.view, View::Notice);
        assert!(app.notice.as_deref().unwrap_or_default().contains("refused"));
        assert!(app.session.error().is_none());
    }
}
