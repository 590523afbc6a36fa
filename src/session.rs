//! The interactive session: one explicit state record with pure transitions.
//!
//! ```text
//! idle --begin_submit--> submitting --succeed--> succeeded
//!                                   \--fail----> failed
//! ```
//! A new submission from `succeeded` or `failed` discards the previous
//! outcome before the request is dispatched. Only one submission may be in
//! flight at a time.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::client::Backend;
use crate::error::{ClientError, ValidationError};
use crate::models::AnalysisResult;
use crate::request::{AnalysisFlag, AnalysisRequest, FormState, InputMode};

/// Result views in display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    Timeline,
    Participants,
    Bye,
    Rtp,
    Anomalies,
    DataUsage,
    RawLog,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Timeline,
        Tab::Participants,
        Tab::Bye,
        Tab::Rtp,
        Tab::Anomalies,
        Tab::DataUsage,
        Tab::RawLog,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Timeline => "Timeline",
            Tab::Participants => "Participants",
            Tab::Bye => "BYE Analysis",
            Tab::Rtp => "RTP Stats",
            Tab::Anomalies => "Anomalies",
            Tab::DataUsage => "Data Usage",
            Tab::RawLog => "Raw Log",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(&self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    /// Item count shown next to the tab title. `None` for tabs that do not
    /// map to a sequence-valued section.
    pub fn badge(&self, result: &AnalysisResult) -> Option<usize> {
        match self {
            Tab::Timeline => Some(result.timeline.len()),
            Tab::Participants => Some(result.participants.len()),
            Tab::Rtp => Some(result.rtp_stats.len()),
            Tab::Anomalies => Some(result.anomalies.len()),
            Tab::DataUsage => Some(result.data_usage.len()),
            Tab::Bye | Tab::RawLog => None,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Tab {
    type Err = String;

    /// Accepts the title or a short name (`timeline`, `bye`, `rtp`, `usage`, `raw`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let tab = match key.as_str() {
            "timeline" => Tab::Timeline,
            "participants" => Tab::Participants,
            "bye" | "bye analysis" => Tab::Bye,
            "rtp" | "rtp stats" => Tab::Rtp,
            "anomalies" => Tab::Anomalies,
            "usage" | "data" | "data usage" => Tab::DataUsage,
            "raw" | "raw log" => Tab::RawLog,
            _ => return Err(format!("unknown tab '{}'", s)),
        };
        Ok(tab)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Identifies one submission. Completions carrying any other ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Form edits, applied through [`Session::update_form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEdit {
    Caller(String),
    Callee(String),
    CallerImsi(String),
    CalleeImsi(String),
    Log(String),
    File(Option<std::path::PathBuf>),
    Mode(InputMode),
    ToggleFlag(AnalysisFlag),
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    form: FormState,
    phase: Phase,
    result: Option<AnalysisResult>,
    error: Option<String>,
    tab: Tab,
    /// Log text of the most recent submission, for the raw log view.
    submitted_log: String,
    /// Bumped on every state change; renderers may use it to skip redraws.
    version: u64,
    in_flight: Option<Ticket>,
    next_ticket: u64,
}

impl Session {
    pub fn new(form: FormState) -> Self {
        Self {
            form,
            ..Default::default()
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn submitted_log(&self) -> &str {
        &self.submitted_log
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && self.form.validate().is_ok()
    }

    pub fn update_form(&mut self, edit: FormEdit) {
        let form = &mut self.form;
        match edit {
            FormEdit::Caller(v) => form.caller = v,
            FormEdit::Callee(v) => form.callee = v,
            FormEdit::CallerImsi(v) => form.caller_imsi = v,
            FormEdit::CalleeImsi(v) => form.callee_imsi = v,
            FormEdit::Log(v) => form.log = v,
            FormEdit::File(v) => form.file = v,
            FormEdit::Mode(m) => form.mode = m,
            FormEdit::ToggleFlag(flag) => form.flags.toggle(flag),
        }
        self.version += 1;
    }

    /// Direct mutable access for text-editing front ends.
    pub fn form_mut(&mut self) -> &mut FormState {
        self.version += 1;
        &mut self.form
    }

    /// Start a submission: validate, clear the previous outcome, and build the
    /// request to dispatch. Nothing changes when validation fails.
    pub fn begin_submit(&mut self) -> Result<(Ticket, AnalysisRequest), ValidationError> {
        if self.is_submitting() {
            return Err(ValidationError::InFlight);
        }
        let request = AnalysisRequest::from_form(&self.form)?;

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.in_flight = Some(ticket);
        self.error = None;
        self.result = None;
        self.submitted_log = request.log_text();
        self.phase = Phase::Submitting;
        self.version += 1;
        info!("Submission {} started via {}", ticket.0, request.endpoint());
        Ok((ticket, request))
    }

    /// Store a received result and reset the view to the first tab.
    /// Returns `false` for a stale ticket, which is ignored.
    pub fn succeed(&mut self, ticket: Ticket, result: AnalysisResult) -> bool {
        if !self.take_ticket(ticket) {
            return false;
        }
        self.result = Some(result);
        self.error = None;
        self.tab = Tab::Timeline;
        self.phase = Phase::Succeeded;
        self.version += 1;
        true
    }

    /// Record a failed submission. The result stays cleared.
    pub fn fail(&mut self, ticket: Ticket, err: &ClientError) -> bool {
        if !self.take_ticket(ticket) {
            return false;
        }
        warn!("Submission {} failed: {}", ticket.0, err);
        self.result = None;
        self.error = Some(err.display_message());
        self.phase = Phase::Failed;
        self.version += 1;
        true
    }

    /// Apply a completion from the backend.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<AnalysisResult, ClientError>) -> bool {
        match outcome {
            Ok(result) => self.succeed(ticket, result),
            Err(err) => self.fail(ticket, &err),
        }
    }

    fn take_ticket(&mut self, ticket: Ticket) -> bool {
        if self.in_flight != Some(ticket) {
            debug!("Ignoring completion for stale submission {}", ticket.0);
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Switch the active view. Selecting the current tab is a no-op.
    pub fn select_tab(&mut self, tab: Tab) -> bool {
        if self.tab == tab {
            return false;
        }
        self.tab = tab;
        self.version += 1;
        true
    }

    pub fn badge(&self, tab: Tab) -> Option<usize> {
        self.result.as_ref().and_then(|result| tab.badge(result))
    }

    /// Run a whole submission synchronously against `backend`.
    pub fn submit<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<Phase, ValidationError> {
        let (ticket, request) = self.begin_submit()?;
        let outcome = backend.analyze(&request);
        self.complete(ticket, outcome);
        Ok(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, TimelineEvent};

    fn pasted(log: &str) -> Session {
        Session::new(FormState {
            log: log.to_string(),
            ..Default::default()
        })
    }

    fn event() -> TimelineEvent {
        TimelineEvent {
            timestamp: "t".to_string(),
            direction: Direction::In,
            method: "INVITE".to_string(),
            description: String::new(),
            raw: None,
        }
    }

    #[test]
    fn test_empty_paste_never_submits() {
        let mut session = pasted("  ");
        assert!(!session.can_submit());
        assert!(matches!(session.begin_submit(), Err(ValidationError::EmptyLog)));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_second_submit_blocked_while_in_flight() {
        let mut session = pasted("INVITE");
        session.begin_submit().unwrap();
        assert!(!session.can_submit());
        assert!(matches!(session.begin_submit(), Err(ValidationError::InFlight)));
    }

    #[test]
    fn test_success_resets_tab() {
        let mut session = pasted("INVITE");
        session.select_tab(Tab::Anomalies);
        let (ticket, _) = session.begin_submit().unwrap();
        assert!(session.succeed(ticket, AnalysisResult::default()));
        assert_eq!(session.tab(), Tab::Timeline);
        assert_eq!(session.phase(), Phase::Succeeded);
    }

    #[test]
    fn test_begin_clears_previous_outcome() {
        let mut session = pasted("INVITE");
        let (ticket, _) = session.begin_submit().unwrap();
        session.succeed(ticket, AnalysisResult::default());
        assert!(session.result().is_some());

        session.begin_submit().unwrap();
        assert!(session.result().is_none());
        assert!(session.error().is_none());
        assert_eq!(session.phase(), Phase::Submitting);
    }

    #[test]
    fn test_failure_leaves_result_cleared() {
        let mut session = pasted("INVITE");
        let (ticket, _) = session.begin_submit().unwrap();
        session.succeed(ticket, AnalysisResult::default());

        let (ticket, _) = session.begin_submit().unwrap();
        let err = ClientError::Api {
            status: 500,
            detail: "boom".to_string(),
        };
        assert!(session.fail(ticket, &err));
        assert!(session.result().is_none());
        assert_eq!(session.error(), Some("boom"));
        assert_eq!(session.phase(), Phase::Failed);
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut session = pasted("INVITE");
        let (first, _) = session.begin_submit().unwrap();
        session.fail(first, &ClientError::Transport("x".to_string()));
        let (second, _) = session.begin_submit().unwrap();

        assert!(!session.succeed(first, AnalysisResult::default()));
        assert_eq!(session.phase(), Phase::Submitting);
        assert!(session.succeed(second, AnalysisResult::default()));
    }

    #[test]
    fn test_badges() {
        let mut session = pasted("INVITE");
        assert_eq!(session.badge(Tab::Timeline), None);

        let (ticket, _) = session.begin_submit().unwrap();
        let result = AnalysisResult {
            timeline: vec![event(); 5],
            ..Default::default()
        };
        session.succeed(ticket, result);
        assert_eq!(session.badge(Tab::Timeline), Some(5));
        assert_eq!(session.badge(Tab::Anomalies), Some(0));
        assert_eq!(session.badge(Tab::Bye), None);
        assert_eq!(session.badge(Tab::RawLog), None);
    }

    #[test]
    fn test_select_same_tab_is_noop() {
        let mut session = pasted("x");
        assert!(session.select_tab(Tab::Rtp));
        let version = session.version();
        assert!(!session.select_tab(Tab::Rtp));
        assert_eq!(session.version(), version);
    }

    #[test]
    fn test_tab_cycle_and_parse() {
        assert_eq!(Tab::Timeline.prev(), Tab::RawLog);
        assert_eq!(Tab::RawLog.next(), Tab::Timeline);
        assert_eq!("bye".parse::<Tab>(), Ok(Tab::Bye));
        assert_eq!("Data Usage".parse::<Tab>(), Ok(Tab::DataUsage));
        assert!("nope".parse::<Tab>().is_err());
    }

    #[test]
    fn test_update_form() {
        let mut session = Session::default();
        session.update_form(FormEdit::Log("BYE".to_string()));
        session.update_form(FormEdit::ToggleFlag(AnalysisFlag::Sdp));
        assert_eq!(session.form().log, "BYE");
        assert!(session.form().flags.contains(AnalysisFlag::Sdp));
        assert!(session.can_submit());
    }
}
