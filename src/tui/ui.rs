use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs, Wrap};
use ratatui::Frame;

use super::app::{App, Field, View};
use crate::classify::{classify_anomaly, classify_apn, classify_method, classify_role};
use crate::classify::{ApnTag, MethodClass, RoleTag, Severity};
use crate::format::{
    display_session_ts, display_timestamp, or_dash, status_label, total_output, usage_bytes, DASH,
};
use crate::models::{AnalysisResult, SessionStatus};
use crate::request::{AnalysisFlag, InputMode};
use crate::search::MatchedLine;
use crate::session::{Phase, Tab};

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const OK_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;

pub fn render(frame: &mut Frame, app: &App) {
    let banner_height = if app.session.error().is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Length(banner_height), // Error banner
            Constraint::Min(5),                // Body
            Constraint::Length(1),             // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    if let Some(error) = app.session.error() {
        render_error_banner(frame, error, chunks[1]);
    }
    match app.view {
        View::Form => render_form(frame, app, chunks[2]),
        View::Results | View::Export | View::Notice => render_results(frame, app, chunks[2]),
    }
    render_footer(frame, app, chunks[3]);

    // Overlays
    match app.view {
        View::Export => render_export_overlay(frame, app),
        View::Notice => render_notice_overlay(frame, app),
        View::Form | View::Results => {}
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "YATE / IMS Log Analysis",
        Style::default().fg(DIM),
    )];
    if let Some(result) = app.session.result() {
        for (label, value) in result.timing() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(format!("{}: ", label), Style::default().fg(DIM)));
            spans.push(Span::styled(
                value.to_string(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ));
        }
    }
    if app.session.phase() == Phase::Submitting {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("\u{27f3} Analyzing\u{2026}", Style::default().fg(PROGRESS_COLOR)));
    }

    let block = Block::default()
        .title(Span::styled(
            " SIP Call Analyzer ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_error_banner(frame: &mut Frame, error: &str, area: Rect) {
    let text = Line::from(vec![
        Span::styled("Error: ", Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD)),
        Span::styled(error.to_string(), Style::default().fg(ERROR_COLOR)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ERROR_COLOR));
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let form = app.session.form();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Party fields, flags, mode
            Constraint::Min(3),    // Log input
        ])
        .split(area);

    let field_line = |field: Field| {
        let focused = app.field == field;
        let marker = if focused { "\u{25b8} " } else { "  " };
        let value = app.field_value(field);
        Line::from(vec![
            Span::styled(marker, Style::default().fg(ACCENT)),
            Span::styled(format!("{:<14}", field.label(form.mode)), Style::default().fg(DIM)),
            Span::styled(
                if value.is_empty() { "\u{00b7}".to_string() } else { value.to_string() },
                if focused {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            ),
        ])
    };

    let mut flag_spans = vec![Span::styled("  Flags         ", Style::default().fg(DIM))];
    for (i, flag) in AnalysisFlag::ALL.iter().enumerate() {
        let on = form.flags.contains(*flag);
        flag_spans.push(Span::styled(
            format!("[F{}] {} {} ", i + 6, if on { "\u{25c9}" } else { "\u{25cb}" }, flag.label()),
            if on { Style::default().fg(ACCENT) } else { Style::default().fg(DIM) },
        ));
    }

    let mode = match form.mode {
        InputMode::Paste => "Paste Log",
        InputMode::File => "Upload File",
    };
    let submit_style = if app.session.can_submit() {
        Style::default().fg(OK_COLOR).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM)
    };
    let submit_label = if app.session.is_submitting() {
        "\u{27f3} Analyzing\u{2026}"
    } else {
        "[F5] Analyze Call"
    };

    let lines = vec![
        field_line(Field::Caller),
        field_line(Field::Callee),
        field_line(Field::CallerImsi),
        field_line(Field::CalleeImsi),
        Line::from(flag_spans),
        Line::from(vec![
            Span::styled("  Input         ", Style::default().fg(DIM)),
            Span::styled(format!("[F2] {}", mode), Style::default().fg(Color::White)),
            Span::raw("    "),
            Span::styled(submit_label, submit_style),
        ]),
    ];
    let block = Block::default()
        .title(" Call Parameters ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let input_focused = app.field == Field::Input;
    let (title, body) = match form.mode {
        InputMode::Paste => (" Log ", form.log.as_str()),
        InputMode::File => (" Log File Path ", app.file_input.as_str()),
    };
    let inner_height = chunks[1].height.saturating_sub(2) as usize;
    let total = body.lines().count();
    let skip = total.saturating_sub(inner_height) as u16;
    let placeholder = match form.mode {
        InputMode::Paste => "Paste your YATE SIP log here...",
        InputMode::File => "Path to a .log / .txt / .sip file",
    };
    let text = if body.is_empty() {
        Paragraph::new(Span::styled(placeholder, Style::default().fg(DIM)))
    } else {
        Paragraph::new(body).scroll((skip, 0))
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if input_focused { ACCENT } else { DIM }));
    frame.render_widget(text.block(block), chunks[1]);
}

fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|tab| match app.session.badge(*tab) {
            Some(count) => Line::from(vec![
                Span::raw(tab.title()),
                Span::styled(format!(" {}", count), Style::default().fg(DIM)),
            ]),
            None => Line::from(tab.title()),
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.session.tab().index())
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT)),
        );
    frame.render_widget(tabs, chunks[0]);

    let Some(result) = app.session.result() else {
        let message = match app.session.phase() {
            Phase::Submitting => "Analyzing\u{2026}",
            Phase::Failed => "Analysis failed. Press [f] to edit the form and resubmit.",
            Phase::Idle | Phase::Succeeded => "No analysis yet.",
        };
        frame.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(DIM))
                .block(content_block(None)),
            chunks[1],
        );
        return;
    };

    match app.session.tab() {
        Tab::Timeline => render_timeline(frame, app, result, chunks[1]),
        Tab::Participants => render_participants(frame, app, result, chunks[1]),
        Tab::Bye => render_bye(frame, app, result, chunks[1]),
        Tab::Rtp => render_rtp(frame, app, result, chunks[1]),
        Tab::Anomalies => render_anomalies(frame, app, result, chunks[1]),
        Tab::DataUsage => render_data_usage(frame, app, result, chunks[1]),
        Tab::RawLog => render_raw_log(frame, app, chunks[1]),
    }
}

fn content_block(title: Option<String>) -> Block<'static> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    match title {
        Some(title) => block.title(Span::styled(title, Style::default().fg(DIM))),
        None => block,
    }
}

fn empty_message(frame: &mut Frame, message: &str, area: Rect) {
    frame.render_widget(
        Paragraph::new(Span::styled(message.to_string(), Style::default().fg(DIM)))
            .block(content_block(None)),
        area,
    );
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(
        titles
            .iter()
            .map(|t| Cell::from(*t).style(Style::default().fg(DIM)))
            .collect::<Vec<_>>(),
    )
    .height(1)
}

/// Split off a bottom panel when there is supplementary content.
fn split_bottom(area: Rect, lines: usize) -> (Rect, Option<Rect>) {
    if lines == 0 {
        return (area, None);
    }
    let height = (lines as u16 + 2).min(area.height / 2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(height)])
        .split(area);
    (chunks[0], Some(chunks[1]))
}

fn render_list_panel(frame: &mut Frame, title: &str, items: &[String], area: Rect) {
    let lines: Vec<Line> = items.iter().map(|s| Line::from(s.as_str())).collect();
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn method_color(class: MethodClass) -> Color {
    match class {
        MethodClass::Ok => Color::Green,
        MethodClass::Ringing => Color::Yellow,
        MethodClass::Progress => Color::LightYellow,
        MethodClass::Trying => Color::Gray,
        MethodClass::ServerError => Color::Red,
        MethodClass::Invite => Color::Cyan,
        MethodClass::Bye => Color::LightRed,
        MethodClass::Cancel => Color::Magenta,
        MethodClass::Register => Color::Blue,
        MethodClass::Prack => Color::LightBlue,
        MethodClass::Notify => Color::LightMagenta,
        MethodClass::Codec => Color::LightCyan,
        MethodClass::Internal => Color::DarkGray,
    }
}

fn render_timeline(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    if result.timeline.is_empty() {
        return empty_message(frame, "No timeline events found.", area);
    }
    let routing = result.routing_info.as_deref().unwrap_or_default();
    let (main, bottom) = split_bottom(area, routing.len());

    let rows: Vec<Row> = result
        .timeline
        .iter()
        .enumerate()
        .skip(app.scroll)
        .map(|(i, ev)| {
            let class = classify_method(&ev.method);
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(DIM)),
                Cell::from(display_timestamp(&ev.timestamp)),
                Cell::from(ev.direction.as_str()),
                Cell::from(ev.method.as_str()).style(
                    Style::default()
                        .fg(method_color(class))
                        .add_modifier(Modifier::BOLD),
                ),
                Cell::from(ev.description.as_str()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(24),
        Constraint::Length(9),
        Constraint::Length(24),
        Constraint::Min(20),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(&["#", "Timestamp", "Dir", "Method", "Description"]))
        .block(content_block(scroll_title(app.scroll, result.timeline.len())));
    frame.render_widget(table, main);

    if let Some(bottom) = bottom {
        render_list_panel(frame, "Routing Path", routing, bottom);
    }
}

fn scroll_title(offset: usize, total: usize) -> Option<String> {
    (offset > 0).then(|| format!(" [{}-{}] \u{2191} ", offset + 1, total))
}

fn role_color(tag: RoleTag) -> Color {
    match tag {
        RoleTag::Caller => Color::Blue,
        RoleTag::Callee => Color::Green,
        RoleTag::Other => Color::Gray,
    }
}

fn render_participants(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    if result.participants.is_empty() {
        return empty_message(frame, "No participants detected.", area);
    }
    let rows: Vec<Row> = result
        .participants
        .iter()
        .skip(app.scroll)
        .map(|p| {
            let role = p.role.as_deref();
            Row::new(vec![
                Cell::from(or_dash(role).to_string())
                    .style(Style::default().fg(role_color(classify_role(role)))),
                Cell::from(or_dash(p.number.as_deref()).to_string())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(or_dash(p.imsi.as_deref()).to_string()),
                Cell::from(or_dash(p.device.as_deref()).to_string()),
                Cell::from(or_dash(p.ip.as_deref()).to_string()).style(Style::default().fg(DIM)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(17),
        Constraint::Min(20),
        Constraint::Length(16),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(&["Role", "Number", "IMSI", "Device", "IP"]))
        .block(content_block(scroll_title(app.scroll, result.participants.len())));
    frame.render_widget(table, area);
}

fn render_bye(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    let Some(ref bye) = result.bye_info else {
        return empty_message(frame, "No BYE detected in this log.", area);
    };
    let label = |text: &'static str| Span::styled(text, Style::default().fg(DIM));

    let mut lines = vec![
        Line::from(vec![
            label("BYE Sender     "),
            Span::styled(
                bye.sender.clone(),
                Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::raw(or_dash(bye.sender_number.as_deref()).to_string()),
        ]),
        Line::from(vec![
            label("Reason Header  "),
            Span::styled(
                bye.reason.as_deref().unwrap_or("None (user hang-up)").to_string(),
                Style::default().fg(PROGRESS_COLOR),
            ),
        ]),
        Line::from(label("Evidence")),
    ];
    for evidence in &bye.evidence {
        lines.push(Line::from(format!("  \u{2022} {}", evidence)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(label("Raw BYE Snippet")));
    for snippet_line in bye.raw_snippet.lines() {
        lines.push(Line::from(Span::styled(
            snippet_line.to_string(),
            Style::default().fg(OK_COLOR),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((paragraph_offset(app.scroll), 0))
            .block(content_block(None)),
        area,
    );
}

fn render_rtp(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    let sdp_lines: Vec<String> = result
        .sdp_info
        .as_ref()
        .map(|sdp| {
            [("Offered", &sdp.offered), ("Answered", &sdp.answered)]
                .into_iter()
                .flat_map(|(label, entries)| {
                    std::iter::once(format!("{}:", label)).chain(
                        entries
                            .iter()
                            .map(|e| format!("  {}: {}", e.ua, e.codecs.join(", "))),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    let (main, bottom) = split_bottom(area, sdp_lines.len());

    if result.rtp_stats.is_empty() {
        empty_message(frame, "No RTP stats found.", main);
    } else {
        let rows: Vec<Row> = result
            .rtp_stats
            .iter()
            .skip(app.scroll)
            .map(|r| {
                let loss_color = if r.has_loss() { ERROR_COLOR } else { OK_COLOR };
                Row::new(vec![
                    Cell::from(r.leg.as_str()),
                    Cell::from(or_dash(r.ps.as_deref()).to_string()),
                    Cell::from(or_dash(r.os.as_deref()).to_string()),
                    Cell::from(or_dash(r.pr.as_deref()).to_string()),
                    Cell::from(or_dash(r.or_.as_deref()).to_string()),
                    Cell::from(or_dash(r.pl.as_deref()).to_string()).style(
                        Style::default().fg(loss_color).add_modifier(Modifier::BOLD),
                    ),
                    Cell::from(or_dash(r.pd.as_deref()).to_string()),
                    Cell::from(
                        r.ji.as_deref()
                            .map(|ji| format!("{} ms", ji))
                            .unwrap_or_else(|| DASH.to_string()),
                    ),
                    Cell::from(or_dash(r.codec.as_deref()).to_string())
                        .style(Style::default().fg(Color::LightBlue)),
                ])
            })
            .collect();
        let widths = [
            Constraint::Min(14),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(12),
        ];
        let table = Table::new(rows, widths)
            .header(header_row(&[
                "Leg", "Sent Pkts", "Sent Bytes", "Recv Pkts", "Recv Bytes", "Lost", "Discarded", "Jitter",
                "Codec",
            ]))
            .block(content_block(scroll_title(app.scroll, result.rtp_stats.len())));
        frame.render_widget(table, main);
    }

    if let Some(bottom) = bottom {
        render_list_panel(frame, "SDP Negotiation", &sdp_lines, bottom);
    }
}

fn severity_style(severity: Severity) -> (&'static str, Color) {
    match severity {
        Severity::High => ("\u{25cf}", Color::Red),
        Severity::Medium => ("\u{25cf}", Color::Yellow),
        Severity::Low => ("\u{25cf}", Color::Blue),
    }
}

fn render_anomalies(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    if result.anomalies.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "\u{2713} No anomalies detected.",
                Style::default().fg(OK_COLOR),
            ))
            .block(content_block(None)),
            area,
        );
        return;
    }
    let items: Vec<ListItem> = result
        .anomalies
        .iter()
        .skip(app.scroll)
        .map(|anomaly| {
            let severity = classify_anomaly(anomaly);
            let (icon, color) = severity_style(severity);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(format!("{:<7}", severity.as_str()), Style::default().fg(color)),
                Span::raw(anomaly.as_str()),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(items).block(content_block(scroll_title(app.scroll, result.anomalies.len()))),
        area,
    );
}

fn apn_color(tag: ApnTag) -> Color {
    match tag {
        ApnTag::Chili => Color::LightRed,
        ApnTag::Ims => Color::Blue,
        ApnTag::Internet => Color::Green,
        ApnTag::Other => Color::Gray,
    }
}

fn bytes_cell(bytes: u64, upstream: Option<&str>, color: Color) -> Cell<'static> {
    let style = if bytes > 0 {
        Style::default().fg(color)
    } else {
        Style::default().fg(DIM)
    };
    Cell::from(usage_bytes(bytes, upstream)).style(style)
}

fn render_data_usage(frame: &mut Frame, app: &App, result: &AnalysisResult, area: Rect) {
    let pgw = result.pgw_events.as_deref().unwrap_or_default();
    let (main, bottom) = split_bottom(area, pgw.len());

    let data = &result.data_usage;
    if data.is_empty() {
        empty_message(frame, "No Diameter charging data found.", main);
    } else {
        let has_voice = data.iter().any(|d| d.voice_sec_fmt.is_some());
        let rows: Vec<Row> = data
            .iter()
            .skip(app.scroll)
            .map(|d| {
                let apn = d.apn.as_deref();
                let mut cells = vec![
                    Cell::from(or_dash(d.imsi.as_deref()).to_string()).style(Style::default().fg(DIM)),
                    Cell::from(or_dash(d.msisdn.as_deref()).to_string())
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                    Cell::from(or_dash(apn).to_string())
                        .style(Style::default().fg(apn_color(classify_apn(apn)))),
                    Cell::from(or_dash(d.service.as_deref()).to_string()),
                    Cell::from(or_dash(d.ip.as_deref()).to_string()).style(Style::default().fg(DIM)),
                    Cell::from(display_session_ts(d.start_ts.as_deref())),
                    Cell::from(display_session_ts(d.end_ts.as_deref())),
                    bytes_cell(d.in_bytes, d.in_bytes_fmt.as_deref(), Color::LightBlue),
                    bytes_cell(d.out_bytes, d.out_bytes_fmt.as_deref(), Color::Green),
                    bytes_cell(d.total_bytes, d.total_bytes_fmt.as_deref(), Color::Magenta),
                ];
                if has_voice {
                    cells.push(
                        Cell::from(or_dash(d.voice_sec_fmt.as_deref()).to_string())
                            .style(Style::default().fg(Color::Yellow)),
                    );
                }
                cells.push(Cell::from(d.req_count.to_string()).style(Style::default().fg(DIM)));
                let status_color = match d.status {
                    SessionStatus::Terminated => DIM,
                    SessionStatus::Active => OK_COLOR,
                };
                cells.push(Cell::from(status_label(d.status)).style(Style::default().fg(status_color)));
                Row::new(cells)
            })
            .collect();

        let mut headers = vec![
            "IMSI", "MSISDN", "APN", "Service", "IP", "Session Start", "Session End", "Input", "Output",
            "Total",
        ];
        let mut widths = vec![
            Constraint::Length(16),
            Constraint::Length(13),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(15),
            Constraint::Length(19),
            Constraint::Length(19),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
        ];
        if has_voice {
            headers.push("Voice Time");
            widths.push(Constraint::Length(10));
        }
        headers.extend(["Requests", "Status"]);
        widths.extend([Constraint::Length(8), Constraint::Length(10)]);

        let terminated = data
            .iter()
            .filter(|d| d.status == SessionStatus::Terminated)
            .count();
        let summary = format!(
            " Total sessions: {}  Terminated: {}  Total output: {} ",
            data.len(),
            terminated,
            total_output(data)
        );
        let block = content_block(scroll_title(app.scroll, data.len()))
            .title_bottom(Line::from(Span::styled(summary, Style::default().fg(OK_COLOR))));
        let table = Table::new(rows, widths).header(header_row(&headers)).block(block);
        frame.render_widget(table, main);
    }

    if let Some(bottom) = bottom {
        render_list_panel(frame, "PGW Events", pgw, bottom);
    }
}

fn highlighted_line<'a>(matched: &MatchedLine<'a>) -> Line<'a> {
    let highlight = Style::default().fg(Color::Black).bg(Color::Yellow);
    let mut spans = Vec::with_capacity(matched.ranges.len() * 2 + 1);
    let mut cursor = 0;
    for range in &matched.ranges {
        let start = range.start.max(cursor);
        if start >= range.end {
            continue;
        }
        if start > cursor {
            spans.push(Span::raw(&matched.text[cursor..start]));
        }
        spans.push(Span::styled(&matched.text[start..range.end], highlight));
        cursor = range.end;
    }
    if cursor < matched.text.len() {
        spans.push(Span::raw(&matched.text[cursor..]));
    }
    Line::from(spans)
}

/// Vertical offset for a `Paragraph`, saturating instead of wrapping.
fn paragraph_offset(scroll: usize) -> u16 {
    u16::try_from(scroll).unwrap_or(u16::MAX)
}

fn render_raw_log(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let matches = app.log_index.search(&app.search);
    let mut search_spans = vec![
        Span::styled("Filter: ", Style::default().fg(DIM)),
        Span::styled(
            app.search.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];
    if app.search_editing {
        search_spans.push(Span::styled("\u{2588}", Style::default().fg(ACCENT)));
    }
    if !app.search.is_empty() {
        search_spans.push(Span::styled(
            format!("   {} / {} lines", matches.len(), app.log_index.line_count()),
            Style::default().fg(DIM),
        ));
    }
    let search_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.search_editing { ACCENT } else { DIM }));
    frame.render_widget(Paragraph::new(Line::from(search_spans)).block(search_block), chunks[0]);

    if app.log_index.line_count() == 0 {
        return empty_message(frame, "No log text for this analysis.", chunks[1]);
    }
    let lines: Vec<Line> = matches.iter().skip(app.scroll).map(highlighted_line).collect();
    frame.render_widget(
        Paragraph::new(lines).block(content_block(scroll_title(app.scroll, matches.len()))),
        chunks[1],
    );
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.view {
        View::Form => "[Tab] next field  [F2] paste/file  [F6-F9] flags  [F5] analyze  [Esc] results  [Ctrl-C] quit",
        View::Results if app.search_editing => "[Enter] keep filter  [Esc] clear filter",
        View::Results => "[\u{2190}\u{2192}/1-7] tab  [j/k] scroll  [/] search log  [e]xport  [f]orm  [q]uit",
        View::Export => "[Esc] close",
        View::Notice => "[any key] dismiss",
    };
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn render_export_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(56, 11, frame.area());
    frame.render_widget(Clear, area);

    let output_path = app.export_dir.join(app.export_format.artifact_name());
    let mut text = vec![
        Line::from(Span::styled(
            "Export Report",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Format: ", Style::default().fg(DIM)),
            Span::styled(
                app.export_format.extension().to_uppercase(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Output: ", Style::default().fg(DIM)),
            Span::styled(output_path.display().to_string(), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] cycle format  [Enter] export  [Esc] cancel",
            Style::default().fg(DIM),
        )),
    ];
    if app.export_busy {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "\u{27f3} Exporting\u{2026}",
            Style::default().fg(PROGRESS_COLOR),
        )));
    }

    let block = Block::default()
        .title(" Export ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
}

fn render_notice_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);

    let message = app.notice.as_deref().unwrap_or_default();
    let color = if message.starts_with("Export failed") || message.starts_with("cannot read") {
        ERROR_COLOR
    } else {
        OK_COLOR
    };
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(color))),
        Line::from(""),
        Line::from(Span::styled("[any key] dismiss", Style::default().fg(DIM))),
    ];
    let block = Block::default()
        .title(" Notice ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
