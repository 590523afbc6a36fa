pub mod app;
pub mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::client::Backend;
use crate::export::export_as;
use crate::request::{AnalysisFlag, FormState, InputMode};
use crate::session::Tab;

use app::{App, Completion, Field, View};

pub fn run(form: FormState, backend: Arc<dyn Backend>, export_dir: PathBuf) -> Result<()> {
    let mut app = App::new(form, export_dir);
    let (tx, rx) = mpsc::channel::<Completion>();

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let terminal_backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(terminal_backend)?;

    let result = run_loop(&mut terminal, &mut app, &backend, &tx, rx);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    backend: &Arc<dyn Backend>,
    tx: &mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Drain request completions
        while let Ok(completion) = rx.try_recv() {
            app.apply(completion);
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
                {
                    break;
                }
                match app.view {
                    View::Form => handle_form_key(app, key, backend, tx),
                    View::Results => handle_results_key(app, key),
                    View::Export => handle_export_key(app, key, backend, tx),
                    View::Notice => app.dismiss_notice(),
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn submit(app: &mut App, backend: &Arc<dyn Backend>, tx: &mpsc::Sender<Completion>) {
    let Some((ticket, request)) = app.begin_submit() else {
        return;
    };
    let backend = Arc::clone(backend);
    let tx = tx.clone();
    std::thread::spawn(move || {
        let outcome = backend.analyze(&request);
        let _ = tx.send(Completion::Analysis { ticket, outcome });
    });
}

fn dispatch_export(app: &mut App, backend: &Arc<dyn Backend>, tx: &mpsc::Sender<Completion>) {
    if app.export_busy {
        return;
    }
    app.export_busy = true;
    let backend = Arc::clone(backend);
    let tx = tx.clone();
    let format = app.export_format;
    let form = app.session.form().clone();
    let dir = app.export_dir.clone();
    std::thread::spawn(move || {
        let outcome = export_as(backend.as_ref(), format, &form, &dir);
        let _ = tx.send(Completion::Export { format, outcome });
    });
}

fn handle_form_key(
    app: &mut App,
    key: KeyEvent,
    backend: &Arc<dyn Backend>,
    tx: &mpsc::Sender<Completion>,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::F(5) => submit(app, backend, tx),
        KeyCode::Char('s') if ctrl => submit(app, backend, tx),
        KeyCode::F(2) => app.toggle_mode(),
        KeyCode::F(n @ 6..=9) => app.toggle_flag(AnalysisFlag::ALL[(n - 6) as usize]),
        KeyCode::Esc => {
            if app.session.result().is_some() || app.session.error().is_some() {
                app.view = View::Results;
            }
        }
        KeyCode::Tab | KeyCode::Down => app.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.prev_field(),
        KeyCode::Enter => {
            if app.field == Field::Input && app.session.form().mode == InputMode::Paste {
                app.push_char('\n');
            } else {
                app.next_field();
            }
        }
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) if !ctrl => app.push_char(c),
        _ => {}
    }
}

fn handle_results_key(app: &mut App, key: KeyEvent) {
    if app.search_editing {
        match key.code {
            KeyCode::Esc => app.clear_search(),
            KeyCode::Enter => app.search_editing = false,
            KeyCode::Backspace => app.search_pop(),
            KeyCode::Char(c) => app.search_push(c),
            _ => {}
        }
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('f') | KeyCode::Esc => app.view = View::Form,
        KeyCode::Char('e') => {
            if !app.session.is_submitting() {
                app.view = View::Export;
            }
        }
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => app.next_tab(),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => app.prev_tab(),
        KeyCode::Char(c @ '1'..='7') => {
            let index = c as usize - '1' as usize;
            app.select_tab(Tab::ALL[index]);
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(20),
        KeyCode::PageUp => app.scroll_up(20),
        _ => {}
    }
}

fn handle_export_key(
    app: &mut App,
    key: KeyEvent,
    backend: &Arc<dyn Backend>,
    tx: &mpsc::Sender<Completion>,
) {
    match key.code {
        KeyCode::Esc => app.view = View::Results,
        KeyCode::Tab => app.export_format = app.export_format.cycle(),
        KeyCode::Enter => dispatch_export(app, backend, tx),
        _ => {}
    }
}
