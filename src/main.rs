use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::debug;

use sipview::client::HttpBackend;
use sipview::config::Config;
use sipview::export::{export_as, ExportFormat};
use sipview::format;
use sipview::request::{AnalysisFlag, FormState, InputMode};
use sipview::search::LogIndex;
use sipview::session::{Phase, Session, Tab};

#[derive(Parser)]
#[command(name = "sipview", about = "Interpret and present SIP/IMS call-log analyses")]
struct Cli {
    /// TOML config file (base-url, timeout-secs)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parser service base URL (overrides config and SIPVIEW_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one call log and print the result
    Analyze {
        #[command(flatten)]
        form: FormArgs,

        /// Output the raw analysis result as JSON
        #[arg(long)]
        json: bool,

        /// Print a single section (timeline, participants, bye, rtp, anomalies, usage, raw)
        #[arg(long)]
        tab: Option<Tab>,
    },
    /// Export the analysis of a call log as CSV or PDF
    Export {
        #[command(flatten)]
        form: FormArgs,

        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Directory to write sip_analysis.<format> into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Filter a local log file, bracketing matched text
    Search {
        file: PathBuf,
        query: String,
    },
    /// Launch the interactive terminal UI
    Tui {
        #[command(flatten)]
        form: FormArgs,

        /// Directory exports are written into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct FormArgs {
    /// "-" to read the log text from STDIN
    #[arg(conflicts_with_all = ["log_file", "upload"])]
    stdin: Option<String>,

    /// Read the log text from a local file and send it inline
    #[arg(long, conflicts_with = "upload")]
    log_file: Option<PathBuf>,

    /// Upload a log file as multipart form data
    #[arg(long)]
    upload: Option<PathBuf>,

    #[arg(long, default_value = "")]
    caller: String,

    #[arg(long, default_value = "")]
    callee: String,

    #[arg(long, default_value = "")]
    caller_imsi: String,

    #[arg(long, default_value = "")]
    callee_imsi: String,

    /// Analysis flag (+sdp, +pgw, +routing, +full); repeatable
    #[arg(long = "flag", allow_hyphen_values = true)]
    flags: Vec<AnalysisFlag>,
}

impl FormArgs {
    fn into_form(self) -> Result<FormState> {
        let log = match (self.stdin.as_deref(), &self.log_file) {
            (Some("-"), _) => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read log text from STDIN")?;
                buf
            }
            (Some(other), _) => anyhow::bail!("Unexpected argument '{}' (use \"-\" for STDIN)", other),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read log file: {}", path.display()))?,
            (None, None) => String::new(),
        };
        let mode = if self.upload.is_some() {
            InputMode::File
        } else {
            InputMode::Paste
        };
        Ok(FormState {
            caller: self.caller,
            callee: self.callee,
            caller_imsi: self.caller_imsi,
            callee_imsi: self.callee_imsi,
            log,
            file: self.upload,
            flags: self.flags.into_iter().collect(),
            mode,
        })
    }
}

fn backend(cli_config: Option<&Path>, api_url: Option<&str>) -> Result<HttpBackend> {
    let config = Config::resolve(cli_config, api_url)?;
    debug!("Using parser service at {}", config.base());
    Ok(HttpBackend::new(config)?)
}

fn run_analyze(backend: &HttpBackend, form: FormState, json: bool, tab: Option<Tab>) -> Result<()> {
    let mut session = Session::new(form);
    let phase = session.submit(backend)?;
    if phase == Phase::Failed {
        anyhow::bail!("{}", session.error().unwrap_or("analysis failed"));
    }
    let Some(result) = session.result() else {
        anyhow::bail!("analysis finished without a result");
    };

    if json {
        println!("{}", format::format_json(result)?);
    } else if let Some(tab) = tab {
        print!("{}", format::format_section(result, tab, session.submitted_log()));
    } else {
        print!("{}", format::format_report(result));
    }
    Ok(())
}

/// Wrap every matched span of `line` in brackets.
fn bracket_matches(line: &str, ranges: &[std::ops::Range<usize>]) -> String {
    let mut out = String::with_capacity(line.len() + ranges.len() * 2);
    let mut cursor = 0;
    for range in ranges {
        let start = range.start.max(cursor);
        if start >= range.end {
            continue;
        }
        out.push_str(&line[cursor..start]);
        out.push('[');
        out.push_str(&line[start..range.end]);
        out.push(']');
        cursor = range.end;
    }
    out.push_str(&line[cursor..]);
    out
}

fn run_search(file: &Path, query: &str) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read log file: {}", file.display()))?;
    let index = LogIndex::new(text);
    let matches = index.search(query);
    for matched in &matches {
        println!("{:>6}: {}", matched.number, bracket_matches(matched.text, &matched.ranges));
    }
    eprintln!("{} / {} lines", matches.len(), index.line_count());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let api_url = cli.api_url.as_deref();

    match cli.command {
        Command::Analyze { form, json, tab } => {
            let form = form.into_form()?;
            // Reject an ineligible form before touching the network.
            form.validate()?;
            run_analyze(&backend(config_path, api_url)?, form, json, tab)
        }
        Command::Export { form, format, out } => {
            let form = form.into_form()?;
            form.validate()?;
            let backend = backend(config_path, api_url)?;
            let path = export_as(&backend, format, &form, &out)?;
            eprintln!("Saved {}", path.display());
            Ok(())
        }
        Command::Search { file, query } => run_search(&file, &query),
        Command::Tui { form, out } => {
            let form = form.into_form()?;
            let backend = Arc::new(backend(config_path, api_url)?);
            sipview::tui::run(form, backend, out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_matches() {
        assert_eq!(bracket_matches("INVITE sip:bob", &[0..6]), "[INVITE] sip:bob");
        assert_eq!(bracket_matches("a-b-a", &[0..1, 4..5]), "[a]-b-[a]");
        assert_eq!(bracket_matches("none", &[]), "none");
    }

    #[test]
    fn test_bracket_matches_clamps_overlap() {
        assert_eq!(bracket_matches("abcdef", &[0..4, 2..6]), "[abcd][ef]");
        assert_eq!(bracket_matches("abcdef", &[0..4, 1..3]), "[abcd]ef");
    }

    #[test]
    fn test_bracket_matches_folded_expansion() {
        let line = "\u{130}\u{130}\u{130}";
        let ranges = sipview::search::highlight(line, "\u{307}i");
        assert_eq!(bracket_matches(line, &ranges), "[\u{130}\u{130}]\u{130}");
    }
}
