// SPDX-License-Identifier: MIT
//
// n-vt — input probe for the terminal engine.
//
// Puts the terminal in raw mode, decodes everything it sends, and draws
// the most recent events through the diffing renderer. Handy for finding
// out what a given terminal actually emits for a key, a mouse gesture, or
// a paste, and for watching the renderer work.
//
// This binary wires the crates together and nothing more:
//
//   n-input → bytes to events (decoder, scanner, ESC timeout)
//   n-term  → poll readers, input threads, raw mode, screen, event loop
//
// Usage:
//
//   n-vt [--alt | --inline] [--mouse]
//
// `q` or `ctrl+c` quits. Set `N_VT_LOG=path` to write a trace log there;
// `N_VT_LOG_LEVEL` takes an `EnvFilter` directive (default `info`).
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ title line (REVERSE)         │  ← 1 row
//   ├──────────────────────────────┤
//   │ events, newest at the bottom │  ← h - 1 rows
//   └──────────────────────────────┘

use std::collections::VecDeque;
use std::env;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use n_input::Event;
use n_term::ansi::MouseMode;
use n_term::buffer::{Rect, Screen};
use n_term::cell::{Attr, Style};
use n_term::color::Color;
use n_term::config::{Config, Environ};
use n_term::event_loop::{Action, App, EventLoop};
use n_term::terminal::{self, Size};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Events kept for display. Older ones scroll off.
const HISTORY: usize = 256;

const USAGE: &str = "usage: n-vt [--alt | --inline] [--mouse]";

// ─── Arguments ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Args {
    alt_screen: bool,
    mouse: bool,
}

fn parse_args<I, S>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Args::default();
    for arg in args {
        match arg.as_ref() {
            "--alt" => out.alt_screen = true,
            "--inline" => out.alt_screen = false,
            "--mouse" => out.mouse = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(out)
}

impl Args {
    fn apply(self, config: &mut Config) {
        config.alt_screen = self.alt_screen;
        if self.mouse {
            config.mouse_mode = MouseMode::Motion;
        }
    }
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Log to the file named by `N_VT_LOG`. Without it, nothing is logged:
/// the terminal is the program's output and stays untouched.
fn init_logging() {
    let Some(path) = env::var_os("N_VT_LOG") else {
        return;
    };
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("n-vt: can't open log {}: {e}", Path::new(&path).display());
            return;
        }
    };
    let filter = EnvFilter::try_from_env("N_VT_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ─── Probe ───────────────────────────────────────────────────────────────────

/// The probe's state: a rolling log of decoded events.
struct Probe {
    events: VecDeque<String>,
    size: Size,
    count: u64,
}

impl Probe {
    fn new(size: Size) -> Self {
        Self {
            events: VecDeque::with_capacity(HISTORY),
            size,
            count: 0,
        }
    }

    fn push(&mut self, line: String) {
        if self.events.len() == HISTORY {
            self.events.pop_front();
        }
        self.events.push_back(line);
        self.count += 1;
    }
}

/// One display line for an event. Control characters in pastes and raw
/// sequences are escaped so they can't move the cursor.
fn describe(event: &Event) -> String {
    let kind = match event {
        Event::KeyPress(_) => "press",
        Event::KeyRelease(_) | Event::MouseRelease(_) => "release",
        Event::MouseClick(_) => "click",
        Event::MouseWheel(_) => "wheel",
        Event::MouseMotion(_) => "motion",
        Event::Paste(_) => "paste",
        _ => return format!("{event:?}").escape_debug().to_string(),
    };
    format!("{kind:<8}{}", event.to_string().escape_debug())
}

impl App for Probe {
    fn on_event(&mut self, event: &Event) -> Action {
        tracing::debug!(?event, "decoded");
        if event.is_press("q") || event.is_press("ctrl+c") {
            return Action::Quit;
        }
        self.push(describe(event));
        Action::Continue
    }

    fn on_resize(&mut self, size: Size) {
        self.size = size;
    }

    fn paint(&mut self, scr: &mut dyn Screen, area: Rect) {
        if area.height == 0 {
            return;
        }

        let title = format!(
            " n-vt {}x{}  events: {}  (q or ctrl+c quits) ",
            self.size.cols, self.size.rows, self.count
        );
        let bar = Style::new().with_attrs(Attr::REVERSE);
        for x in area.x..area.x + area.width {
            scr.set_string(x, area.y, " ", bar);
        }
        scr.set_string(area.x, area.y, &title, bar);

        let rows = usize::from(area.height - 1);
        let skip = self.events.len().saturating_sub(rows);
        let dim = Style::new().with_fg(Color::CYAN);
        for (i, line) in self.events.iter().skip(skip).enumerate() {
            // i < rows <= u16::MAX
            let y = area.y + 1 + u16::try_from(i).unwrap_or(u16::MAX - 1);
            let style = if i + skip + 1 == self.events.len() { Style::new() } else { dim };
            scr.set_string(area.x, y, line, style);
        }
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("n-vt: {e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_logging();

    let mut config = Config::from_env(&Environ::from_process(), terminal::is_output_tty());
    args.apply(&mut config);
    tracing::info!(term = %config.term, profile = ?config.color_profile, ?args, "starting");

    let mut event_loop = match EventLoop::with_config(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("n-vt: failed to initialize terminal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut probe = Probe::new(event_loop.size());
    if let Err(e) = event_loop.run(&mut probe) {
        tracing::error!(%e, "event loop failed");
        eprintln!("n-vt: {e}");
        return ExitCode::FAILURE;
    }
    tracing::info!(events = probe.count, "done");
    ExitCode::SUCCESS
}

// ─── Tests ───────────────────────────────────────────────────────────────────
