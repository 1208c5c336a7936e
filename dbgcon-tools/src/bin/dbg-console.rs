// dbg-console
//
// Live view of debug messages sent by an application over UDP.
//
// Build: cargo run --release --bin dbg-console -- [options]
// Keys:  type to filter, Ctrl-U clear filter, Ctrl-L clear console,
//        Ctrl-A toggle auto-scroll, arrows/PgUp/PgDn/Home/End scroll,
//        Esc / Ctrl-C quit

use clap::Parser;
use crossbeam::channel;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{cursor, style, terminal, ExecutableCommand, QueueableCommand};
use dbgcon::{Console, Presenter, Record, Session, Severity, Status};
use dbgcon_tools::{init_logging, ConsoleOpts};
use log::info;
use std::io::{self, Write};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "dbg-console", about = "Real-time UDP debug message console")]
struct Cli {
    #[command(flatten)]
    opts: ConsoleOpts,

    /// Start with auto-scroll disabled
    #[arg(long = "no-autoscroll")]
    no_autoscroll: bool,

    /// UI refresh rate
    #[arg(long = "fps", default_value_t = 30)]
    fps: u64,
}

/// Lines taken by the toolbar, separator and status bar.
const CHROME_ROWS: u16 = 3;

/// Scroll position of the record area. Fed by the console's presenter calls.
#[derive(Default)]
struct Screen {
    /// Index into the visible records of the first row shown when not following.
    top: usize,
    /// Record rows available at the last draw.
    page: usize,
    dirty: bool,
}

impl Screen {
    fn bottom_top(&self, len: usize) -> usize {
        len.saturating_sub(self.page.max(1))
    }

    fn first_row(&self, len: usize, follow: bool) -> usize {
        if follow {
            self.bottom_top(len)
        } else {
            self.top.min(self.bottom_top(len))
        }
    }
}

impl Presenter for Screen {
    fn record_appended(&mut self, _record: &Record, visible: bool) {
        if visible {
            self.dirty = true;
        }
    }

    fn view_rebuilt(&mut self, _visible: &[&Record]) {
        self.top = 0;
        self.dirty = true;
    }

    fn status_changed(&mut self, _status: &Status) {
        self.dirty = true;
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Success => Color::Green,
        Severity::Info => Color::White,
    }
}

/// Single terminal row: control characters blanked, cut to `width` chars.
fn fit(text: &str, width: usize) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(width)
        .collect()
}

struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(terminal::EnterAlternateScreen)?;
        stdout.execute(cursor::Hide)?;
        Ok(Self { stdout })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(&mut self, console: &mut Console<Screen>) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = cols as usize;
        let page = rows.saturating_sub(CHROME_ROWS) as usize;
        console.presenter_mut().page = page;

        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        // Toolbar
        let toolbar = format!(
            "[{}] Auto-scroll  Filter: {}_  Messages: {} (shown {})",
            if console.autoscroll() { "x" } else { " " },
            console.filter().text(),
            console.message_count(),
            console.view().len(),
        );
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout.queue(style::Print(fit(&toolbar, width)))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        self.stdout
            .queue(style::Print("─".repeat(width)))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        // Records
        let visible = console.visible();
        let first = console
            .presenter()
            .first_row(visible.len(), console.autoscroll());
        for record in visible.iter().skip(first).take(page) {
            let stamp = format!("[{}] ", record.display_time());
            self.stdout.queue(SetForegroundColor(Color::Blue))?;
            self.stdout.queue(style::Print(fit(&stamp, width)))?;
            self.stdout
                .queue(SetForegroundColor(severity_color(record.severity())))?;
            self.stdout.queue(style::Print(fit(
                record.raw_text(),
                width.saturating_sub(stamp.chars().count()),
            )))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.queue(cursor::MoveToNextLine(1))?;
        }

        // Status bar
        let status = format!(
            "{}  |  Ctrl-L clear  Ctrl-A auto-scroll  Ctrl-U clear filter  Esc quit",
            console.status()
        );
        self.stdout.queue(cursor::MoveTo(0, rows.saturating_sub(1)))?;
        self.stdout.queue(SetAttribute(Attribute::Reverse))?;
        self.stdout
            .queue(style::Print(format!("{:<width$}", fit(&status, width))))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;

        console.presenter_mut().dirty = false;
        self.stdout.flush()
    }
}

/// Redraw period for `fps`, kept between 1 ms and 1 s.
fn frame_interval(fps: u64) -> Duration {
    Duration::from_millis(1000 / fps.clamp(1, 1000))
}

enum KeyAction {
    Quit,
    Handled,
    Ignored,
}

fn handle_key(key: KeyEvent, console: &mut Console<Screen>, filter: &mut String) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignored;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let len = console.view().len();

    match key.code {
        KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char('c') if ctrl => return KeyAction::Quit,
        KeyCode::Char('l') if ctrl => console.on_clear_requested(),
        KeyCode::Char('a') if ctrl => {
            let follow = console.toggle_autoscroll();
            if !follow {
                let screen = console.presenter_mut();
                screen.top = screen.bottom_top(len);
            }
        }
        KeyCode::Char('u') if ctrl => {
            filter.clear();
            console.on_filter_changed(filter.as_str());
        }
        KeyCode::Char(c) if !ctrl => {
            filter.push(c);
            console.on_filter_changed(filter.as_str());
        }
        KeyCode::Backspace => {
            if filter.pop().is_some() {
                console.on_filter_changed(filter.as_str());
            }
        }
        KeyCode::Up | KeyCode::PageUp | KeyCode::Home => {
            let follow = console.autoscroll();
            console.set_autoscroll(false);
            let screen = console.presenter_mut();
            let current = screen.first_row(len, follow);
            screen.top = match key.code {
                KeyCode::Up => current.saturating_sub(1),
                KeyCode::PageUp => current.saturating_sub(screen.page.max(1)),
                _ => 0,
            };
        }
        KeyCode::Down | KeyCode::PageDown => {
            let follow = console.autoscroll();
            let screen = console.presenter_mut();
            let current = screen.first_row(len, follow);
            let step = if key.code == KeyCode::Down {
                1
            } else {
                screen.page.max(1)
            };
            screen.top = (current + step).min(screen.bottom_top(len));
        }
        KeyCode::End => console.set_autoscroll(true),
        _ => return KeyAction::Ignored,
    }
    console.presenter_mut().dirty = true;
    KeyAction::Handled
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.opts.log_file.as_deref(), false) {
        eprintln!("dbg-console: cannot open log file: {}", e);
        std::process::exit(2);
    }

    let config = match cli.opts.resolve_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("dbg-console: {}", e);
            std::process::exit(2);
        }
    };

    let mut session = Session::new(config);
    let inbox = match session.start() {
        Ok(inbox) => inbox,
        Err(e) => {
            eprintln!("dbg-console: {}", e);
            std::process::exit(1);
        }
    };

    let mut tui = match Tui::setup() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("dbg-console: terminal setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut t = Tui {
            stdout: io::stdout(),
        };
        t.teardown();
        original_hook(panic_info);
    }));

    let mut console = Console::with_presenter(Screen {
        dirty: true,
        ..Default::default()
    });
    console.set_autoscroll(!cli.no_autoscroll);
    let mut filter = String::new();

    // Keyboard handler
    let (key_tx, key_rx) = channel::unbounded();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if key_tx.send(ev).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });

    let tick = channel::tick(frame_interval(cli.fps));
    'main: loop {
        crossbeam::select! {
            recv(inbox.receiver()) -> item => {
                match item {
                    Ok(item) => {
                        console.dispatch(item);
                        inbox.drain(&mut console);
                    }
                    Err(_) => break 'main,
                }
            }

            recv(key_rx) -> ev => {
                match ev {
                    Ok(Event::Key(key)) => {
                        if let KeyAction::Quit = handle_key(key, &mut console, &mut filter) {
                            break 'main;
                        }
                    }
                    Ok(Event::Resize(_, _)) => console.presenter_mut().dirty = true,
                    Ok(_) => {}
                    Err(_) => break 'main,
                }
            }

            recv(tick) -> _ => {
                if console.presenter().dirty && tui.draw(&mut console).is_err() {
                    break 'main;
                }
            }
        }
    }

    tui.teardown();
    session.shutdown();
    info!("{} messages received", console.message_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbgcon::dispatcher;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn console_with(texts: &[&str]) -> Console<Screen> {
        let (d, inbox) = dispatcher();
        for t in texts {
            d.deliver(t).unwrap();
        }
        let mut console = Console::with_presenter(Screen {
            page: 2,
            ..Default::default()
        });
        inbox.drain(&mut console);
        console
    }

    #[test]
    fn typing_edits_filter() {
        let mut console = console_with(&["apple", "banana", "apple pie"]);
        let mut filter = String::new();
        for c in "pie".chars() {
            handle_key(key(KeyCode::Char(c), KeyModifiers::NONE), &mut console, &mut filter);
        }
        assert_eq!(console.view().len(), 1);
        handle_key(key(KeyCode::Char('u'), KeyModifiers::CONTROL), &mut console, &mut filter);
        assert_eq!(filter, "");
        assert_eq!(console.view().len(), 3);
    }

    #[test]
    fn scrolling_up_stops_following() {
        let mut console = console_with(&["a", "b", "c", "d", "e"]);
        let mut filter = String::new();
        assert_eq!(console.presenter().first_row(5, console.autoscroll()), 3);
        handle_key(key(KeyCode::Up, KeyModifiers::NONE), &mut console, &mut filter);
        assert!(!console.autoscroll());
        assert_eq!(console.presenter().first_row(5, false), 2);
        handle_key(key(KeyCode::Home, KeyModifiers::NONE), &mut console, &mut filter);
        assert_eq!(console.presenter().top, 0);
        handle_key(key(KeyCode::End, KeyModifiers::NONE), &mut console, &mut filter);
        assert!(console.autoscroll());
    }

    #[test]
    fn control_keys() {
        let mut console = console_with(&["a", "b"]);
        let mut filter = String::new();
        handle_key(key(KeyCode::Char('l'), KeyModifiers::CONTROL), &mut console, &mut filter);
        assert_eq!(console.message_count(), 0);
        assert!(matches!(
            handle_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut console, &mut filter),
            KeyAction::Quit
        ));
        assert!(matches!(
            handle_key(key(KeyCode::Esc, KeyModifiers::NONE), &mut console, &mut filter),
            KeyAction::Quit
        ));
    }

    #[test]
    fn frame_interval_never_zero() {
        assert_eq!(frame_interval(30), Duration::from_millis(33));
        assert_eq!(frame_interval(0), Duration::from_secs(1));
        assert_eq!(frame_interval(5000), Duration::from_millis(1));
    }

    #[test]
    fn fit_blanks_control_chars() {
        assert_eq!(fit("a\tb\nc", 10), "a b c");
        assert_eq!(fit("abcdef", 3), "abc");
    }
}
