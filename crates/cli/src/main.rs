use packsleuth_core::{parse_card_amount, Event, EventBus, Report, SlotLabel, TrackError, Tracker};
use packsleuth_data::load_catalog;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
#[cfg(unix)]
use std::os::fd::AsRawFd;
use std::path::PathBuf;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone)]
struct CliOptions {
    catalog: PathBuf,
    report_json: Option<PathBuf>,
}

/// Envelope written by `--report-json`: the final report plus the run inputs
/// needed to read it in isolation.
#[derive(Debug, Clone, Serialize)]
struct ReportFile {
    catalog: String,
    pack_bound: Option<usize>,
    report: Report,
}

fn parse_cli_options(args: &[String]) -> CliOptions {
    let mut catalog: Option<PathBuf> = None;
    let mut report_json: Option<PathBuf> = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--catalog" | "-c" => {
                if let Some(value) = args.get(idx + 1) {
                    catalog = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            "--report-json" => {
                if let Some(value) = args.get(idx + 1) {
                    report_json = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            other if !other.starts_with('-') && catalog.is_none() => {
                catalog = Some(PathBuf::from(other));
            }
            _ => {}
        }
        idx += 1;
    }
    CliOptions {
        catalog: catalog.unwrap_or_else(|| PathBuf::from("packs.md")),
        report_json,
    }
}

/// Completion context for one prompt: the table of full names to offer, and
/// whether the typed line may carry a `<N>x ` amount prefix that should be
/// kept out of the match.
#[derive(Clone, Copy)]
struct Completion<'a> {
    table: &'a [String],
    amount_prefix: bool,
}

impl Completion<'_> {
    fn none() -> Completion<'static> {
        Completion {
            table: &[],
            amount_prefix: false,
        }
    }
}

struct CompletionResult {
    updated_line: Option<String>,
    suggestions: Vec<String>,
}

impl CompletionResult {
    fn empty() -> Self {
        Self {
            updated_line: None,
            suggestions: Vec::new(),
        }
    }
}

/// Whole-line completion: card and pack names contain spaces, so the entire
/// line (minus an optional amount prefix) is the completion word.
fn complete_line(line: &str, cursor: usize, completion: Completion<'_>) -> CompletionResult {
    if cursor != line.len() {
        return CompletionResult::empty();
    }
    let token = if completion.amount_prefix {
        parse_card_amount(line).0
    } else {
        line
    };
    let prefix = &line[..line.len() - token.len()];
    let matches: Vec<&str> = completion
        .table
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(token))
        .collect();
    if matches.is_empty() {
        return CompletionResult::empty();
    }
    if let [only] = matches[..] {
        return CompletionResult {
            updated_line: Some(format!("{prefix}{only}")),
            suggestions: Vec::new(),
        };
    }
    let common = longest_common_prefix(&matches);
    let updated_line = (common.len() > token.len()).then(|| format!("{prefix}{common}"));
    CompletionResult {
        updated_line,
        suggestions: matches.iter().map(|name| name.to_string()).collect(),
    }
}

fn longest_common_prefix(matches: &[&str]) -> String {
    let Some(first) = matches.first() else {
        return String::new();
    };
    let mut prefix = (*first).to_string();
    for entry in &matches[1..] {
        while !entry.starts_with(&prefix) {
            if prefix.is_empty() {
                return prefix;
            }
            prefix.pop();
        }
    }
    prefix
}

#[derive(Default)]
struct LineEditor {
    history: Vec<String>,
    history_path: Option<PathBuf>,
    history_index: Option<usize>,
    draft_line: Option<String>,
}

impl LineEditor {
    fn new() -> Self {
        let mut editor = Self {
            history_path: default_history_path(),
            ..Self::default()
        };
        editor.load_history();
        editor
    }

    #[cfg(unix)]
    fn read_line(&mut self, prompt: &str, completion: Completion<'_>) -> Option<String> {
        let stdin = io::stdin();
        let fd = stdin.as_raw_fd();
        if unsafe { libc::isatty(fd) } != 1 {
            return self.read_line_basic(prompt);
        }
        let _raw = match RawMode::new(fd) {
            Ok(raw) => raw,
            Err(_) => return self.read_line_basic(prompt),
        };
        let mut input = stdin.lock();
        let mut buffer = String::new();
        let mut cursor = 0usize;
        self.history_index = None;
        self.draft_line = None;
        redraw_prompt_line(prompt, &buffer, cursor);
        loop {
            let mut byte = [0u8; 1];
            if input.read_exact(&mut byte).is_err() {
                return None;
            }
            match byte[0] {
                b'\n' | b'\r' => {
                    println!();
                    self.push_history(&buffer);
                    return Some(buffer);
                }
                3 => {
                    println!();
                    return Some(String::new());
                }
                4 => {
                    if buffer.is_empty() {
                        println!();
                        return None;
                    }
                }
                9 => {
                    let result = complete_line(&buffer, cursor, completion);
                    if let Some(updated) = result.updated_line {
                        buffer = updated;
                        cursor = buffer.len();
                    }
                    if !result.suggestions.is_empty() {
                        println!();
                        println!("{}", result.suggestions.join("  "));
                    }
                    redraw_prompt_line(prompt, &buffer, cursor);
                    continue;
                }
                127 | 8 => {
                    if cursor > 0 {
                        let previous = prev_char_boundary(&buffer, cursor);
                        buffer.drain(previous..cursor);
                        cursor = previous;
                        self.history_index = None;
                    }
                }
                b'\x1b' => match read_escape_key(&mut input) {
                    Some(EscapeKey::Up) => self.history_prev(&mut buffer, &mut cursor),
                    Some(EscapeKey::Down) => self.history_next(&mut buffer, &mut cursor),
                    Some(EscapeKey::Left) => {
                        cursor = prev_char_boundary(&buffer, cursor);
                    }
                    Some(EscapeKey::Right) => {
                        cursor = next_char_boundary(&buffer, cursor);
                    }
                    Some(EscapeKey::Home) => cursor = 0,
                    Some(EscapeKey::End) => cursor = buffer.len(),
                    Some(EscapeKey::Delete) => {
                        if cursor < buffer.len() {
                            let next = next_char_boundary(&buffer, cursor);
                            buffer.drain(cursor..next);
                            self.history_index = None;
                        }
                    }
                    None => {}
                },
                byte if byte.is_ascii_control() => {}
                byte => {
                    let ch = byte as char;
                    buffer.insert(cursor, ch);
                    cursor += ch.len_utf8();
                    self.history_index = None;
                }
            }
            redraw_prompt_line(prompt, &buffer, cursor);
        }
    }

    #[cfg(not(unix))]
    fn read_line(&mut self, prompt: &str, _completion: Completion<'_>) -> Option<String> {
        self.read_line_basic(prompt)
    }

    fn read_line_basic(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end_matches(&['\n', '\r'][..]).to_string();
        self.push_history(&line);
        Some(line)
    }

    fn history_prev(&mut self, buffer: &mut String, cursor: &mut usize) {
        if self.history.is_empty() {
            return;
        }
        match self.history_index {
            Some(0) => {}
            Some(index) => {
                self.history_index = Some(index.saturating_sub(1));
            }
            None => {
                self.draft_line = Some(buffer.clone());
                self.history_index = Some(self.history.len() - 1);
            }
        }
        if let Some(index) = self.history_index {
            *buffer = self.history[index].clone();
            *cursor = buffer.len();
        }
    }

    fn history_next(&mut self, buffer: &mut String, cursor: &mut usize) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            *buffer = self.history[index + 1].clone();
        } else {
            self.history_index = None;
            *buffer = self.draft_line.take().unwrap_or_default();
        }
        *cursor = buffer.len();
    }

    fn push_history(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.history.last().is_some_and(|last| last == line) {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > 500 {
            let drop = self.history.len() - 500;
            self.history.drain(0..drop);
        }
    }

    fn load_history(&mut self) {
        let Some(path) = self.history_path.as_ref() else {
            return;
        };
        let Ok(contents) = fs::read_to_string(path) else {
            return;
        };
        self.history = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();
    }

    fn save_history(&self) {
        let Some(path) = self.history_path.as_ref() else {
            return;
        };
        let mut contents = self.history.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        if let Err(err) = fs::write(path, contents) {
            eprintln!("history warning: {err}");
        }
    }
}

fn default_history_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PACKSLEUTH_HISTORY") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".packsleuth_history"))
}

#[derive(Debug, Clone, Copy)]
enum EscapeKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Delete,
}

fn prev_char_boundary(text: &str, index: usize) -> usize {
    if index == 0 {
        return 0;
    }
    text[..index]
        .char_indices()
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    index
        + text[index..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0)
}

fn redraw_prompt_line(prompt: &str, line: &str, cursor: usize) {
    print!("\r\x1b[2K{prompt}{line}");
    let line_chars = line.chars().count();
    let cursor_chars = line[..cursor].chars().count();
    let move_left = line_chars.saturating_sub(cursor_chars);
    if move_left > 0 {
        print!("\x1b[{move_left}D");
    }
    let _ = io::stdout().flush();
}

#[cfg(unix)]
fn read_escape_key(input: &mut impl Read) -> Option<EscapeKey> {
    let mut first = [0u8; 1];
    input.read_exact(&mut first).ok()?;
    match first[0] {
        b'[' => {
            let mut second = [0u8; 1];
            input.read_exact(&mut second).ok()?;
            match second[0] {
                b'A' => Some(EscapeKey::Up),
                b'B' => Some(EscapeKey::Down),
                b'C' => Some(EscapeKey::Right),
                b'D' => Some(EscapeKey::Left),
                b'H' => Some(EscapeKey::Home),
                b'F' => Some(EscapeKey::End),
                b'1' | b'2' | b'3' | b'4' | b'5' | b'6' | b'7' | b'8' => {
                    let mut code = vec![second[0]];
                    loop {
                        let mut next = [0u8; 1];
                        input.read_exact(&mut next).ok()?;
                        if next[0] == b'~' {
                            break;
                        }
                        code.push(next[0]);
                    }
                    match code.as_slice() {
                        b"1" | b"7" => Some(EscapeKey::Home),
                        b"3" => Some(EscapeKey::Delete),
                        b"4" | b"8" => Some(EscapeKey::End),
                        _ => None,
                    }
                }
                _ => None,
            }
        }
        b'O' => {
            let mut second = [0u8; 1];
            input.read_exact(&mut second).ok()?;
            match second[0] {
                b'H' => Some(EscapeKey::Home),
                b'F' => Some(EscapeKey::End),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(unix)]
struct RawMode {
    fd: i32,
    original: libc::termios,
}

#[cfg(unix)]
impl RawMode {
    fn new(fd: i32) -> io::Result<Self> {
        let mut original = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(fd, &mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_iflag &= !(libc::IXON | libc::ICRNL);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd, original })
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.original) };
    }
}

fn paint_label(label: &SlotLabel) -> String {
    match label {
        SlotLabel::Exact(name) => format!("{GREEN}{name}{RESET}"),
        SlotLabel::Family(name) => format!("{YELLOW}{name}{RESET}"),
        SlotLabel::Inconclusive(number) => format!("{YELLOW}inconclusive #{number}{RESET}"),
    }
}

fn print_status(tracker: &Tracker) {
    let mut parts: Vec<String> = Vec::new();
    for idx in 0..tracker.slots.len() {
        let mut part = format!(
            "{} x{}",
            paint_label(&tracker.slot_label(idx)),
            tracker.slot_observed_total(idx)
        );
        if tracker.slots[idx].is_resolved() {
            part.push_str(&format!("/{}", tracker.slot_capacity_total(idx)));
        }
        parts.push(part);
    }
    parts.push(format!(
        "{RED}unknown{RESET} x{}",
        tracker.unassigned.len()
    ));
    println!("Status: {}", parts.join(", "));
}

fn render_events(events: &mut EventBus) {
    for event in events.drain() {
        match event {
            Event::SlotOpened {
                label,
                possibilities,
                ..
            } => {
                if possibilities == 1 {
                    println!("New pack: {}", paint_label(&label));
                } else {
                    println!(
                        "New pack: {} ({possibilities} possibilities)",
                        paint_label(&label)
                    );
                }
            }
            Event::SlotNarrowed {
                was, now, from, to, ..
            } => {
                if to == 1 {
                    println!("{} is now {}", paint_label(&was), paint_label(&now));
                } else {
                    println!(
                        "{} is now {} ({from} possibilities reduced to {to})",
                        paint_label(&was),
                        paint_label(&now)
                    );
                }
            }
            Event::CardAssigned { card, label, .. } => {
                println!("{card} -> {}", paint_label(&label));
            }
            Event::CardUnassigned { card, pending } => {
                println!("{card} -> {RED}unknown{RESET} x{pending}");
            }
        }
    }
}

fn print_final_report(tracker: &Tracker) {
    let report = tracker.report();
    println!("\n\n---FINAL REPORT---\n");
    for (idx, slot) in report.slots.iter().enumerate() {
        if slot.is_resolved() {
            println!("{}. {}", idx + 1, paint_label(&slot.label));
            for card in &slot.cards {
                println!("- {}/{} {}", card.amount, card.max_amount, card.name);
            }
        } else {
            println!(
                "{}. {} is one of the following: {}",
                idx + 1,
                paint_label(&slot.label),
                slot.candidates.join(", ")
            );
            for card in &slot.cards {
                println!("- {}/{} {}", card.amount, card.max_amount, card.name);
            }
            println!("...");
        }
        println!();
    }
    if !report.unassigned.is_empty() {
        println!("{RED}Unassigned{RESET} cards:");
        for line in &report.unassigned {
            println!("- {}x {}", line.count, line.name);
        }
    }
}

fn prompt_pack_bound(editor: &mut LineEditor) -> Option<usize> {
    loop {
        let Some(line) = editor.read_line("Amount of packs [unknown]: ", Completion::none())
        else {
            return None;
        };
        let line = line.trim();
        if line.is_empty() || line == "unknown" {
            return None;
        }
        match line.parse::<usize>() {
            Ok(count) => return Some(count),
            Err(_) => println!("ERROR: enter a number or 'unknown'"),
        }
    }
}

fn prompt_seed_slots(
    tracker: &mut Tracker,
    families: &[String],
    bound: usize,
    editor: &mut LineEditor,
) {
    let completion = Completion {
        table: families,
        amount_prefix: false,
    };
    for number in 1..=bound {
        loop {
            let prompt = format!("Enter name of pack {number} [unknown]: ");
            let Some(line) = editor.read_line(&prompt, completion) else {
                return;
            };
            let name = line.trim();
            if name.is_empty() || name == "unknown" {
                break;
            }
            match tracker.seed_slot(name) {
                Ok(_) => break,
                Err(_) => println!("ERROR: no such pack"),
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args);

    println!("Loading pack data...");
    let catalog = match load_catalog(&options.catalog) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("catalog error: {err:#}");
            std::process::exit(1);
        }
    };
    let card_names = catalog.card_names();
    let family_names = catalog.family_names();

    let mut editor = LineEditor::new();
    let pack_bound = prompt_pack_bound(&mut editor);
    let mut tracker = Tracker::new(catalog, pack_bound);
    if let Some(bound) = pack_bound {
        prompt_seed_slots(&mut tracker, &family_names, bound, &mut editor);
    }

    let card_completion = Completion {
        table: &card_names,
        amount_prefix: true,
    };
    let mut events = EventBus::default();
    loop {
        print_status(&tracker);
        let Some(line) = editor.read_line("Enter card name, or press EOF to finish: ", card_completion)
        else {
            break;
        };
        let (card, count) = parse_card_amount(line.trim_end());
        match tracker.observe(card, count, &mut events) {
            Ok(()) => render_events(&mut events),
            Err(TrackError::UnknownCard(_)) => println!("ERROR: no such card"),
            Err(err) => println!("ERROR: {err}"),
        }
    }
    editor.save_history();

    print_final_report(&tracker);
    if let Some(path) = options.report_json.as_ref() {
        let payload = ReportFile {
            catalog: options.catalog.display().to_string(),
            pack_bound: tracker.pack_bound,
            report: tracker.report(),
        };
        let body = match serde_json::to_string_pretty(&payload) {
            Ok(body) => body,
            Err(err) => {
                eprintln!("report error: {err}");
                std::process::exit(1);
            }
        };
        if let Err(err) = fs::write(path, body) {
            eprintln!("report error: {err}");
            std::process::exit(1);
        }
    }
}
