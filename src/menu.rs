use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crate::loader::{self, DispatchOutcome};
use crate::module::ModuleContext;
use crate::modules::cache::{self, StartupState};
use crate::registry::ModuleDescriptor;

const QUIT_TOKEN: &str = "q";
const INVALID_PAUSE: Duration = Duration::from_millis(900);

/// One-shot confirmation gate. Anything but a y/yes answer - empty input,
/// EOF, read errors included - is a refusal.
pub fn confirm_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> bool {
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", text);
    let _ = write!(output, "Proceed? [y/N] ");
    let _ = output.flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_affirmative(&line),
    }
}

pub fn is_affirmative(line: &str) -> bool {
    let t = line.trim();
    t.eq_ignore_ascii_case("y") || t.eq_ignore_ascii_case("yes")
}

pub struct MenuEntry<'a> {
    pub ordinal: usize,
    pub descriptor: &'a ModuleDescriptor,
}

/// Ordinal assignment: category ascending, title ascending within category,
/// numbered from 1. Recomputed on every render pass; nothing here persists.
pub fn build_entries(registry: &[ModuleDescriptor]) -> Vec<MenuEntry<'_>> {
    let mut sorted: Vec<&ModuleDescriptor> = registry.iter().collect();
    sorted.sort_by_key(|d| (d.category(), d.title));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, descriptor)| MenuEntry { ordinal: i + 1, descriptor })
        .collect()
}

pub struct MenuLoop<'a, R, W> {
    registry: &'a [ModuleDescriptor],
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> MenuLoop<'a, R, W> {
    pub fn new(registry: &'a [ModuleDescriptor], input: R, output: W) -> Self {
        Self { registry, input, output }
    }

    /// Render/select until the operator quits. EOF on input quits too, so a
    /// closed stdin cannot spin the loop.
    pub fn run(&mut self, ctx: &ModuleContext) -> io::Result<()> {
        loop {
            let entries = build_entries(self.registry);
            self.render(&entries, ctx)?;

            let Some(line) = read_trimmed(&mut self.input)? else { break };
            if line.eq_ignore_ascii_case(QUIT_TOKEN) {
                break;
            }

            let selected = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| entries.get(i));
            match selected {
                Some(entry) => {
                    let descriptor = entry.descriptor;
                    let input = &mut self.input;
                    let output = &mut self.output;
                    let outcome = loader::dispatch(descriptor, ctx, |text| {
                        confirm_with(&mut *input, &mut *output, text)
                    });
                    self.report(descriptor, &outcome)?;
                    self.acknowledge()?;
                }
                None => {
                    writeln!(self.output, "Invalid selection.")?;
                    self.output.flush()?;
                    thread::sleep(INVALID_PAUSE);
                }
            }
        }
        Ok(())
    }

    fn render(&mut self, entries: &[MenuEntry<'_>], ctx: &ModuleContext) -> io::Result<()> {
        // ANSI clear; Windows 10+ consoles handle VT sequences
        write!(self.output, "\x1B[2J\x1B[1;1H")?;
        writeln!(self.output, "SwingBay Maintenance Toolkit")?;
        writeln!(self.output, "============================")?;

        // Fresh query every render; the toggle direction is never cached
        if entries.iter().any(|e| e.descriptor.path == cache::STARTUP_MODULE_PATH) {
            let status = match cache::startup_state(ctx.tasks) {
                Ok(StartupState::Unregistered) => "disabled".to_string(),
                Ok(StartupState::Registered(state)) => format!("enabled ({})", state),
                Err(e) => format!("unknown ({})", e),
            };
            writeln!(self.output, "Automatic cache clearing at startup: {}", status)?;
        }
        writeln!(self.output)?;

        let mut current_category = "";
        for entry in entries {
            let category = entry.descriptor.category();
            if category != current_category {
                writeln!(self.output, "[{}]", category)?;
                current_category = category;
            }
            writeln!(self.output, "  {}) {}", entry.ordinal, entry.descriptor.title)?;
        }
        writeln!(self.output)?;
        write!(self.output, "Select a module, or {} to quit: ", QUIT_TOKEN)?;
        self.output.flush()
    }

    fn report(&mut self, descriptor: &ModuleDescriptor, outcome: &DispatchOutcome) -> io::Result<()> {
        match outcome {
            DispatchOutcome::Success => writeln!(self.output, "\n{}: done.", descriptor.title),
            DispatchOutcome::Failure(msg) => writeln!(self.output, "\n{}: FAILED: {}", descriptor.title, msg),
            DispatchOutcome::SkippedNotFound => {
                writeln!(self.output, "\n{}: module not found.", descriptor.title)
            }
            DispatchOutcome::SkippedNoConfirm => {
                writeln!(self.output, "\n{}: cancelled, nothing was changed.", descriptor.title)
            }
        }
    }

    fn acknowledge(&mut self) -> io::Result<()> {
        write!(self.output, "Press Enter to return to the menu...")?;
        self.output.flush()?;
        let _ = read_trimmed(&mut self.input)?;
        Ok(())
    }
}

/// `None` on EOF.
fn read_trimmed<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
