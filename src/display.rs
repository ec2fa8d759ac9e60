//! Where status lines and prompts end up.

use anyhow::{Context, Result};
use console::Term;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::warn;
use std::io::{self, Write};

/// Receiver of everything the progress monitor shows.
pub trait DisplaySink {
    /// Replace the current status line.
    fn update(&mut self, line: &str);

    /// ffmpeg is waiting for an answer to `text`.
    fn prompt(&mut self, text: &str);

    /// Leave the last status line in scrollback.
    fn finish(&mut self);

    /// Current terminal width, if there is one.
    fn columns(&self) -> Option<u16> {
        None
    }
}

/// Status line drawn in place on stdout.
pub struct TerminalDisplay {
    bar: ProgressBar,
    term: Term,
    drawn: bool,
    /// ffmpeg's stdin; when set, overwrite prompts are answered from here
    responder: Option<Box<dyn Write + Send>>,
}

impl TerminalDisplay {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(ProgressStyle::with_template("{msg}").context("building status line style")?);
        Ok(Self {
            bar,
            term: Term::stdout(),
            drawn: false,
            responder: None,
        })
    }

    /// Ask overwrite questions with a confirmation prompt and send the
    /// answer to `stdin` instead of echoing them.
    pub fn with_responder<W: Write + Send + 'static>(mut self, stdin: W) -> Self {
        self.responder = Some(Box::new(stdin));
        self
    }

    fn echo(&self, text: &str) {
        self.bar.suspend(|| {
            let mut out = io::stdout();
            if let Err(e) = write!(out, "{} ", text).and_then(|_| out.flush()) {
                warn!("failed to echo prompt: {}", e);
            }
        });
    }

    fn confirm(&mut self, text: &str) {
        let Some(stdin) = self.responder.as_mut() else {
            return;
        };
        let question = text.trim_end_matches("[y/N]").trim_end();

        let overwrite = self.bar.suspend(|| {
            Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
                .unwrap_or_else(|e| {
                    warn!("cannot ask \"{}\" ({}); answering no", question, e);
                    false
                })
        });

        let answer = if overwrite { "y" } else { "n" };
        if let Err(e) = writeln!(stdin, "{}", answer).and_then(|_| stdin.flush()) {
            warn!("failed to send answer to ffmpeg: {}", e);
        }
    }
}

impl DisplaySink for TerminalDisplay {
    fn update(&mut self, line: &str) {
        self.bar.set_message(line.to_string());
        self.drawn = true;
    }

    fn prompt(&mut self, text: &str) {
        if self.responder.is_some() {
            self.confirm(text);
        } else {
            self.echo(text);
        }
    }

    fn finish(&mut self) {
        if self.drawn {
            self.bar.finish();
        } else {
            self.bar.finish_and_clear();
        }
    }

    fn columns(&self) -> Option<u16> {
        self.term.size_checked().map(|(_rows, cols)| cols)
    }
}

/// Keeps everything in memory; for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryDisplay {
    pub updates: Vec<String>,
    pub prompts: Vec<String>,
    pub finished: bool,
    pub width: Option<u16>,
}

impl MemoryDisplay {
    pub fn with_width(width: u16) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    /// The line left on screen.
    pub fn current(&self) -> Option<&str> {
        self.updates.last().map(String::as_str)
    }
}

impl DisplaySink for MemoryDisplay {
    fn update(&mut self, line: &str) {
        self.updates.push(line.to_string());
    }

    fn prompt(&mut self, text: &str) {
        self.prompts.push(text.to_string());
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn columns(&self) -> Option<u16> {
        self.width
    }
}

impl<D: DisplaySink + ?Sized> DisplaySink for &mut D {
    fn update(&mut self, line: &str) {
        (**self).update(line)
    }

    fn prompt(&mut self, text: &str) {
        (**self).prompt(text)
    }

    fn finish(&mut self) {
        (**self).finish()
    }

    fn columns(&self) -> Option<u16> {
        (**self).columns()
    }
}
