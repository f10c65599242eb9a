//! Console rendering of partial results.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Wraps a segment's text at a fixed number of words per line.
///
/// Words are whitespace-separated; each CJK character counts as a word.
/// [`print`](Self::print) redraws the current segment in place and keeps
/// earlier segments on screen.
#[derive(Debug)]
pub struct Display {
    max_words_per_line: usize,
    screen: Mutex<Screen>,
}

/// What the last `print` left on the terminal.
#[derive(Debug, Default)]
struct Screen {
    idx: Option<i32>,
    lines: usize,
}

impl Screen {
    /// Escape sequences that replace the current segment with `rendered`,
    /// or start a new line when `idx` changed.
    fn redraw(&mut self, idx: i32, rendered: &str) -> String {
        let mut out = String::new();
        match self.idx {
            Some(last) if last == idx => {
                if self.lines > 1 {
                    out.push_str(&format!("\x1b[{}A", self.lines - 1));
                }
                out.push_str("\r\x1b[J");
            }
            Some(_) => out.push('\n'),
            None => {}
        }
        out.push_str(rendered);
        self.idx = Some(idx);
        self.lines = rendered.lines().count().max(1);
        out
    }
}

impl Display {
    /// `max_words_per_line == 0` disables wrapping.
    pub fn new(max_words_per_line: usize) -> Self {
        Self {
            max_words_per_line,
            screen: Mutex::default(),
        }
    }

    pub fn max_words_per_line(&self) -> usize {
        self.max_words_per_line
    }

    /// `"{idx}: "` followed by the wrapped words. Continuation lines are
    /// indented to line up under the first word.
    pub fn render(&self, idx: i32, text: &str) -> String {
        let prefix = format!("{idx}: ");
        let words = split_words(text);
        let per_line = match self.max_words_per_line {
            0 => words.len().max(1),
            n => n,
        };

        let mut out = prefix.clone();
        for (i, line) in words.chunks(per_line).enumerate() {
            if i > 0 {
                out.push('\n');
                out.extend(std::iter::repeat(' ').take(prefix.len()));
            }
            out.push_str(&join_words(line));
        }
        out
    }

    /// Draw segment `idx`. Repeated calls with the same `idx` overwrite
    /// every line of the previous rendering; a new `idx` starts below it.
    pub fn print(&self, idx: i32, text: &str) {
        let rendered = self.render(idx, text);
        let frame = self
            .screen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .redraw(idx, &rendered);

        let mut stdout = io::stdout().lock();
        let written = stdout.write_all(frame.as_bytes()).and_then(|_| stdout.flush());
        if let Err(e) = written {
            tracing::debug!(error = %e, "Failed to write display line");
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{20000}'..='\u{2A6DF}')
}

fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = None;
        for (i, c) in chunk.char_indices() {
            if is_cjk(c) {
                if let Some(s) = start.take() {
                    words.push(&chunk[s..i]);
                }
                words.push(&chunk[i..i + c.len_utf8()]);
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            words.push(&chunk[s..]);
        }
    }
    words
}

/// Join with single spaces, except between two CJK characters.
fn join_words(words: &[&str]) -> String {
    let mut out = String::new();
    let mut prev_cjk = false;
    for (i, word) in words.iter().enumerate() {
        let cjk = word.chars().next().is_some_and(is_cjk);
        if i > 0 && !(cjk && prev_cjk) {
            out.push(' ');
        }
        out.push_str(word);
        prev_cjk = cjk;
    }
    out
}
