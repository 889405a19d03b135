//! Interactive line input for the shell.

use std::collections::VecDeque;
use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;
use std::mem::MaybeUninit;

/// How many lines the input history keeps.
const HISTORY_LENGTH: usize = 32;

/// A line prompt with raw-mode editing and history.
///
/// When stdin is not a terminal the prompt degrades to plain buffered reads
/// so the shell stays scriptable.
pub struct Prompt {
    interactive: bool,
    history: VecDeque<String>,
}

impl Prompt {
    pub fn new() -> Self {
        let interactive = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
        Self {
            interactive,
            history: VecDeque::new(),
        }
    }

    /// Shows `prompt` and reads one line. Returns `None` on end of input.
    pub fn read_line(&mut self, prompt: &str) -> Option<String> {
        let line = if self.interactive {
            self.read_raw(prompt)
        } else {
            plain_read(prompt)
        }?;
        if !line.is_empty() {
            if self.history.len() == HISTORY_LENGTH {
                self.history.pop_back();
            }
            self.history.push_front(line.clone());
        }
        Some(line)
    }

    fn read_raw(&mut self, prompt: &str) -> Option<String> {
        let Some(saved) = raw_mode_on() else {
            return plain_read(prompt);
        };
        let mut input = String::new();
        let mut cursor = 0;
        // index into the history while browsing it, newest first
        let mut browse: Option<usize> = None;
        let mut stash = String::new();
        redraw(prompt, &input, cursor);
        let result = loop {
            let Some(c) = read_byte() else {
                break if input.is_empty() { None } else { Some(input) };
            };
            match c {
                b'\r' | b'\n' => break Some(input),
                // ctrl-d on an empty line ends the session
                0x04 => {
                    if input.is_empty() {
                        break None;
                    }
                }
                // ctrl-c clears the line
                0x03 => {
                    input.clear();
                    cursor = 0;
                    browse = None;
                    redraw(prompt, &input, cursor);
                }
                // backspace
                0x7f | 0x08 => {
                    if cursor > 0 {
                        input.remove(cursor - 1);
                        cursor -= 1;
                        redraw(prompt, &input, cursor);
                    }
                }
                0x1b => match read_escape() {
                    Some(b'A') => {
                        let next = match browse {
                            None => 0,
                            Some(i) => (i + 1).min(self.history.len().saturating_sub(1)),
                        };
                        if let Some(line) = self.history.get(next) {
                            if browse.is_none() {
                                stash = input.clone();
                            }
                            browse = Some(next);
                            input = line.clone();
                            cursor = input.len();
                            redraw(prompt, &input, cursor);
                        }
                    }
                    Some(b'B') => {
                        match browse {
                            Some(0) | None => {
                                browse = None;
                                input = std::mem::take(&mut stash);
                            }
                            Some(i) => {
                                browse = Some(i - 1);
                                input = self.history[i - 1].clone();
                            }
                        }
                        cursor = input.len();
                        redraw(prompt, &input, cursor);
                    }
                    Some(b'C') => {
                        if cursor < input.len() {
                            cursor += 1;
                            redraw(prompt, &input, cursor);
                        }
                    }
                    Some(b'D') => {
                        if cursor > 0 {
                            cursor -= 1;
                            redraw(prompt, &input, cursor);
                        }
                    }
                    _ => {}
                },
                c if (0x20..0x7f).contains(&c) => {
                    input.insert(cursor, c as char);
                    cursor += 1;
                    redraw(prompt, &input, cursor);
                }
                _ => {}
            }
        };
        raw_mode_off(&saved);
        println!();
        result
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

fn plain_read(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
    }
}

fn read_byte() -> Option<u8> {
    let mut byte = [0u8; 1];
    match io::stdin().lock().read(&mut byte) {
        Ok(1) => Some(byte[0]),
        _ => None,
    }
}

/// Reads the tail of an ANSI escape sequence, returning its final byte.
fn read_escape() -> Option<u8> {
    if read_byte()? != b'[' {
        return None;
    }
    read_byte()
}

fn redraw(prompt: &str, input: &str, cursor: usize) {
    let mut out = io::stdout().lock();
    let _ = write!(out, "\r\x1b[K{prompt}{input}");
    let back = input.len() - cursor;
    if back > 0 {
        let _ = write!(out, "\x1b[{back}D");
    }
    let _ = out.flush();
}

/// Puts the terminal in raw mode, returning the state to restore.
fn raw_mode_on() -> Option<libc::termios> {
    unsafe {
        let mut saved: libc::termios = MaybeUninit::zeroed().assume_init();
        if libc::tcgetattr(libc::STDIN_FILENO, &mut saved) != 0 {
            return None;
        }
        let mut raw = saved;
        raw.c_iflag &= !(libc::ICRNL | libc::IXON);
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw) != 0 {
            return None;
        }
        Some(saved)
    }
}

fn raw_mode_off(saved: &libc::termios) {
    unsafe {
        libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, saved);
    }
}
