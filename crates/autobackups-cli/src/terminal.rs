//! Terminal rendition of the editor UI

use autobackups_core::host::{HostError, HostUi, PanelItem, SystemOpener, UrlOpener};
use std::io::{BufRead, Write};
use std::path::Path;

/// Pickers on a line-based terminal
///
/// Items are numbered from 1; an empty line or `q` dismisses the picker.
/// Opened files are printed as `path[:line]` for the caller to consume.
pub struct TerminalUi<R, W> {
    input: R,
    output: W,
    launch_folders: bool,
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            launch_folders: false,
        }
    }

    /// Open folders in the system file browser instead of printing them
    #[must_use]
    pub fn launching_folders(mut self) -> Self {
        self.launch_folders = true;
        self
    }

    fn read_choice(&mut self, count: usize) -> Option<usize> {
        loop {
            let _ = write!(self.output, "Select [1-{count}, q]: ");
            let _ = self.output.flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
            let answer = line.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=count).contains(&n) => return Some(n - 1),
                _ => {
                    let _ = writeln!(self.output, "Invalid choice: {answer}");
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> HostUi for TerminalUi<R, W> {
    fn error_message(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn message_dialog(&mut self, message: &str) {
        let _ = writeln!(self.output, "{message}");
    }

    fn show_quick_panel(&mut self, items: &[PanelItem], _preview: bool) -> Option<usize> {
        if items.is_empty() {
            return None;
        }
        for (i, item) in items.iter().enumerate() {
            let _ = writeln!(self.output, "{:>3}. {}", i + 1, item.label);
            if let Some(detail) = &item.detail {
                let _ = writeln!(self.output, "     {detail}");
            }
        }
        self.read_choice(items.len())
    }

    fn open_file(&mut self, path: &Path, line: Option<usize>) -> Result<(), HostError> {
        match line {
            Some(line) => writeln!(self.output, "{}:{line}", path.display())?,
            None => writeln!(self.output, "{}", path.display())?,
        }
        Ok(())
    }

    fn open_folder(&mut self, path: &Path) -> Result<(), HostError> {
        if !self.launch_folders {
            writeln!(self.output, "{}", path.display())?;
            return Ok(());
        }
        let target = path.to_string_lossy();
        SystemOpener::default()
            .open(&target, "")
            .map_err(|_| HostError::OpenFailed(target.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<PanelItem> {
        (0..n)
            .map(|i| PanelItem {
                label: format!("item {i}"),
                detail: Some(format!("detail {i}")),
                path: None,
            })
            .collect()
    }

    #[test]
    fn test_choice_is_one_based() {
        let mut out = Vec::new();
        let mut ui = TerminalUi::new(&b"2\n"[..], &mut out);
        assert_eq!(ui.show_quick_panel(&items(3), true), Some(1));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  1. item 0"));
        assert!(text.contains("     detail 2"));
    }

    #[test]
    fn test_invalid_choice_asks_again() {
        let mut out = Vec::new();
        let mut ui = TerminalUi::new(&b"9\nx\n3\n"[..], &mut out);
        assert_eq!(ui.show_quick_panel(&items(3), false), Some(2));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Invalid choice: 9"));
        assert!(text.contains("Invalid choice: x"));
    }

    #[test]
    fn test_dismiss() {
        for input in [&b"q\n"[..], &b"\n"[..], &b""[..]] {
            let mut ui = TerminalUi::new(input, Vec::new());
            assert_eq!(ui.show_quick_panel(&items(2), false), None);
        }
    }

    #[test]
    fn test_open_file_prints_line() {
        let mut out = Vec::new();
        let mut ui = TerminalUi::new(&b""[..], &mut out);
        ui.open_file(Path::new("/b/2024-01-02/a.txt"), Some(7)).unwrap();
        ui.open_file(Path::new("/b/a.txt"), None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "/b/2024-01-02/a.txt:7\n/b/a.txt\n"
        );
    }
}
