//! Host editor collaborators
//!
//! The plugin talks to the editor UI through [`HostUi`] and to the browser
//! through [`UrlOpener`]. [`SystemOpener`] launches a named browser or falls
//! back to the operating system's own URL handler.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

use crate::config::Platform;

/// Errors reported by host collaborators
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to open {0}")]
    OpenFailed(String),

    #[error("Can not open {0}. Default browser not found")]
    NoBrowser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of a quick panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelItem {
    pub label: String,
    pub detail: Option<String>,
    /// File previewed when the row is highlighted
    pub path: Option<PathBuf>,
}

/// Editor UI surface used by the commands
pub trait HostUi {
    /// Modal error notice
    fn error_message(&mut self, message: &str);

    /// Modal information notice
    fn message_dialog(&mut self, message: &str);

    /// Show a picker; `None` when dismissed
    ///
    /// With `preview`, highlighted rows that carry a path are opened
    /// transiently.
    fn show_quick_panel(&mut self, items: &[PanelItem], preview: bool) -> Option<usize>;

    /// Open a backup read-only, optionally at a 1-based line
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened
    fn open_file(&mut self, path: &Path, line: Option<usize>) -> Result<(), HostError>;

    /// Reveal a folder in the system file browser
    ///
    /// # Errors
    /// Returns an error if the folder cannot be opened
    fn open_folder(&mut self, path: &Path) -> Result<(), HostError>;
}

/// Opens URLs (and folders) outside the editor
pub trait UrlOpener {
    /// Open `target` in `browser`, or the default handler when empty
    ///
    /// # Errors
    /// Returns an error if nothing could be launched
    fn open(&self, target: &str, browser: &str) -> Result<(), HostError>;
}

/// A program invocation tried by [`SystemOpener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    fn spawn(&self) -> std::io::Result<()> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
    }
}

/// Launches browsers and folders through the operating system
#[derive(Debug, Clone, Copy)]
pub struct SystemOpener {
    platform: Platform,
}

impl SystemOpener {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Commands tried in order to open `url` in `browser`
    #[must_use]
    pub fn launch_plan(&self, url: &str, browser: &str) -> Vec<LaunchCommand> {
        let mut plan = self.browser_commands(url, &browser.trim().to_lowercase());
        plan.push(self.system_command(url));
        plan
    }

    /// The operating system's generic "open" for a URL or path
    #[must_use]
    pub fn system_command(&self, target: &str) -> LaunchCommand {
        match self.platform {
            Platform::Windows => LaunchCommand::new("cmd", &["/c", "start", "", target]),
            Platform::Osx => LaunchCommand::new("open", &[target]),
            Platform::Linux => LaunchCommand::new("xdg-open", &[target]),
        }
    }

    fn browser_commands(&self, url: &str, browser: &str) -> Vec<LaunchCommand> {
        if browser.is_empty() {
            return Vec::new();
        }

        if self.platform == Platform::Osx {
            return mac_app(browser)
                .map(|app| vec![LaunchCommand::new("open", &["-a", app, url])])
                .unwrap_or_default();
        }

        let new_tab = if browser == "opera" { "-newtab" } else { "-new-tab" };
        executables(self.platform, browser)
            .into_iter()
            .map(|program| LaunchCommand::new(program, &[new_tab, url]))
            .collect()
    }
}

impl Default for SystemOpener {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, target: &str, browser: &str) -> Result<(), HostError> {
        for command in self.launch_plan(target, browser) {
            match command.spawn() {
                Ok(()) => return Ok(()),
                Err(e) => debug!("Cannot launch {}: {e}", command.program),
            }
        }
        Err(HostError::NoBrowser(target.to_string()))
    }
}

fn mac_app(browser: &str) -> Option<&'static str> {
    Some(match browser {
        "chrome" => "/Applications/Google Chrome.app",
        "canary" => "/Applications/Google Chrome Canary.app",
        "chromium" => "/Applications/Chromium.app",
        "firefox" => "/Applications/Firefox.app",
        "aurora" => "/Applications/FirefoxAurora.app",
        "opera" => "/Applications/Opera.app",
        "safari" => "Safari",
        _ => return None,
    })
}

/// Candidate executables for a named browser
fn executables(platform: Platform, browser: &str) -> Vec<String> {
    if platform == Platform::Windows {
        let relative: &[&str] = match browser {
            "chrome" => &[r"Google\Chrome\Application\chrome.exe"],
            "canary" => &[r"Google\Chrome SxS\Application\chrome.exe"],
            "chromium" => &[r"Chromium\Application\chrome.exe"],
            "firefox" => &[r"Mozilla Firefox\firefox.exe", r"Nightly\firefox.exe"],
            "aurora" => &[r"Aurora\firefox.exe"],
            "opera" => &[r"Opera\opera.exe", r"Opera Next\opera.exe"],
            "safari" => &[r"Safari\Safari.exe"],
            _ => &[],
        };
        let mut candidates: Vec<String> = ["LOCALAPPDATA", "PROGRAMFILES", "PROGRAMFILES(X86)"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .flat_map(|base| relative.iter().map(move |rel| format!(r"{base}\{rel}")))
            .collect();
        if let Some(exe) = match browser {
            "chrome" | "canary" => Some("chrome.exe"),
            "chromium" => Some("chromium.exe"),
            "firefox" | "aurora" => Some("firefox.exe"),
            "opera" => Some("opera.exe"),
            "safari" => Some("Safari.exe"),
            _ => None,
        } {
            candidates.push(exe.to_string());
        }
        return candidates;
    }

    let names: &[&str] = match browser {
        "chrome" => &["/usr/bin/google-chrome", "/opt/google/chrome/chrome", "google-chrome", "chrome"],
        "chromium" => &["/usr/bin/chromium", "chromium", "/usr/bin/chromium-browser", "chromium-browser"],
        "firefox" => &["/usr/bin/firefox", "firefox"],
        "aurora" => &["/usr/bin/aurora", "firefox"],
        "opera" => &["/usr/bin/opera", "/usr/bin/opera-next", "opera"],
        "safari" => &["/usr/bin/safari"],
        _ => &[],
    };
    names.iter().map(ToString::to_string).collect()
}
