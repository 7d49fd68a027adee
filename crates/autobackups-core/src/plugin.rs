//! Host-facing plugin object
//!
//! [`AutoBackups`] turns editor events and commands into calls on the core
//! components. Errors stop here: they are logged, and the ones meant for the
//! user are shown through [`HostUi`].

use chrono::{Local, NaiveDateTime};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backup::{BackupEvent, BackupWriter, Document, Outcome, SessionKey};
use crate::config::{BackupConfig, Layout};
use crate::error::{Error, Result};
use crate::host::{HostUi, PanelItem, UrlOpener};
use crate::locate::{BackupLocator, ListEntry, Listing};
use crate::paths::PathResolver;
use crate::retention::{RetentionReport, RetentionTask, DEFAULT_SWEEP_DELAY};

/// Sponsorship page opened by the donate command
pub const DONATE_URL: &str = "https://www.paypal.com/cgi-bin/webscr?cmd=_donations&business=MVCBM7M2RCEX6&lc=US&item_name=Support%20our%20open%2dsource%20initiatives&item_number=donation&currency_code=USD&bn=PP%2dDonationsBF%3abtn_donate_LG%2egif%3aNonHosted";

/// The AutoBackups plugin
pub struct AutoBackups {
    config: Arc<BackupConfig>,
    writer: BackupWriter,
    retention: Option<RetentionTask>,
    sweep_delay: Duration,
}

impl AutoBackups {
    /// Create the plugin; nothing runs until [`AutoBackups::start`]
    #[must_use]
    pub fn new(config: BackupConfig) -> Self {
        Self {
            config: Arc::new(config),
            writer: BackupWriter::new(),
            retention: None,
            sweep_delay: DEFAULT_SWEEP_DELAY,
        }
    }

    /// Set the delay between startup and the retention sweep
    #[must_use]
    pub fn with_sweep_delay(mut self, delay: Duration) -> Self {
        self.sweep_delay = delay;
        self
    }

    /// Plugin loaded: schedule the retention sweep
    pub fn start(&mut self) {
        info!("AutoBackups: Plugin Initialized");
        if self.config.retention_days == 0 || self.retention.is_some() {
            return;
        }
        match RetentionTask::schedule(Arc::clone(&self.config), self.sweep_delay) {
            Ok(task) => self.retention = Some(task),
            Err(e) => warn!("AutoBackups: cannot start retention sweep: {e}"),
        }
    }

    /// Plugin unloaded: cancel a pending sweep, or wait for a running one
    pub fn shutdown(&mut self) -> Option<RetentionReport> {
        self.retention.take().and_then(RetentionTask::cancel)
    }

    /// Wait for the scheduled sweep to finish
    pub fn wait_for_retention(&mut self) -> Option<RetentionReport> {
        self.retention.take().and_then(RetentionTask::join)
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &Arc<BackupConfig> {
        &self.config
    }

    /// Swap in a new configuration
    ///
    /// Fingerprints are dropped since the backup targets may have moved. A
    /// sweep that is already scheduled keeps the configuration it was started
    /// with.
    pub fn reload(&mut self, config: BackupConfig) {
        debug!("AutoBackups: configuration reloaded");
        self.config = Arc::new(config);
        self.writer.clear();
    }

    /// The document was saved
    pub fn on_post_save(&mut self, doc: &Document) -> Option<Outcome> {
        self.on_event_at(doc, BackupEvent::Save, Local::now().naive_local())
    }

    /// The document was opened; ignored unless backups on open are enabled
    pub fn on_load(&mut self, doc: &Document) -> Option<Outcome> {
        if !self.config.backup_on_open {
            return None;
        }
        self.on_event_at(doc, BackupEvent::Open, Local::now().naive_local())
    }

    /// The document was closed
    pub fn on_close(&mut self, key: SessionKey) {
        self.writer.forget(key);
    }

    /// Handle an event at a given time
    ///
    /// Returns `None` when the attempt failed; the failure is logged.
    pub fn on_event_at(
        &mut self,
        doc: &Document,
        event: BackupEvent,
        now: NaiveDateTime,
    ) -> Option<Outcome> {
        match self.writer.maybe_backup(&self.config, doc, event, now) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("AutoBackups: {e}");
                None
            }
        }
    }

    /// Let the user pick a backup of `doc` and open it read-only
    pub fn open_backup(&self, doc: &Document, ui: &mut dyn HostUi) {
        if let Err(e) = self.try_open_backup(doc, ui) {
            report(ui, &e);
        }
    }

    fn try_open_backup(&self, doc: &Document, ui: &mut dyn HostUi) -> Result<()> {
        let Some(source) = doc.file_name.as_deref() else {
            return Err(Error::NotFound("Backups for this file not exists!".to_string()));
        };
        let line = self.config.open_in_same_line.then_some(doc.line);

        if self.config.layout == Layout::Flat {
            let now = Local::now().naive_local();
            let path = PathResolver::new(&self.config).full_backup_path(source, now);
            if !path.is_file() {
                return Err(Error::NotFound(format!(
                    "Backup for {} not exists!",
                    source.display()
                )));
            }
            ui.open_file(&path, line)?;
            return Ok(());
        }

        let locator = BackupLocator::new(&self.config);
        let listing = locator.list_backups(source);
        if listing.is_empty() {
            return Err(Error::NotFound("Backups for this file not exists!".to_string()));
        }

        let preview = self.config.show_previews;
        let Some(choice) = ui.show_quick_panel(&panel_items(&listing), preview) else {
            return Ok(());
        };
        let Some(entry) = listing.entries.get(choice) else {
            return Ok(());
        };

        let ListEntry::Day(day) = entry else {
            return open_entry(&listing, choice, line, ui);
        };

        let backups = locator.list_day(source, &day.date);
        if let Some(folder) = &backups.missing {
            return Err(Error::NotFound(format!(
                "Folder {} not found!",
                folder.display()
            )));
        }
        match ui.show_quick_panel(&panel_items(&backups), preview) {
            Some(choice) => open_entry(&backups, choice, line, ui),
            None => Ok(()),
        }
    }

    /// Reveal the backup root in the file browser
    pub fn open_backups_folder(&self, ui: &mut dyn HostUi) {
        let root = PathResolver::new(&self.config).root().to_path_buf();
        if let Err(e) = ui.open_folder(&root) {
            report(ui, &Error::from(e));
        }
    }

    /// Thank the user and open the sponsorship page
    pub fn donate(&self, ui: &mut dyn HostUi, opener: &dyn UrlOpener) {
        ui.message_dialog("AutoBackups: Thanks for your support ^_^");
        if let Err(e) = opener.open(DONATE_URL, &self.config.default_browser) {
            report(ui, &Error::from(e));
        }
    }
}

fn panel_items(listing: &Listing) -> Vec<PanelItem> {
    listing
        .entries
        .iter()
        .map(|entry| PanelItem {
            label: entry.label().to_string(),
            detail: entry.detail(),
            path: entry.path().map(Path::to_path_buf),
        })
        .collect()
}

fn open_entry(
    listing: &Listing,
    choice: usize,
    line: Option<usize>,
    ui: &mut dyn HostUi,
) -> Result<()> {
    if let Some(path) = listing.entries.get(choice).and_then(ListEntry::path) {
        ui.open_file(path, line)?;
    }
    Ok(())
}

fn report(ui: &mut dyn HostUi, error: &Error) {
    warn!("AutoBackups: {error}");
    if error.is_user_facing() {
        ui.error_message(&error.to_string());
    }
}
