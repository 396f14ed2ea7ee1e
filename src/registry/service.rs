//! Source registry.
//!
//! The registry owns the ordered list of [`Source`]s and the source list file
//! they are persisted in. Positions in the list are the addresses used by
//! [`SourceRegistry::list`] and [`SourceRegistry::delete`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{Config, FetchConfig};
use crate::feed::fetcher::{FetchGateway, ReachabilityCheck};
use crate::feed::source::Source;
use crate::registry::confirm::{AlwaysConfirm, Confirm, Selection};
use crate::registry::persist::{backup_path, create_backup, versioned_backup_path, write_atomic};
use crate::registry::schema::{SourceListFile, VersionedSourceList, CURRENT_VERSION};
use crate::{FeederError, Result};

/// Prompt shown before discarding unsaved changes.
pub const UNSAVED_PROMPT: &str = "This will overwrite unsaved data, are you sure?";

/// Lifecycle state of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Empty, never loaded.
    Fresh,
    /// Matches the file it was loaded from.
    Loaded,
    /// Sources added or deleted since the last load or save.
    Mutated,
    /// Matches the file it was last saved to.
    Saved,
}

/// Concurrency limits for [`SourceRegistry::refresh_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Fetches in flight at once.
    pub max_concurrent: usize,
    /// Upper bound on one source's fetch.
    pub timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RefreshSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            timeout: Duration::from_secs(config.total_timeout_secs),
        }
    }
}

/// Outcome of a batch refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub attempted: usize,
    pub valid: usize,
    /// URLs of sources that did not become valid, in registry order.
    pub failed: Vec<String>,
    /// URLs of valid sources whose article file could not be written.
    pub save_failed: Vec<String>,
}

impl RefreshSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.save_failed.is_empty()
    }
}

/// Sources to add: one or more URLs with optional names and subnames.
///
/// Names and subnames default to empty strings. When given they must have
/// one entry per URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddSources {
    urls: Vec<String>,
    names: Option<Vec<String>>,
    subnames: Option<Vec<String>>,
}

impl AddSources {
    pub fn one(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            ..Default::default()
        }
    }

    pub fn many<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_subnames<I, S>(mut self, subnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subnames = Some(subnames.into_iter().map(Into::into).collect());
        self
    }

    /// `(url, name, subname)` rows; fails on length mismatch.
    fn into_rows(self) -> Result<Vec<(String, String, String)>> {
        let count = self.urls.len();
        let names = fill_column(self.names, count, "names")?;
        let subnames = fill_column(self.subnames, count, "subnames")?;

        Ok(self
            .urls
            .into_iter()
            .zip(names)
            .zip(subnames)
            .map(|((url, name), subname)| (url, name, subname))
            .collect())
    }
}

fn fill_column(column: Option<Vec<String>>, count: usize, what: &str) -> Result<Vec<String>> {
    match column {
        None => Ok(vec![String::new(); count]),
        Some(values) if values.len() == count => Ok(values),
        Some(values) => Err(FeederError::Validation(format!(
            "{} urls but {} {}",
            count,
            values.len(),
            what
        ))),
    }
}

impl From<&str> for AddSources {
    fn from(url: &str) -> Self {
        Self::one(url)
    }
}

impl From<String> for AddSources {
    fn from(url: String) -> Self {
        Self::one(url)
    }
}

impl From<Vec<String>> for AddSources {
    fn from(urls: Vec<String>) -> Self {
        Self::many(urls)
    }
}

impl From<Vec<&str>> for AddSources {
    fn from(urls: Vec<&str>) -> Self {
        Self::many(urls)
    }
}

/// Persistent, versioned collection of sources.
#[derive(Debug)]
pub struct SourceRegistry {
    version: String,
    sources: Vec<Source>,
    savefile_list: Vec<String>,
    savefile: Option<PathBuf>,
    state: RegistryState,
    data_dir: PathBuf,
    refresh: RefreshSettings,
}

impl SourceRegistry {
    /// Empty registry whose article files live in `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            sources: Vec::new(),
            savefile_list: Vec::new(),
            savefile: None,
            state: RegistryState::Fresh,
            data_dir: data_dir.into(),
            refresh: RefreshSettings::default(),
        }
    }

    pub fn with_refresh_settings(mut self, refresh: RefreshSettings) -> Self {
        self.refresh = refresh;
        self
    }

    /// Open the source list named by the configuration.
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_at(&config.data.sourcelist_path(), config)
    }

    /// Open the source list at `path`.
    ///
    /// An existing file is loaded; a missing one is created empty. A file
    /// that exists but cannot be loaded is an error unless
    /// `recreate_on_load_failure` is set, in which case it is replaced by an
    /// empty list after being backed up.
    pub fn open_at(path: &Path, config: &Config) -> Result<Self> {
        let mut registry = Self::new(&config.data.dir)
            .with_refresh_settings(RefreshSettings::from(&config.fetch));

        if !path.exists() {
            info!("Source list '{}' not found, creating it", path.display());
            registry.save(Some(path), &AlwaysConfirm)?;
            return Ok(registry);
        }

        match registry.load(path, &AlwaysConfirm) {
            Ok(()) => Ok(registry),
            Err(e) if config.data.recreate_on_load_failure => {
                warn!(
                    "Failed to load '{}' ({}), starting a new source list",
                    path.display(),
                    e
                );
                registry.save(Some(path), &AlwaysConfirm)?;
                Ok(registry)
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the registry's contents with the source list at `path`.
    ///
    /// Older schema versions are migrated in place once `confirm` agrees and
    /// the upgraded list is consistent; the original file is backed up as
    /// `<stem>_v<old version><ext>` first. A failed or declined load changes
    /// nothing on disk or in memory.
    pub fn load(&mut self, path: &Path, confirm: &impl Confirm) -> Result<()> {
        self.guard_unsaved(confirm)?;

        if !path.exists() {
            return Err(FeederError::NotFound(format!(
                "source list '{}'",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let versioned = VersionedSourceList::parse(&content)?;
        let old_version = (!versioned.version().is_current())
            .then(|| versioned.version_str().to_string());

        if let Some(old) = &old_version {
            let prompt = format!(
                "File '{}' version is v'{}' not current v'{}'; update to load?",
                path.display(),
                old,
                CURRENT_VERSION
            );
            if !confirm.confirm(&prompt) {
                return Err(FeederError::Cancelled(format!(
                    "'{}' was not migrated",
                    path.display()
                )));
            }
        }

        let file = versioned.upgrade();
        let descriptors = file.descriptors()?;
        if let Some(old) = &old_version {
            rewrite_migrated(path, old, &file)?;
        }

        let sources: Vec<Source> = descriptors
            .into_iter()
            .map(|descriptor| Source::from_descriptor(descriptor, &self.data_dir))
            .collect();

        info!(
            "Loaded {} source(s) from '{}'",
            sources.len(),
            path.display()
        );

        self.version = file.version;
        self.sources = sources;
        self.savefile_list = file.savefile_list;
        self.remember_savefile(path);
        self.state = RegistryState::Loaded;
        Ok(())
    }

    /// Write the source list to `path`, or to the remembered save file.
    ///
    /// An existing destination is overwritten only when `confirm` agrees, and
    /// only after a `.back_<name>` copy of it has been made.
    pub fn save(&mut self, path: Option<&Path>, confirm: &impl Confirm) -> Result<PathBuf> {
        let path = match path.map(Path::to_path_buf).or_else(|| self.savefile.clone()) {
            Some(path) => path,
            None => {
                return Err(FeederError::Validation(
                    "no save file given and none remembered".to_string(),
                ))
            }
        };

        let mut savefile_list = self.savefile_list.clone();
        let path_str = path.to_string_lossy().into_owned();
        if !savefile_list.contains(&path_str) {
            savefile_list.push(path_str);
        }

        let descriptors: Vec<_> = self.sources.iter().map(Source::descriptor).collect();
        let content = SourceListFile::from_descriptors(savefile_list.clone(), &descriptors).to_toml()?;

        if path.exists() {
            let prompt = format!("Destination '{}' already exists, overwrite?", path.display());
            if !confirm.confirm(&prompt) {
                info!("Not overwriting '{}'", path.display());
                return Err(FeederError::Cancelled(format!(
                    "'{}' was not overwritten",
                    path.display()
                )));
            }
            create_backup(&path, &backup_path(&path))?;
        }

        write_atomic(&path, content.as_bytes())
            .map_err(|e| FeederError::Save(format!("failed to write '{}': {}", path.display(), e)))?;
        if !path.exists() {
            return Err(FeederError::Save(format!(
                "'{}' does not exist after writing",
                path.display()
            )));
        }

        info!("Saved {} source(s) to '{}'", self.sources.len(), path.display());
        self.version = CURRENT_VERSION.to_string();
        self.savefile = Some(path.clone());
        self.savefile_list = savefile_list;
        self.state = RegistryState::Saved;
        Ok(path)
    }

    /// Forget every source and the save history.
    pub fn reset(&mut self, confirm: &impl Confirm) -> Result<()> {
        self.guard_unsaved(confirm)?;

        self.version = CURRENT_VERSION.to_string();
        self.sources.clear();
        self.savefile_list.clear();
        self.savefile = None;
        self.state = RegistryState::Fresh;
        info!("Registry reset");
        Ok(())
    }

    /// Add sources whose URL answers the reachability check.
    ///
    /// Unreachable URLs are skipped. Returns true only when every URL was
    /// added. A names/subnames length mismatch fails before anything is
    /// added.
    pub async fn add<P: ReachabilityCheck>(
        &mut self,
        batch: impl Into<AddSources>,
        checker: &P,
    ) -> Result<bool> {
        let rows = batch.into().into_rows()?;

        let mut all_added = true;
        for (url, name, subname) in rows {
            if !checker.is_reachable(url.trim()).await {
                warn!("'{}' is not reachable, skipping it", url);
                all_added = false;
                continue;
            }
            self.push_source(&url, name, subname);
        }

        self.state = RegistryState::Mutated;
        Ok(all_added)
    }

    /// Add sources without checking that they are reachable.
    pub fn add_unchecked(&mut self, batch: impl Into<AddSources>) -> Result<bool> {
        let rows = batch.into().into_rows()?;
        for (url, name, subname) in rows {
            self.push_source(&url, name, subname);
        }

        self.state = RegistryState::Mutated;
        Ok(true)
    }

    fn push_source(&mut self, url: &str, name: String, subname: String) {
        let source = Source::new(url, name, subname, &self.data_dir);
        info!("Added '{}' ({})", source.display_name(), source.url());
        self.sources.push(source);
    }

    /// Remove the selected sources after `confirm` agrees.
    ///
    /// Positions refer to the list before the call; they are removed from
    /// the highest down. Returns the removed sources in removal order.
    pub fn delete(
        &mut self,
        selection: impl Into<Selection>,
        confirm: &impl Confirm,
    ) -> Result<Vec<Source>> {
        let mut indices = selection.into().resolve(self.sources.len())?;

        let lines: Vec<String> = indices
            .iter()
            .map(|&index| format_entry(index, &self.sources[index]))
            .collect();
        let prompt = format!("Delete the following source(s)?\n{}", lines.join("\n"));
        if !confirm.confirm(&prompt) {
            return Err(FeederError::Cancelled("nothing was deleted".to_string()));
        }

        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();

        let mut removed = Vec::with_capacity(indices.len());
        for index in indices {
            let source = self.sources.remove(index);
            info!("Deleted '{}' ({})", source.display_name(), source.url());
            removed.push(source);
        }

        self.state = RegistryState::Mutated;
        Ok(removed)
    }

    /// One formatted line per selected source, in selection order.
    pub fn list(&self, selection: impl Into<Selection>) -> Result<Vec<String>> {
        let indices = selection.into().resolve(self.sources.len())?;
        Ok(indices
            .into_iter()
            .map(|index| format_entry(index, &self.sources[index]))
            .collect())
    }

    /// Refresh every source, at most `max_concurrent` at a time.
    ///
    /// Each fetch is bounded by the refresh timeout; a fetch that runs over
    /// counts as a failure of that source only. Results are applied to
    /// their source as they arrive, and valid sources save their articles.
    pub async fn refresh_all<G: FetchGateway>(&mut self, gateway: &G) -> RefreshSummary {
        let RefreshSettings {
            max_concurrent,
            timeout,
        } = self.refresh;
        let jobs: Vec<(usize, String)> = self
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| (index, source.url().to_string()))
            .collect();

        let mut outcomes = stream::iter(jobs)
            .map(move |(index, url)| async move {
                let outcome = match tokio::time::timeout(timeout, gateway.fetch(&url)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FeederError::Fetch(format!(
                        "timed out after {}s",
                        timeout.as_secs_f64()
                    ))),
                };
                (index, outcome)
            })
            .buffer_unordered(max_concurrent.max(1));

        let mut summary = RefreshSummary::default();
        let mut failed = Vec::new();
        let mut save_failed = Vec::new();
        while let Some((index, outcome)) = outcomes.next().await {
            summary.attempted += 1;
            let source = &mut self.sources[index];
            if !source.apply_fetch(outcome) {
                failed.push(index);
                continue;
            }

            summary.valid += 1;
            match source.save_articles() {
                Ok(added) => debug!("'{}': {} new article(s) on disk", source.url(), added),
                Err(e) => {
                    warn!(
                        "Failed to save articles of '{}' to '{}': {}",
                        source.url(),
                        source.filename().display(),
                        e
                    );
                    save_failed.push(index);
                }
            }
        }

        summary.failed = self.urls_in_order(failed);
        summary.save_failed = self.urls_in_order(save_failed);

        info!(
            "Refreshed {} source(s): {} valid, {} failed, {} not saved",
            summary.attempted,
            summary.valid,
            summary.failed.len(),
            summary.save_failed.len()
        );
        summary
    }

    /// Merge every source's article file into memory.
    pub fn load_articles(&mut self) -> usize {
        self.sources.iter_mut().map(Source::load_articles).sum()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.state == RegistryState::Mutated
    }

    pub fn savefile(&self) -> Option<&Path> {
        self.savefile.as_deref()
    }

    /// Every path the source list has been saved to.
    pub fn savefile_list(&self) -> &[String] {
        &self.savefile_list
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn info(&self) -> RegistryInfo {
        RegistryInfo {
            version: self.version.clone(),
            count: self.sources.len(),
            savefile: self.savefile.clone(),
            unsaved: self.has_unsaved_changes(),
        }
    }

    fn urls_in_order(&self, mut indices: Vec<usize>) -> Vec<String> {
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|index| self.sources[index].url().to_string())
            .collect()
    }

    fn guard_unsaved(&self, confirm: &impl Confirm) -> Result<()> {
        if self.has_unsaved_changes() && !confirm.confirm(UNSAVED_PROMPT) {
            return Err(FeederError::Cancelled("unsaved changes kept".to_string()));
        }
        Ok(())
    }

    fn remember_savefile(&mut self, path: &Path) {
        let path_str = path.to_string_lossy().into_owned();
        if !self.savefile_list.contains(&path_str) {
            self.savefile_list.push(path_str);
        }
        self.savefile = Some(path.to_path_buf());
    }
}

/// Summary of a registry for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInfo {
    pub version: String,
    pub count: usize,
    pub savefile: Option<PathBuf>,
    pub unsaved: bool,
}

impl fmt::Display for RegistryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Version:   {}", self.version)?;
        writeln!(f, "Sources:   {}", self.count)?;
        match &self.savefile {
            Some(path) => writeln!(f, "Save file: {}", path.display())?,
            None => writeln!(f, "Save file: (none)")?,
        }
        write!(f, "Unsaved:   {}", if self.unsaved { "yes" } else { "no" })
    }
}

/// `"   3 : Name - Subname                              http://..."`.
pub fn format_entry(index: usize, source: &Source) -> String {
    format!(
        "{:>4} : {:<40.40}   {:<60.60}",
        index,
        source.display_name(),
        source.url()
    )
}

/// Back up an old-version source list and replace it with its upgrade.
///
/// `migrated` must already have passed the consistency check.
fn rewrite_migrated(path: &Path, old_version: &str, migrated: &SourceListFile) -> Result<()> {
    let content = migrated.to_toml()?;

    let backup = versioned_backup_path(path, old_version);
    create_backup(path, &backup)?;
    write_atomic(path, content.as_bytes())?;

    info!(
        "Migrated '{}' from version {} to {} (backup '{}')",
        path.display(),
        old_version,
        migrated.version,
        backup.display()
    );
    Ok(())
}
