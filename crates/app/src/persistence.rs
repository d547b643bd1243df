//! Storage collaborator: expenses, settings and budgets as JSON files.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use engine::{Budget, Expense};
use serde::{Serialize, de::DeserializeOwned};
use store::{Middleware, MiddlewareContext};

use crate::{
    error::Result,
    state::{Settings, StateKey, StateValue},
};

const EXPENSES_FILE: &str = "expenses.json";
const SETTINGS_FILE: &str = "settings.json";
const BUDGETS_FILE: &str = "budgets.json";

/// Loads and saves the persisted slots.
///
/// Implementations never report failures to the caller: a failed load
/// yields the default value, a failed save is logged.
pub trait Persistence: Send + Sync {
    fn load_expenses(&self) -> Vec<Expense>;
    fn save_expenses(&self, expenses: &[Expense]);
    fn load_settings(&self) -> Settings;
    fn save_settings(&self, settings: &Settings);
    fn load_budgets(&self) -> Vec<Budget>;
    fn save_budgets(&self, budgets: &[Budget]);
}

/// One pretty-printed JSON file per slot under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFiles {
    dir: PathBuf,
}

impl JsonFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_or_default<T>(&self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.dir.join(name);
        match read_json(&path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!(path = %path.display(), "no data file yet");
                T::default()
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read data file: {err}");
                T::default()
            }
        }
    }

    fn write_or_log<T>(&self, name: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let path = self.dir.join(name);
        match write_json(&path, value) {
            Ok(()) => tracing::debug!(path = %path.display(), "data file saved"),
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to save data file: {err}");
            }
        }
    }
}

impl Persistence for JsonFiles {
    fn load_expenses(&self) -> Vec<Expense> {
        self.read_or_default(EXPENSES_FILE)
    }

    fn save_expenses(&self, expenses: &[Expense]) {
        self.write_or_log(EXPENSES_FILE, expenses);
    }

    fn load_settings(&self) -> Settings {
        self.read_or_default(SETTINGS_FILE)
    }

    fn save_settings(&self, settings: &Settings) {
        self.write_or_log(SETTINGS_FILE, settings);
    }

    fn load_budgets(&self) -> Vec<Budget> {
        self.read_or_default(BUDGETS_FILE)
    }

    fn save_budgets(&self, budgets: &[Budget]) {
        self.write_or_log(BUDGETS_FILE, budgets);
    }
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Writes through a temporary sibling file so a crash never leaves a
/// truncated data file behind.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(value)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload)?;
    if fs::rename(&tmp, path).is_err() {
        fs::copy(&tmp, path)?;
        if let Err(err) = fs::remove_file(&tmp) {
            tracing::debug!(path = %tmp.display(), "failed to remove temporary file: {err}");
        }
    }
    Ok(())
}

/// Saves the expenses, settings and budgets slots whenever one is set.
///
/// Batch updates bypass middleware, so installing loaded data does not
/// write it straight back.
pub struct Autosave {
    persistence: Arc<dyn Persistence>,
}

impl Autosave {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

impl Middleware<StateKey, StateValue> for Autosave {
    fn on_set(&self, ctx: &MiddlewareContext<'_, StateKey, StateValue>) {
        match ctx.new_value {
            StateValue::Expenses(expenses) => self.persistence.save_expenses(expenses),
            StateValue::Settings(settings) => self.persistence.save_settings(settings),
            StateValue::Budgets(budgets) => self.persistence.save_budgets(budgets),
            StateValue::Filters(_) | StateValue::CurrentView(_) | StateValue::IsLoading(_) => {}
        }
    }
}
