use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use log::{info, warn};

/// Key under which the active task id is persisted.
pub const CURRENT_TASK_KEY: &str = "current_task_id";

/// Durable key/value storage that survives restarts.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>>;
    fn remove(&mut self, key: &str) -> Result<(), Box<dyn Error>>;
}

/// Flat TOML table on disk. A missing file reads as empty.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        let table: BTreeMap<String, String> = toml::from_str(&text)?;
        Ok(table)
    }

    fn write_table(&self, table: &BTreeMap<String, String>) -> Result<(), Box<dyn Error>> {
        let toml_str = toml::to_string_pretty(table)?;
        // replaced atomically
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, toml_str)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!("Cannot remove {}: {e}", tmp.display());
            }
            return Err(err.into());
        }
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self.read_table()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), value.to_string());
        self.write_table(&table)
    }

    fn remove(&mut self, key: &str) -> Result<(), Box<dyn Error>> {
        let mut table = self.read_table()?;
        if table.remove(key).is_some() {
            self.write_table(&table)?;
        }
        Ok(())
    }
}

/// In-process store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Box<dyn Error>> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Identity of the in-flight task, mirrored into durable storage.
///
/// `current_task_id` is set while the last known state is PENDING or
/// PROGRESS and cleared on COMPLETED, FAILED or a successful cancel.
pub struct ClientTaskSession {
    current_task_id: Option<String>,
    store: Box<dyn SessionStore>,
}

impl ClientTaskSession {
    /// Restores the session persisted by a previous run.
    pub fn load(store: Box<dyn SessionStore>) -> Result<Self, Box<dyn Error>> {
        let current_task_id = store.get(CURRENT_TASK_KEY)?;
        if let Some(id) = &current_task_id {
            info!("Restored active task {id}");
        }
        Ok(Self {
            current_task_id,
            store,
        })
    }

    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    pub fn has_active_task(&self) -> bool {
        self.current_task_id.is_some()
    }

    pub fn begin(&mut self, task_id: impl Into<String>) -> Result<(), Box<dyn Error>> {
        let task_id = task_id.into();
        info!("Tracking task {task_id}");
        self.current_task_id = Some(task_id.clone());
        self.store.set(CURRENT_TASK_KEY, &task_id)
    }

    /// Drops the id from memory, then from the store.
    pub fn clear(&mut self) -> Result<(), Box<dyn Error>> {
        if let Some(id) = self.current_task_id.take() {
            info!("Released task {id}");
        }
        self.store.remove(CURRENT_TASK_KEY)
    }
}
