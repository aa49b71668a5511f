//! Purpose: The extension component: handle table, config, and the native call surface.
//! Exports: `Extension`, `load`, `unload`, `with`, `is_loaded`.
//! Role: Every native (`JSON.FromString`, `JSON.GetInt`, ...) is one method here.
//! Invariants: Documents are reachable only through handles; `close` is the only delete path.
//! Invariants: The process-wide instance is installed once by `load` and released by `unload`.
//! Notes: The mutex only makes the static `Sync`; hosts call from one thread.
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::config::Config;
use crate::core::document::Document;
use crate::core::error::{Error, ErrorKind};
use crate::core::handles::{Handle, HandleTable};
use crate::core::kind::JsonType;

pub type ExtResult<T> = Result<T, Error>;

static INSTANCE: Mutex<Registry> = Mutex::new(Registry {
    ext: None,
    retired: None,
});

/// The loaded instance, plus the drained handle table of the previous one so
/// serials keep advancing across unload/load.
struct Registry {
    ext: Option<Extension>,
    retired: Option<HandleTable>,
}

#[derive(Debug)]
pub struct Extension {
    handles: HandleTable,
    config: Config,
}

impl Extension {
    pub fn new(config: Config) -> Self {
        Self {
            handles: HandleTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    pub fn document(&self, handle: Handle) -> ExtResult<&Document> {
        self.handles.get(handle)
    }

    pub fn create(&mut self) -> ExtResult<Handle> {
        self.handles.insert(Document::new())
    }

    pub fn from_string(&mut self, text: &str) -> ExtResult<Handle> {
        let doc = Document::parse(text)?;
        self.handles.insert(doc)
    }

    pub fn from_file(&mut self, path: &str) -> ExtResult<Handle> {
        let doc = Document::load(self.config.resolve(path))?;
        self.handles.insert(doc)
    }

    pub fn to_string(&self, handle: Handle, indent: i32) -> ExtResult<String> {
        self.handles.get(handle)?.print(indent)
    }

    pub fn to_file(&self, handle: Handle, path: &str, indent: i32) -> ExtResult<()> {
        self.handles.get(handle)?.save(self.config.resolve(path), indent)
    }

    /// Issues a new handle owning a copy of the value at `key`.
    pub fn get(&mut self, handle: Handle, key: &str) -> ExtResult<Handle> {
        let child = self.handles.get(handle)?.get(key)?;
        self.handles.insert(child)
    }

    pub fn get_bool(&self, handle: Handle, key: &str) -> ExtResult<bool> {
        self.handles.get(handle)?.get_bool(key)
    }

    pub fn get_float(&self, handle: Handle, key: &str) -> ExtResult<f64> {
        self.handles.get(handle)?.get_float(key)
    }

    pub fn get_int(&self, handle: Handle, key: &str) -> ExtResult<i32> {
        self.handles.get(handle)?.get_int(key)
    }

    pub fn get_int64(&self, handle: Handle, key: &str) -> ExtResult<i64> {
        self.handles.get(handle)?.get_int64(key)
    }

    pub fn get_string(&self, handle: Handle, key: &str) -> ExtResult<&str> {
        self.handles.get(handle)?.get_string(key)
    }

    pub fn is_null(&self, handle: Handle, key: &str) -> ExtResult<bool> {
        self.handles.get(handle)?.is_null(key)
    }

    pub fn has_key(&self, handle: Handle, key: &str) -> ExtResult<bool> {
        Ok(self.handles.get(handle)?.has_key(key))
    }

    pub fn set_string(&mut self, handle: Handle, key: &str, value: &str) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.set_string(key, value)
    }

    pub fn set_int(&mut self, handle: Handle, key: &str, value: i32) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.set_int(key, value)
    }

    pub fn set_int64(&mut self, handle: Handle, key: &str, value: i64) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.set_int64(key, value)
    }

    pub fn set_bool(&mut self, handle: Handle, key: &str, value: bool) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.set_bool(key, value)
    }

    pub fn set_float(&mut self, handle: Handle, key: &str, value: f64) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.set_float(key, value)
    }

    /// Upserts `key` with the JSON text `value`.
    pub fn write(&mut self, handle: Handle, key: &str, value: &str) -> ExtResult<bool> {
        let value: Value = Document::parse(value)
            .map_err(|err| err.with_key(key))?
            .into_value();
        self.handles.get_mut(handle)?.write(key, value)
    }

    pub fn write_float(&mut self, handle: Handle, key: &str, value: f64) -> ExtResult<bool> {
        self.handles.get_mut(handle)?.write_float(key, value)
    }

    pub fn set(&mut self, handle: Handle, key: &str, other: Handle) -> ExtResult<bool> {
        let other = self.handles.get(other)?.clone();
        self.handles.get_mut(handle)?.set(key, &other)
    }

    pub fn remove(&mut self, handle: Handle, key: &str) -> ExtResult<()> {
        self.handles.get_mut(handle)?.remove_key(key);
        Ok(())
    }

    pub fn clear(&mut self, handle: Handle) -> ExtResult<()> {
        self.handles.get_mut(handle)?.clear();
        Ok(())
    }

    pub fn get_type(&self, handle: Handle) -> ExtResult<JsonType> {
        Ok(self.handles.get(handle)?.kind())
    }

    pub fn size(&self, handle: Handle) -> ExtResult<usize> {
        Ok(self.handles.get(handle)?.size())
    }

    pub fn close(&mut self, handle: Handle) -> ExtResult<()> {
        self.handles.remove(handle).map(drop)
    }

    /// Releases every live document; returns how many were released.
    pub fn shutdown(&mut self) -> usize {
        self.handles.drain()
    }
}

/// Installs the process-wide instance. Loading twice keeps the first instance.
pub fn load(config: Config) -> bool {
    let mut registry = lock();
    if registry.ext.is_some() {
        tracing::warn!("extension already loaded");
        return false;
    }
    tracing::info!(base_dir = %config.base_dir().display(), "extension loaded");
    let handles = registry.retired.take().unwrap_or_default();
    registry.ext = Some(Extension { handles, config });
    true
}

/// Drops the process-wide instance and every document it owns.
pub fn unload() -> usize {
    let mut registry = lock();
    let Some(mut ext) = registry.ext.take() else {
        return 0;
    };
    let released = ext.shutdown();
    registry.retired = Some(ext.handles);
    tracing::info!(released, "extension unloaded");
    released
}

pub fn is_loaded() -> bool {
    lock().ext.is_some()
}

pub fn with<T>(f: impl FnOnce(&mut Extension) -> ExtResult<T>) -> ExtResult<T> {
    let mut registry = lock();
    let ext = registry
        .ext
        .as_mut()
        .ok_or_else(|| Error::new(ErrorKind::Usage).with_message("extension not loaded"))?;
    f(ext)
}

fn lock() -> MutexGuard<'static, Registry> {
    // A panic inside `with` leaves the table itself consistent.
    INSTANCE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
