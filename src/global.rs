//! Process-wide registry for callers that don't thread a [`LoggerRegistry`]
//! through their code.
//!
//! The first successful initialization wins. Later calls, including
//! concurrent ones, get the registry that is already installed and their
//! settings are ignored. Any accessor that finds no registry initializes one
//! from the environment (see [`Settings::from_env`]).

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::sink::Category;
use crate::{LoggerRegistry, Result, Settings, StructuredLogger};

static REGISTRY: Lazy<Mutex<Option<LoggerRegistry>>> = Lazy::new(|| Mutex::new(None));

fn slot() -> MutexGuard<'static, Option<LoggerRegistry>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install a registry built from `settings` unless one is already installed.
pub fn initialize(settings: Settings) -> Result<LoggerRegistry> {
    initialize_with(|| LoggerRegistry::new(settings))
}

/// Install the registry produced by `build` unless one is already installed.
///
/// `build` runs at most once per installation and only while holding the
/// global lock, so concurrent callers never build two registries.
pub fn initialize_with(build: impl FnOnce() -> Result<LoggerRegistry>) -> Result<LoggerRegistry> {
    let mut slot = slot();
    if let Some(registry) = slot.as_ref() {
        return Ok(registry.clone());
    }
    let registry = build()?;
    *slot = Some(registry.clone());
    Ok(registry)
}

/// The installed registry, if any. Never initializes.
pub fn registry() -> Option<LoggerRegistry> {
    slot().clone()
}

fn ensure() -> Result<LoggerRegistry> {
    initialize_with(|| LoggerRegistry::new(Settings::from_env()?))
}

pub fn get_logger(name: &str, category: Category, sublog: Option<&str>) -> Result<StructuredLogger> {
    ensure()?.get_logger(name, category, sublog)
}

pub fn app_logger(name: &str) -> Result<StructuredLogger> {
    ensure()?.app_logger(name)
}

pub fn error_logger(name: &str) -> Result<StructuredLogger> {
    ensure()?.error_logger(name)
}

pub fn debug_logger(name: &str, sublog: Option<&str>) -> Result<StructuredLogger> {
    ensure()?.debug_logger(name, sublog)
}

pub fn security_logger(name: &str) -> Result<StructuredLogger> {
    ensure()?.security_logger(name)
}

/// Force a rotation check on the installed registry. Returns `false` when
/// nothing is installed or no rotation happened.
pub fn force_rotation_check() -> bool {
    registry().is_some_and(|r| r.force_rotation_check())
}

/// Categories used on the installed registry; empty when nothing is
/// installed.
pub fn used_categories() -> BTreeSet<String> {
    registry().map(|r| r.used_categories()).unwrap_or_default()
}

/// Uninstall the registry and stop its scheduler. Loggers already handed
/// out keep writing to their files.
pub fn reset() {
    let previous = slot().take();
    if let Some(registry) = previous {
        registry.shutdown();
    }
}
