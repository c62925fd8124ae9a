//! Mock construction helpers

use dataprep_rs::action::{
    Action, ActionContext, ActionError, ActionRegistry, ActionScope, Behavior, BehaviorSet,
};
use dataprep_rs::types::{Row, RowMetadata};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Value that makes [`Fragile`] fail
pub const FAIL_VALUE: &str = "boom";
/// Value that makes [`Fragile`] panic
pub const PANIC_VALUE: &str = "panic";

/// Uppercases column `0000`; fails on `boom`, panics on `panic`.
///
/// Scribbles on the row before failing so that a leaked partial edit shows.
pub struct Fragile;

impl Action for Fragile {
    fn name(&self) -> &'static str {
        "fragile"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::ValuesColumn])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        &[ActionScope::Dataset]
    }

    fn apply(
        &self,
        row: &mut Row,
        _metadata: &RowMetadata,
        _ctx: &ActionContext,
    ) -> Result<(), ActionError> {
        let value = row.get("0000").unwrap_or("").to_string();
        row.set("0000", "partial");
        match value.as_str() {
            FAIL_VALUE => Err(ActionError::Failed("refused".to_string())),
            PANIC_VALUE => panic!("fragile action panicked"),
            _ => {
                row.set("0000", value.to_uppercase());
                Ok(())
            }
        }
    }
}

fn fragile() -> Arc<dyn Action> {
    Arc::new(Fragile)
}

/// Built-in actions plus `fragile`
pub fn registry_with_fragile() -> ActionRegistry {
    let mut registry = ActionRegistry::builtin();
    registry.register("fragile", fragile);
    registry
}

/// `Write` into a buffer the test keeps a handle on
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `Write` that fails every call
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }
}
