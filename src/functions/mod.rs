use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RequestParams;
use crate::reporter::Reporter;

/// One invocation of a block tag, as handed over by the host engine.
///
/// The host calls a block twice: once at the opening tag (`content` is
/// `None`) and, unless the block cleared `repeat`, once more at the closing
/// tag with the rendered inner content.
pub struct BlockCall<'a> {
    pub params: &'a Map<String, Value>,
    pub content: Option<&'a str>,
    pub repeat: &'a mut bool,
    pub request: &'a RequestParams,
    pub reporter: &'a dyn Reporter,
}

/// Trait for pluggable block functions.
pub trait BlockFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn invoke(&self, call: BlockCall<'_>) -> Option<String>;
}

/// Thread-safe block function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn BlockFunction>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut map: HashMap<&'static str, Arc<dyn BlockFunction>> = HashMap::new();
        let timeperiod = crate::block::TimePeriodBlock::default();
        map.insert(timeperiod.name(), Arc::new(timeperiod));
        Self { inner: Arc::new(map) }
    }

    pub fn register<F: BlockFunction + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BlockFunction>> {
        self.inner.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
