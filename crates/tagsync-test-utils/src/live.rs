//! [`MemoryLiveTree`]: an in-memory tag provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tagsync_core::{LiveError, LiveTreeAdapter};
use tagsync_tree::{ConfigNode, TagPath, TreeEditor};

/// One mutating call the tree received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCall {
    Write(TagPath),
    Remove(TagPath),
}

#[derive(Debug)]
struct State {
    editor: TreeEditor,
    calls: Vec<LiveCall>,
    failures: HashMap<TagPath, LiveError>,
    read_failure: Option<LiveError>,
    /// Remaining mutations before the provider goes away
    budget: Option<usize>,
}

/// Live tree held in memory, with failure injection.
///
/// Clones share the same tree, so a test can keep a handle after giving
/// one to an orchestrator and inspect or edit the tree behind its back.
///
/// # Example
///
/// ```rust,no_run
/// use tagsync_test_utils::{MemoryLiveTree, fixtures};
///
/// let live = MemoryLiveTree::new("default", fixtures::plant());
/// live.fail_at("Line1/Speed", tagsync_core::LiveError::permission_denied("Line1/Speed"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLiveTree {
    provider: String,
    state: Arc<Mutex<State>>,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

impl MemoryLiveTree {
    pub fn new(provider: impl Into<String>, root: ConfigNode) -> Self {
        Self {
            provider: provider.into(),
            state: Arc::new(Mutex::new(State {
                editor: TreeEditor::from_owned(root),
                calls: Vec::new(),
                failures: HashMap::new(),
                read_failure: None,
                budget: None,
            })),
            read_delay: None,
            write_delay: None,
        }
    }

    /// An empty provider named `default`.
    pub fn empty() -> Self {
        Self::new("default", ConfigNode::root())
    }

    /// Delay every read by `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Delay every write or removal by `delay`.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Current tree.
    pub fn snapshot(&self) -> ConfigNode {
        self.lock().editor.tree().clone()
    }

    /// Replace the whole tree, as an operator would between two runs.
    pub fn replace(&self, root: ConfigNode) {
        self.lock().editor = TreeEditor::from_owned(root);
    }

    /// Change the tree directly, bypassing the adapter.
    pub fn edit(&self, change: impl FnOnce(&mut ConfigNode)) {
        let mut state = self.lock();
        let mut root = state.editor.tree().clone();
        change(&mut root);
        state.editor = TreeEditor::from_owned(root);
    }

    /// Fail every write or removal at `path` with `error`.
    pub fn fail_at(&self, path: &str, error: LiveError) {
        let path = TagPath::parse(path).unwrap();
        self.lock().failures.insert(path, error);
    }

    /// Fail every read with `error`.
    pub fn fail_reads(&self, error: LiveError) {
        self.lock().read_failure = Some(error);
    }

    /// Accept `mutations` more writes or removals, then report the provider
    /// unavailable for every call.
    pub fn unavailable_after(&self, mutations: usize) {
        self.lock().budget = Some(mutations);
    }

    /// Every mutating call received so far.
    pub fn calls(&self) -> Vec<LiveCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Check injected failures for `path` and record the call.
    fn admit(state: &mut State, call: LiveCall, path: &TagPath) -> Result<(), LiveError> {
        match state.budget {
            Some(0) => return Err(LiveError::unavailable("provider went offline")),
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        state.calls.push(call);
        match state.failures.get(path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn classify(path: &TagPath, error: tagsync_tree::Error) -> LiveError {
    match error {
        tagsync_tree::Error::NotFound { .. } => LiveError::not_found(path),
        tagsync_tree::Error::MissingParent { .. } => {
            LiveError::not_found(path.parent().unwrap_or_default())
        }
        other => LiveError::type_conflict(path, other.to_string()),
    }
}

#[async_trait]
impl LiveTreeAdapter for MemoryLiveTree {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn read_subtree(&self, path: &TagPath) -> Result<ConfigNode, LiveError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.lock();
        if let Some(error) = &state.read_failure {
            return Err(error.clone());
        }
        if state.budget == Some(0) {
            return Err(LiveError::unavailable("provider went offline"));
        }
        state
            .editor
            .tree()
            .get(path)
            .cloned()
            .ok_or_else(|| LiveError::not_found(path))
    }

    async fn write_node(&self, path: &TagPath, node: &ConfigNode) -> Result<(), LiveError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        Self::admit(&mut state, LiveCall::Write(path.clone()), path)?;

        let editor = &mut state.editor;
        if !editor.tree().contains(path) {
            return editor
                .insert(path, node.clone())
                .map_err(|err| classify(path, err));
        }

        let created: Vec<ConfigNode> = match editor.tree().get(path) {
            Some(existing) => node
                .children()
                .filter(|child| existing.child(child.name()).is_none())
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        editor.update(path, node).map_err(|err| classify(path, err))?;
        for child in created {
            let child_path = path.child(child.name());
            editor
                .insert(&child_path, child)
                .map_err(|err| classify(&child_path, err))?;
        }
        Ok(())
    }

    async fn remove_node(&self, path: &TagPath) -> Result<(), LiveError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        Self::admit(&mut state, LiveCall::Remove(path.clone()), path)?;
        state
            .editor
            .remove(path)
            .map(drop)
            .map_err(|err| classify(path, err))
    }
}
