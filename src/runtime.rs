//! The screen-flow runtime: authoritative state for one explored flow.
//!
//! Commands apply synchronously and atomically; the only suspension point is
//! the document fetch inside [`ScreenFlowRuntime::load`]. Derived fields are
//! recomputed from their dependencies on every change.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::derive::{self, FlowTreeIndex};
use crate::model::{FlowTree, FlowTreeNode, Hotspot, NodeRef, Project, ProjectOrientation, ScreenId};
use crate::source::{DocumentSource, SourceError};
use crate::store::{Store, Subscription};

pub const MIN_SCREEN_SIZE: u8 = 1;
pub const MAX_SCREEN_SIZE: u8 = 5;

#[derive(Debug, Clone)]
pub struct FlowState {
    pub is_loading: bool,
    pub load_error: Option<String>,
    pub project: Option<Project>,
    pub project_orientation: Option<ProjectOrientation>,
    pub tree: Option<Arc<FlowTree>>,
    pub tree_index: Option<Arc<FlowTreeIndex>>,
    pub selected_node: Option<NodeRef>,
    pub screen_size: u8,
    pub reachable_screen_count: usize,
    pub unreachable_screen_count: usize,
    pub related_image_urls: Arc<[String]>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            is_loading: false,
            load_error: None,
            project: None,
            project_orientation: None,
            tree: None,
            tree_index: None,
            selected_node: None,
            screen_size: MIN_SCREEN_SIZE,
            reachable_screen_count: 0,
            unreachable_screen_count: 0,
            related_image_urls: Arc::from([]),
        }
    }
}

impl FlowState {
    /// Same zoom level, nothing loaded, nothing selected.
    fn cleared(&self) -> Self {
        Self {
            screen_size: self.screen_size,
            ..Self::default()
        }
    }

    fn with_tree(&self, project: Project, orientation: ProjectOrientation, tree: FlowTree) -> Self {
        let tree = Arc::new(tree);
        let tree_index = derive::tree_index(Some(&*tree));
        Self {
            is_loading: false,
            load_error: None,
            project: Some(project),
            project_orientation: Some(orientation),
            reachable_screen_count: derive::reachable_screen_count(Some(&*tree)),
            unreachable_screen_count: derive::unreachable_screen_count(Some(&*tree)),
            related_image_urls: derive::related_image_urls(None, tree_index.as_deref()),
            selected_node: None,
            tree_index,
            tree: Some(tree),
            screen_size: self.screen_size,
        }
    }

    fn with_selection(&self, selected: Option<NodeRef>) -> Self {
        Self {
            related_image_urls: derive::related_image_urls(
                selected.as_ref(),
                self.tree_index.as_deref(),
            ),
            selected_node: selected,
            ..self.clone()
        }
    }

    pub fn find_node(&self, id: ScreenId) -> Option<&NodeRef> {
        self.tree_index.as_ref()?.get(&id)
    }
}

/// How a finished load affected the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// Another load populated the state first; this result was dropped.
    Superseded,
}

pub struct ScreenFlowRuntime<S> {
    source: Arc<S>,
    store: Store<FlowState>,
    /// Bumped by every `load`; a failure is only reported by the latest one.
    generation: Arc<AtomicU64>,
}

impl<S> Clone for ScreenFlowRuntime<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: self.store.clone(),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<S: DocumentSource> ScreenFlowRuntime<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            store: Store::new(FlowState::default()),
            generation: Arc::default(),
        }
    }

    // ---
    // Commands
    // ---

    /// Clears the current flow and loads the given document version.
    ///
    /// If another load populates the state while this one is fetching, the
    /// late result is discarded and [`LoadOutcome::Superseded`] is returned.
    /// A failure is reported in the state only while no later load has been
    /// started; otherwise the later load owns `is_loading`.
    pub async fn load(&self, version: u32) -> Result<LoadOutcome, SourceError> {
        info!(version, "loading flow document");
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.modify(|state| {
            Some(FlowState {
                is_loading: true,
                ..state.cleared()
            })
        });

        let fetched = self.source.fetch(version).await;

        let mut outcome = LoadOutcome::Superseded;
        match fetched {
            Ok(document) => {
                self.store.modify(|state| {
                    if state.project.is_some() {
                        return None;
                    }
                    outcome = LoadOutcome::Applied;
                    Some(state.with_tree(
                        document.project,
                        document.project_orientation,
                        document.tree,
                    ))
                });
                match outcome {
                    LoadOutcome::Applied => {
                        let state = self.store.snapshot();
                        info!(
                            version,
                            reachable = state.reachable_screen_count,
                            unreachable = state.unreachable_screen_count,
                            "flow document loaded"
                        );
                    }
                    LoadOutcome::Superseded => {
                        debug!(version, "discarding superseded flow document")
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                let message = err.to_string();
                let reported = self.store.modify(|state| {
                    let latest = self.generation.load(Ordering::SeqCst) == generation;
                    if !latest || state.project.is_some() {
                        return None;
                    }
                    Some(FlowState {
                        is_loading: false,
                        load_error: Some(message),
                        ..state.clone()
                    })
                });
                if reported {
                    warn!(version, error = %err, "flow document failed to load");
                } else {
                    debug!(version, error = %err, "ignoring failure of superseded load");
                }
                Err(err)
            }
        }
    }

    /// Selects the node with the given id. Returns `false`, changing nothing,
    /// when the id is not in the current index.
    pub fn select_screen_id(&self, id: ScreenId) -> bool {
        let selected = self.store.modify(|state| {
            let node = state.find_node(id)?;
            Some(state.with_selection(Some(Arc::clone(node))))
        });
        if !selected {
            debug!(screen_id = id, "no such screen in the flow index");
        }
        selected
    }

    pub fn select_hotspot(&self, hotspot: &Hotspot) -> bool {
        self.select_screen_id(hotspot.target_screen_id)
    }

    pub fn select_tree_node(&self, node: &FlowTreeNode) -> bool {
        self.select_screen_id(node.id)
    }

    pub fn unselect_tree_node(&self) {
        self.store.modify(|state| {
            state.selected_node.as_ref()?;
            Some(state.with_selection(None))
        });
    }

    pub fn zoom_in(&self) {
        self.store.modify(|state| {
            (state.screen_size < MAX_SCREEN_SIZE).then(|| FlowState {
                screen_size: state.screen_size + 1,
                ..state.clone()
            })
        });
    }

    pub fn zoom_out(&self) {
        self.store.modify(|state| {
            (state.screen_size > MIN_SCREEN_SIZE).then(|| FlowState {
                screen_size: state.screen_size - 1,
                ..state.clone()
            })
        });
    }

    // ---
    // Queries
    // ---

    pub fn snapshot(&self) -> Arc<FlowState> {
        self.store.snapshot()
    }

    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&FlowState) + Send + 'static,
    {
        self.store.subscribe(on_change)
    }

    pub fn watch_loading<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&bool) + Send + 'static,
    {
        self.store.select(|state| state.is_loading, on_change)
    }

    pub fn watch_load_error<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Option<String>) + Send + 'static,
    {
        self.store.select(|state| state.load_error.clone(), on_change)
    }

    pub fn watch_project<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Option<Project>) + Send + 'static,
    {
        self.store.select(|state| state.project.clone(), on_change)
    }

    pub fn watch_project_orientation<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Option<ProjectOrientation>) + Send + 'static,
    {
        self.store.select(|state| state.project_orientation, on_change)
    }

    pub fn watch_tree<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Option<Arc<FlowTree>>) + Send + 'static,
    {
        self.store.select(|state| state.tree.clone(), on_change)
    }

    pub fn watch_selected_node<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Option<NodeRef>) + Send + 'static,
    {
        self.store.select(|state| state.selected_node.clone(), on_change)
    }

    pub fn watch_screen_size<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&u8) + Send + 'static,
    {
        self.store.select(|state| state.screen_size, on_change)
    }

    pub fn watch_reachable_screen_count<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&usize) + Send + 'static,
    {
        self.store.select(|state| state.reachable_screen_count, on_change)
    }

    pub fn watch_unreachable_screen_count<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&usize) + Send + 'static,
    {
        self.store.select(|state| state.unreachable_screen_count, on_change)
    }

    pub fn watch_related_image_urls<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&Arc<[String]>) + Send + 'static,
    {
        self.store.select(|state| Arc::clone(&state.related_image_urls), on_change)
    }
}
