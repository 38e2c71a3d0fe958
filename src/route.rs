//! Drives selection from an address such as `/app/flow;screenID=12`.
//!
//! The runtime only knows screen ids; this module maps between those ids and
//! the flow route, and tells the addressing layer where to go next.

use tracing::debug;

use crate::model::{FlowTreeNode, Hotspot, ScreenId};
use crate::runtime::ScreenFlowRuntime;
use crate::source::DocumentSource;

pub const FLOW_PATH: &str = "/app/flow";
const SCREEN_PARAM: &str = "screenID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRoute {
    pub screen_id: Option<ScreenId>,
}

impl ScreenRoute {
    pub fn flow() -> Self {
        Self { screen_id: None }
    }

    pub fn screen(id: ScreenId) -> Self {
        Self {
            screen_id: Some(id),
        }
    }

    /// Reads the `screenID` matrix parameter. A missing or non-numeric
    /// parameter means no selection.
    pub fn parse(path: &str) -> Self {
        let screen_id = path
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| *key == SCREEN_PARAM)
            .and_then(|(_, value)| value.trim().parse().ok());
        Self { screen_id }
    }

    pub fn path(&self) -> String {
        match self.screen_id {
            Some(id) => format!("{FLOW_PATH};{SCREEN_PARAM}={id}"),
            None => FLOW_PATH.to_string(),
        }
    }
}

/// What the addressing layer should do after a selection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    ToFlow,
    ToScreen(ScreenId),
}

impl Navigation {
    pub fn route(&self) -> Option<ScreenRoute> {
        match self {
            Navigation::Stay => None,
            Navigation::ToFlow => Some(ScreenRoute::flow()),
            Navigation::ToScreen(id) => Some(ScreenRoute::screen(*id)),
        }
    }
}

impl<S: DocumentSource> ScreenFlowRuntime<S> {
    /// Applies a route to the selection. An id that is not in the flow asks
    /// the addressing layer to fall back to the bare flow route.
    pub fn apply_route(&self, route: &ScreenRoute) -> Navigation {
        let Some(id) = route.screen_id else {
            self.unselect_tree_node();
            return Navigation::Stay;
        };

        if self.select_screen_id(id) {
            Navigation::Stay
        } else {
            debug!(screen_id = id, "route points at an unknown screen");
            Navigation::ToFlow
        }
    }

    /// Clicking the selected node deselects it; clicking any other node
    /// selects that one.
    pub fn toggle_tree_node(&self, node: &FlowTreeNode) -> Navigation {
        let snapshot = self.snapshot();
        match &snapshot.selected_node {
            Some(selected) if selected.id == node.id => Navigation::ToFlow,
            _ => Navigation::ToScreen(node.id),
        }
    }

    pub fn follow_hotspot(&self, hotspot: &Hotspot) -> Navigation {
        Navigation::ToScreen(hotspot.target_screen_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::sample_tree;
    use crate::runtime::testing::{ManualSource, document};

    async fn loaded_runtime() -> ScreenFlowRuntime<ManualSource> {
        let source = ManualSource::default();
        source.expect(1).send(Ok(document(1, sample_tree()))).unwrap();
        let runtime = ScreenFlowRuntime::new(source);
        runtime.load(1).await.unwrap();
        runtime
    }

    #[test]
    fn parses_matrix_parameter() {
        assert_eq!(ScreenRoute::parse("/app/flow;screenID=12").screen_id, Some(12));
        assert_eq!(ScreenRoute::parse("/app/flow;zoom=2;screenID=3").screen_id, Some(3));
        assert_eq!(ScreenRoute::parse("/app/flow").screen_id, None);
        assert_eq!(ScreenRoute::parse("/app/flow;screenID=abc").screen_id, None);
    }

    #[test]
    fn formats_paths() {
        assert_eq!(ScreenRoute::flow().path(), "/app/flow");
        assert_eq!(ScreenRoute::screen(4).path(), "/app/flow;screenID=4");
        assert_eq!(ScreenRoute::parse(&ScreenRoute::screen(4).path()), ScreenRoute::screen(4));
    }

    #[tokio::test]
    async fn route_drives_selection() {
        let runtime = loaded_runtime().await;

        assert_eq!(runtime.apply_route(&ScreenRoute::screen(2)), Navigation::Stay);
        assert_eq!(runtime.snapshot().selected_node.as_ref().unwrap().id, 2);

        assert_eq!(runtime.apply_route(&ScreenRoute::screen(9)), Navigation::ToFlow);
        assert_eq!(runtime.snapshot().selected_node.as_ref().unwrap().id, 2);

        assert_eq!(runtime.apply_route(&ScreenRoute::flow()), Navigation::Stay);
        assert!(runtime.snapshot().selected_node.is_none());
    }

    #[tokio::test]
    async fn toggling_selected_node_leaves_screen() {
        let runtime = loaded_runtime().await;
        let root = std::sync::Arc::clone(&runtime.snapshot().tree.as_ref().unwrap().root);

        assert_eq!(runtime.toggle_tree_node(&root), Navigation::ToScreen(1));
        runtime.select_tree_node(&root);
        assert_eq!(runtime.toggle_tree_node(&root), Navigation::ToFlow);
        assert_eq!(runtime.toggle_tree_node(&root.links[1]), Navigation::ToScreen(3));
        assert_eq!(
            runtime.follow_hotspot(&root.hotspots()[0]).route(),
            Some(ScreenRoute::screen(2))
        );
    }
}
