use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type ScreenId = u64;

/// Nodes are shared between the tree, the index and the selection.
pub type NodeRef = Arc<FlowTreeNode>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: ScreenId,
    pub name: String,
    #[serde(default)]
    pub client_filename: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
}

/// A clickable region on a screen that navigates to another screen.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Hotspot {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "screenID")]
    pub screen_id: ScreenId,
    #[serde(rename = "targetScreenID")]
    pub target_screen_id: ScreenId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowTreeNode {
    pub id: ScreenId,
    pub screen: Screen,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspots: Option<Vec<Hotspot>>,
    #[serde(default)]
    pub links: Vec<NodeRef>,
    #[serde(default, rename = "hardLinkIDs")]
    pub hard_link_ids: Vec<ScreenId>,
    #[serde(default, rename = "softLinkIDs")]
    pub soft_link_ids: Vec<ScreenId>,
}

/// Visual emphasis for an outgoing link. Carries no traversal meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHint {
    Hard,
    Soft,
}

impl FlowTreeNode {
    pub fn hotspots(&self) -> &[Hotspot] {
        self.hotspots.as_deref().unwrap_or_default()
    }

    /// Hint map for highlighting the screens this node links to.
    /// Soft ids are applied after hard ids, so an id in both lists is soft.
    pub fn link_hints(&self) -> HashMap<ScreenId, LinkHint> {
        let mut hints = HashMap::new();
        for id in &self.hard_link_ids {
            hints.insert(*id, LinkHint::Hard);
        }
        for id in &self.soft_link_ids {
            hints.insert(*id, LinkHint::Soft);
        }
        hints
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowTree {
    pub root: NodeRef,
    #[serde(default)]
    pub unreachable: Vec<NodeRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectOrientation {
    Portrait,
    Landscape,
}

impl std::fmt::Display for ProjectOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectOrientation::Portrait => f.write_str("portrait"),
            ProjectOrientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// The JSON body served by a document source for one version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlowDocument {
    pub project: Project,
    pub project_orientation: ProjectOrientation,
    pub tree: FlowTree,
}
