//! Values computed from the flow tree and the selection.
//!
//! Everything here is a pure function of its inputs. The runtime recomputes
//! these wholesale whenever a dependency changes and never patches them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::model::{FlowTree, NodeRef, ScreenId};

/// Maps node id to node for every node reachable from the root.
pub type FlowTreeIndex = HashMap<ScreenId, NodeRef>;

/// Breadth-first index of the tree, following `links` from the root.
pub fn tree_index(tree: Option<&FlowTree>) -> Option<Arc<FlowTreeIndex>> {
    let tree = tree?;
    let mut index = FlowTreeIndex::new();
    let mut to_visit = VecDeque::from([Arc::clone(&tree.root)]);

    while let Some(node) = to_visit.pop_front() {
        to_visit.extend(node.links.iter().cloned());
        index.insert(node.id, node);
    }

    Some(Arc::new(index))
}

/// Number of nodes reachable from the root, the root included.
pub fn reachable_screen_count(tree: Option<&FlowTree>) -> usize {
    let Some(tree) = tree else {
        return 0;
    };

    let mut count = 0;
    let mut stack = vec![&tree.root];
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.links.iter());
    }
    count
}

pub fn unreachable_screen_count(tree: Option<&FlowTree>) -> usize {
    tree.map_or(0, |tree| tree.unreachable.len())
}

/// Image URLs of the screens the selected node's hotspots lead to, in
/// hotspot order. Targets missing from the index are skipped.
pub fn related_image_urls(
    selected: Option<&NodeRef>,
    index: Option<&FlowTreeIndex>,
) -> Arc<[String]> {
    let (Some(selected), Some(index)) = (selected, index) else {
        return Arc::from([]);
    };

    selected
        .hotspots()
        .iter()
        .filter_map(|hotspot| index.get(&hotspot.target_screen_id))
        .map(|target| target.screen.image_url.clone())
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn subtree_count(node: &NodeRef) -> usize {
        1 + node.links.iter().map(subtree_count).sum::<usize>()
    }

    #[test]
    fn reachable_count_sums_subtrees() {
        let tree = sample_tree();
        let count = reachable_screen_count(Some(&tree));
        assert_eq!(count, 5);
        assert_eq!(
            count,
            1 + tree.root.links.iter().map(subtree_count).sum::<usize>()
        );
    }

    #[test]
    fn counts_are_zero_without_tree() {
        assert_eq!(reachable_screen_count(None), 0);
        assert_eq!(unreachable_screen_count(None), 0);
        assert!(tree_index(None).is_none());
    }

    #[test]
    fn unreachable_count_is_list_length() {
        assert_eq!(unreachable_screen_count(Some(&sample_tree())), 1);
    }

    #[test]
    fn index_holds_the_tree_nodes_themselves() {
        let tree = sample_tree();
        let index = tree_index(Some(&tree)).unwrap();

        assert_eq!(index.len(), 5);
        assert!(Arc::ptr_eq(&index[&1], &tree.root));
        assert!(Arc::ptr_eq(&index[&2], &tree.root.links[0]));
        assert!(Arc::ptr_eq(&index[&5], &tree.root.links[0].links[1]));
        assert!(!index.contains_key(&9));
    }

    #[test]
    fn related_images_keep_hotspot_order_and_duplicates() {
        let tree = sample_tree();
        let index = tree_index(Some(&tree)).unwrap();

        let urls = related_image_urls(Some(&tree.root), Some(&index));
        assert_eq!(
            &*urls,
            ["/images/2.png", "/images/3.png", "/images/2.png"].map(String::from)
        );
    }

    #[test]
    fn related_images_empty_without_selection_or_hotspots() {
        let tree = sample_tree();
        let index = tree_index(Some(&tree)).unwrap();

        assert!(related_image_urls(None, Some(&index)).is_empty());
        assert!(related_image_urls(Some(&tree.root), None).is_empty());
        assert!(related_image_urls(Some(&index[&4]), Some(&index)).is_empty());
    }
}
