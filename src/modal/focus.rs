//! Focusable-element resolution
//!
//! Computes, on demand, the ordered set of elements inside a subtree that can
//! receive keyboard focus. Nothing is cached: dialog content may change between
//! key presses.

use super::dom::{Element, ElementId, ElementKind, ElementTree};

/// Whether an element belongs to the interactive category and is not
/// disabled or hidden from the accessibility tree
pub fn is_focusable(element: &Element) -> bool {
    if element.disabled || element.aria_hidden {
        return false;
    }

    let interactive = match &element.kind {
        ElementKind::Link { href } => href.is_some(),
        ElementKind::Button
        | ElementKind::Input
        | ElementKind::Select
        | ElementKind::TextArea => true,
        ElementKind::Container | ElementKind::Text => false,
    };

    interactive || element.tab_index.is_some_and(|index| index >= 0)
}

/// Focusable descendants of `root` in document order
pub fn focusable_elements(tree: &ElementTree, root: ElementId) -> Vec<ElementId> {
    tree.descendants(root)
        .into_iter()
        .filter(|id| tree.get(*id).is_some_and(is_focusable))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> (ElementTree, ElementId) {
        let mut tree = ElementTree::new();
        let root = tree.insert_root(Element::container().with_tab_index(-1));
        (tree, root)
    }

    #[test]
    fn test_interactive_elements_in_document_order() {
        let (mut tree, root) = panel();
        let form = tree.append_child(root, Element::container()).unwrap();
        let name = tree.append_child(form, Element::input()).unwrap();
        let _heading = tree.append_child(form, Element::text("Title")).unwrap();
        let level = tree.append_child(form, Element::select()).unwrap();
        let link = tree.append_child(root, Element::link(Some("https://example.com"))).unwrap();
        let submit = tree.append_child(root, Element::button("Submit")).unwrap();

        assert_eq!(focusable_elements(&tree, root), vec![name, level, link, submit]);
    }

    #[test]
    fn test_disabled_and_hidden_excluded() {
        let (mut tree, root) = panel();
        tree.append_child(root, Element::button("off").disabled(true)).unwrap();
        tree.append_child(root, Element::input().aria_hidden(true)).unwrap();
        tree.append_child(root, Element::link(None)).unwrap();
        let kept = tree.append_child(root, Element::button("on")).unwrap();

        assert_eq!(focusable_elements(&tree, root), vec![kept]);
    }

    #[test]
    fn test_tab_index_rules() {
        let (mut tree, root) = panel();
        let zero = tree.append_child(root, Element::text("zero").with_tab_index(0)).unwrap();
        tree.append_child(root, Element::text("neg").with_tab_index(-1)).unwrap();
        let positive = tree.append_child(root, Element::container().with_tab_index(3)).unwrap();
        tree.append_child(root, Element::text("hidden").with_tab_index(0).aria_hidden(true))
            .unwrap();

        assert_eq!(focusable_elements(&tree, root), vec![zero, positive]);
    }

    #[test]
    fn test_root_itself_is_not_listed() {
        let (tree, root) = panel();
        assert!(focusable_elements(&tree, root).is_empty());
    }

    #[test]
    fn test_repeated_calls_reflect_mutations() {
        let (mut tree, root) = panel();
        let button = tree.append_child(root, Element::button("ok")).unwrap();
        assert_eq!(focusable_elements(&tree, root), vec![button]);

        if let Some(element) = tree.get_mut(button) {
            element.disabled = true;
        }
        assert!(focusable_elements(&tree, root).is_empty());
    }
}
