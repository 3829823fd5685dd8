//! Interest filtering: keep only behaviors whose widget text or library calls
//! mention a configured keyword.

use crate::domain::auxiliary::UiContext;
use crate::domain::graph::{KnowledgeGraph, NodeId};
use crate::domain::noise::KeywordSet;

pub struct InterestFilter<'a> {
    graph: &'a KnowledgeGraph,
    ui_context: &'a UiContext,
    texts: &'a KeywordSet,
    normalized_texts: Vec<String>,
    key_methods: Vec<String>,
}

impl<'a> InterestFilter<'a> {
    pub fn new(
        graph: &'a KnowledgeGraph,
        ui_context: &'a UiContext,
        texts: &'a KeywordSet,
        key_methods: &KeywordSet,
    ) -> Self {
        let normalized_texts = texts
            .keywords()
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .collect();
        let key_methods = key_methods.keywords().iter().map(|k| k.to_lowercase()).collect();
        Self {
            graph,
            ui_context,
            texts,
            normalized_texts,
            key_methods,
        }
    }

    /// True if the trigger's hint or text mentions a text keyword.
    pub fn should_keep_by_ui(&self, uid: NodeId) -> bool {
        if self.texts.is_empty() {
            return true;
        }
        let Some(node) = self.graph.node(uid) else {
            return false;
        };
        let Some(element_id) = node.ui_element_id else {
            return false;
        };
        let Some(widget) = self
            .ui_context
            .lookup(node.xml.as_deref(), &element_id.to_string())
        else {
            return false;
        };
        widget.labels().any(|label| self.label_matches(label))
    }

    /// True if any library node among `ids` has a name mentioning a method
    /// keyword, ignoring case.
    pub fn should_keep_by_method(&self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        if self.key_methods.is_empty() {
            return true;
        }
        ids.into_iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|node| !node.is_app_defined())
            .any(|node| {
                let name = node.name.to_lowercase();
                self.key_methods.iter().any(|k| name.contains(k.as_str()))
            })
    }

    /// A behavior is dropped only when neither check passes.
    pub fn should_keep(&self, uid: NodeId, ids: impl IntoIterator<Item = NodeId>) -> bool {
        self.should_keep_by_ui(uid) || self.should_keep_by_method(ids)
    }

    fn label_matches(&self, label: &str) -> bool {
        if self.texts.matches(label) {
            return true;
        }
        let label = normalize(label);
        self.normalized_texts.iter().any(|k| label.contains(k.as_str()))
    }
}

/// Lowercase alphanumerics only, so "Log Out" and "logout" compare equal.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auxiliary::WidgetContext;
    use crate::domain::graph::Node;

    fn fixture() -> (KnowledgeGraph, UiContext) {
        let nodes = vec![
            Node::widget("Button", "settings.xml", 100),
            Node::widget("Button", "main.xml", 200),
            Node::method("<com.app.Main: void onClick(android.view.View)>"),
            Node::library_method("<com.auth.Session: void logoutUser()>", "com.auth"),
            Node::method("<com.app.Main: void logoutLocally()>"),
        ];
        let graph = KnowledgeGraph::build(nodes, Vec::new(), false).unwrap();
        let mut ctx = UiContext::default();
        ctx.insert(
            "settings.xml",
            "100",
            WidgetContext {
                hint: Some("Log Out".into()),
                text: None,
            },
        );
        ctx.insert(
            "main.xml",
            "200",
            WidgetContext {
                hint: None,
                text: Some("Refresh".into()),
            },
        );
        (graph, ctx)
    }

    #[test]
    fn test_hint_matches_after_normalization() {
        let (graph, ctx) = fixture();
        let texts = KeywordSet::new(["logout"]);
        let methods = KeywordSet::new(["logout"]);
        let filter = InterestFilter::new(&graph, &ctx, &texts, &methods);
        assert!(filter.should_keep_by_ui(0));
        assert!(filter.should_keep(0, [0, 2]));
    }

    #[test]
    fn test_neither_ui_nor_method_match_drops() {
        let (graph, ctx) = fixture();
        let texts = KeywordSet::new(["logout"]);
        let methods = KeywordSet::new(["logout"]);
        let filter = InterestFilter::new(&graph, &ctx, &texts, &methods);
        assert!(!filter.should_keep_by_ui(1));
        // app-defined names never count
        assert!(!filter.should_keep_by_method([1, 2, 4]));
        assert!(!filter.should_keep(1, [1, 2, 4]));
        assert!(filter.should_keep(1, [1, 2, 3]));
    }

    #[test]
    fn test_empty_keyword_lists_keep_everything() {
        let (graph, ctx) = fixture();
        let empty = KeywordSet::new(Vec::<String>::new());
        let filter = InterestFilter::new(&graph, &ctx, &empty, &empty);
        assert!(filter.should_keep_by_ui(1));
        assert!(filter.should_keep_by_method([2]));
    }

    #[test]
    fn test_missing_context_does_not_match() {
        let (graph, _) = fixture();
        let ctx = UiContext::default();
        let texts = KeywordSet::new(["Refresh"]);
        let methods = KeywordSet::new(["nothing"]);
        let filter = InterestFilter::new(&graph, &ctx, &texts, &methods);
        assert!(!filter.should_keep_by_ui(1));
    }
}
