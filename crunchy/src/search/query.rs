//! Boolean expression tree over raw query fragments.

use serde_json::{json, Value};

/// A node of the query expression tree.
///
/// Combinators consume their operands and build a new node; adjacent nodes of
/// the same operator share one child list instead of nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// An engine query fragment, e.g. `{"match": {"name": "Moscow"}}`.
    Raw(Value),
    /// All children must match (`bool.must`).
    And(Vec<QueryNode>),
    /// At least one child must match (`bool.should`).
    Or(Vec<QueryNode>),
    /// The child must not match (`bool.must_not`).
    Not(Box<QueryNode>),
    /// The child must match, in non-scoring filter context (`bool.filter`).
    Filter(Box<QueryNode>),
}

impl QueryNode {
    /// Build a node out of a free-form fragment.
    ///
    /// Returns `None` for blank fragments (`null`, `{}`, `[]`). Arrays are
    /// AND-combined element by element.
    pub fn from_fragment(fragment: Value) -> Option<Self> {
        match fragment {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            Value::Array(items) => items
                .into_iter()
                .filter_map(Self::from_fragment)
                .reduce(Self::and),
            other => Some(Self::Raw(other)),
        }
    }

    pub fn and(self, other: QueryNode) -> Self {
        let mut children = match self {
            Self::And(children) => children,
            node => vec![node],
        };
        match other {
            Self::And(other_children) => children.extend(other_children),
            node => children.push(node),
        }
        Self::And(children)
    }

    pub fn or(self, other: QueryNode) -> Self {
        let mut children = match self {
            Self::Or(children) => children,
            node => vec![node],
        };
        match other {
            Self::Or(other_children) => children.extend(other_children),
            node => children.push(node),
        }
        Self::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn filter(self) -> Self {
        Self::Filter(Box::new(self))
    }

    /// Render the tree into an engine query.
    pub fn render(&self) -> Value {
        match self {
            Self::Raw(fragment) => fragment.clone(),
            Self::And(children) => json!({"bool": {"must": render_all(children)}}),
            Self::Or(children) => json!({
                "bool": {"should": render_all(children), "minimum_should_match": 1}
            }),
            Self::Not(child) => json!({"bool": {"must_not": [child.render()]}}),
            Self::Filter(child) => json!({"bool": {"filter": [child.render()]}}),
        }
    }
}

fn render_all(children: &[QueryNode]) -> Vec<Value> {
    children.iter().map(QueryNode::render).collect()
}

/// AND `node` onto an optional tree; an absent tree simply becomes `node`.
pub(crate) fn and_optional(tree: Option<QueryNode>, node: QueryNode) -> QueryNode {
    match tree {
        Some(tree) => tree.and(node),
        None => node,
    }
}

/// OR two optional trees; an absent side yields the other one unchanged.
pub(crate) fn or_optional(left: Option<QueryNode>, right: Option<QueryNode>) -> Option<QueryNode> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.or(right)),
        (left, None) => left,
        (None, right) => right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(v: Value) -> QueryNode {
        QueryNode::Raw(v)
    }

    #[test]
    fn raw_renders_fragment_verbatim() {
        let node = raw(json!({"match": {"name": "Moscow"}}));
        assert_eq!(node.render(), json!({"match": {"name": "Moscow"}}));
    }

    #[test]
    fn and_of_two_fragments_is_one_must_list() {
        let node = raw(json!({"match": {"name": "Moscow"}})).and(raw(json!({"term": {"a": 1}})));
        assert_eq!(
            node.render(),
            json!({"bool": {"must": [{"match": {"name": "Moscow"}}, {"term": {"a": 1}}]}})
        );
    }

    #[test]
    fn consecutive_ands_merge_instead_of_nesting() {
        let node = raw(json!({"a": 1}))
            .and(raw(json!({"b": 2})))
            .and(raw(json!({"c": 3})));
        assert_eq!(
            node.render(),
            json!({"bool": {"must": [{"a": 1}, {"b": 2}, {"c": 3}]}})
        );

        let grouped = raw(json!({"a": 1})).and(raw(json!({"b": 2})).and(raw(json!({"c": 3}))));
        assert_eq!(grouped, node);
    }

    #[test]
    fn or_uses_should_with_minimum_match() {
        let node = raw(json!({"a": 1})).or(raw(json!({"b": 2})));
        assert_eq!(
            node.render(),
            json!({"bool": {"should": [{"a": 1}, {"b": 2}], "minimum_should_match": 1}})
        );
    }

    #[test]
    fn mixed_operators_nest() {
        let node = raw(json!({"a": 1}))
            .or(raw(json!({"b": 2})))
            .and(raw(json!({"c": 3})));
        assert_eq!(
            node.render(),
            json!({"bool": {"must": [
                {"bool": {"should": [{"a": 1}, {"b": 2}], "minimum_should_match": 1}},
                {"c": 3}
            ]}})
        );
    }

    #[test]
    fn not_and_filter_wrap_their_child() {
        assert_eq!(
            raw(json!({"a": 1})).not().render(),
            json!({"bool": {"must_not": [{"a": 1}]}})
        );
        assert_eq!(
            raw(json!({"a": 1})).filter().render(),
            json!({"bool": {"filter": [{"a": 1}]}})
        );
    }

    #[test]
    fn blank_fragments_are_dropped() {
        assert_eq!(QueryNode::from_fragment(Value::Null), None);
        assert_eq!(QueryNode::from_fragment(json!({})), None);
        assert_eq!(QueryNode::from_fragment(json!([])), None);
        assert_eq!(QueryNode::from_fragment(json!([{}, null])), None);
    }

    #[test]
    fn array_fragments_are_and_combined() {
        let node = QueryNode::from_fragment(json!([{"a": 1}, {}, {"b": 2}])).unwrap();
        assert_eq!(node, raw(json!({"a": 1})).and(raw(json!({"b": 2}))));

        let single = QueryNode::from_fragment(json!([{"a": 1}])).unwrap();
        assert_eq!(single, raw(json!({"a": 1})));
    }

    #[test]
    fn or_with_an_absent_side_keeps_the_other() {
        let node = raw(json!({"a": 1}));
        assert_eq!(or_optional(None, Some(node.clone())), Some(node.clone()));
        assert_eq!(or_optional(Some(node.clone()), None), Some(node));
        assert_eq!(or_optional(None, None), None);
    }
}
