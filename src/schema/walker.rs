//! Schema traversal.
//!
//! Produces a flat [`SchemaLayout`]: every visible leaf with its dotted
//! path, type, default and metadata, and every visible section in
//! depth-first declaration order. The layout is computed once per
//! registration and reused across reloads.

use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;
use crate::schema::node::{join_path, ExecutionMode, FieldKind, Node, Range, Schema, Value};
use crate::schema::rule::Rule;

/// A leaf bound to its dotted path.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Dotted path from the schema root.
    pub path: String,
    /// Field name (last path segment).
    pub name: String,
    /// Index of the enclosing section in [`SchemaLayout::sections`], `None`
    /// for root-level leaves.
    pub section: Option<usize>,
    pub kind: FieldKind,
    pub default: Value,
    pub range: Option<Range>,
    pub rule: Option<Rule>,
}

/// A section bound to its dotted path.
#[derive(Debug, Clone)]
pub struct SectionInfo {
    pub path: String,
    pub label: Option<String>,
    pub depth: usize,
    /// Indices of the leaves declared directly in this section.
    pub leaves: Vec<usize>,
}

/// Flattened view of a schema for one execution mode.
#[derive(Debug, Clone, Default)]
pub struct SchemaLayout {
    leaves: Vec<Leaf>,
    sections: Vec<SectionInfo>,
    root_leaves: Vec<usize>,
    index: HashMap<String, usize>,
}

impl SchemaLayout {
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    pub fn root_leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.root_leaves.iter().map(|&i| &self.leaves[i])
    }

    pub fn section_leaves<'a>(&'a self, section: &'a SectionInfo) -> impl Iterator<Item = &'a Leaf> {
        section.leaves.iter().map(|&i| &self.leaves[i])
    }

    pub fn leaf(&self, path: &str) -> Option<&Leaf> {
        self.index.get(path).map(|&i| &self.leaves[i])
    }

    pub fn has_section(&self, path: &str) -> bool {
        self.sections.iter().any(|s| s.path == path)
    }
}

/// Walks a schema, skipping nodes restricted to another execution mode.
#[derive(Debug, Clone, Copy)]
pub struct SchemaWalker {
    mode: Option<ExecutionMode>,
}

impl SchemaWalker {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode: Some(mode) }
    }

    /// Walker that visits every node regardless of restrictions.
    pub fn unrestricted() -> Self {
        Self { mode: None }
    }

    pub fn walk(&self, schema: &Schema) -> Result<SchemaLayout, SchemaError> {
        let mut layout = SchemaLayout::default();
        let mut seen = HashSet::new();
        self.walk_nodes(schema.nodes(), "", None, 0, &mut layout, &mut seen)?;
        tracing::debug!(
            leaves = layout.leaves.len(),
            sections = layout.sections.len(),
            mode = ?self.mode,
            "Schema walked"
        );
        Ok(layout)
    }

    fn visible(&self, node: &Node) -> bool {
        match self.mode {
            Some(mode) => node.visible_in(mode),
            None => true,
        }
    }

    fn walk_nodes(
        &self,
        nodes: &[Node],
        prefix: &str,
        parent: Option<usize>,
        depth: usize,
        layout: &mut SchemaLayout,
        seen: &mut HashSet<String>,
    ) -> Result<(), SchemaError> {
        for node in nodes {
            if !self.visible(node) {
                continue;
            }
            let path = join_path(prefix, node.name());
            if !seen.insert(path.clone()) {
                return Err(SchemaError::DuplicatePath(path));
            }

            match node {
                Node::Field(field) => {
                    let rule = field
                        .rule
                        .as_deref()
                        .map(Rule::parse)
                        .transpose()
                        .map_err(|reason| SchemaError::InvalidRule {
                            path: path.clone(),
                            rule: field.rule.clone().unwrap_or_default(),
                            reason,
                        })?;

                    let index = layout.leaves.len();
                    layout.index.insert(path.clone(), index);
                    layout.leaves.push(Leaf {
                        path,
                        name: field.name.clone(),
                        section: parent,
                        kind: field.kind.clone(),
                        default: field.default.clone(),
                        range: field.range,
                        rule,
                    });
                    match parent {
                        Some(p) => layout.sections[p].leaves.push(index),
                        None => layout.root_leaves.push(index),
                    }
                }
                Node::Section(section) => {
                    let index = layout.sections.len();
                    layout.sections.push(SectionInfo {
                        path: path.clone(),
                        label: section.label.clone(),
                        depth,
                        leaves: Vec::new(),
                    });
                    self.walk_nodes(&section.children, &path, Some(index), depth + 1, layout, seen)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::{Field, Section};

    fn schema() -> Schema {
        Schema::builder(1)
            .field(Field::bool("enabled", true))
            .section(
                Section::new("rendering")
                    .field(Field::bool("enableFog", true))
                    .section(
                        Section::new("entityCulling")
                            .label("Entity Culling")
                            .field(Field::bool("enableCulling", true)),
                    )
                    .field(Field::int("distance", 64).range(1.0, 256.0)),
            )
            .section(
                Section::new("hud")
                    .client_only()
                    .field(Field::string("title", "hello")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_paths_follow_declaration_order() {
        let layout = SchemaWalker::new(ExecutionMode::Client).walk(&schema()).unwrap();
        let paths: Vec<&str> = layout.leaves().iter().map(|l| l.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "enabled",
                "rendering.enableFog",
                "rendering.entityCulling.enableCulling",
                "rendering.distance",
                "hud.title",
            ]
        );
        let sections: Vec<&str> = layout.sections().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(sections, vec!["rendering", "rendering.entityCulling", "hud"]);
    }

    #[test]
    fn test_leaves_grouped_by_section() {
        let layout = SchemaWalker::new(ExecutionMode::Client).walk(&schema()).unwrap();
        let rendering = &layout.sections()[0];
        let names: Vec<&str> = layout
            .section_leaves(rendering)
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["enableFog", "distance"]);
        assert_eq!(layout.root_leaves().count(), 1);
        assert_eq!(layout.sections()[1].depth, 1);
        assert_eq!(layout.sections()[1].label.as_deref(), Some("Entity Culling"));
    }

    #[test]
    fn test_restricted_sections_skipped_outside_mode() {
        let layout = SchemaWalker::new(ExecutionMode::Server).walk(&schema()).unwrap();
        assert!(layout.leaf("hud.title").is_none());
        assert!(!layout.has_section("hud"));
        assert!(layout.leaf("rendering.distance").is_some());
    }

    #[test]
    fn test_leaf_metadata() {
        let layout = SchemaWalker::new(ExecutionMode::Client).walk(&schema()).unwrap();
        let leaf = layout.leaf("rendering.distance").unwrap();
        assert_eq!(leaf.kind, FieldKind::Int);
        assert_eq!(leaf.default, Value::Int(64));
        assert_eq!(leaf.range, Some(Range { min: 1.0, max: 256.0 }));
    }
}
