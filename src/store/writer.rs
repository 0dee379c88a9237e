//! Flat key-value file generation.
//!
//! Files are always regenerated as a whole and written through a sibling
//! temporary file that is renamed over the target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::instance::ConfigInstance;
use crate::schema::{SchemaLayout, Value, CONFIG_VERSION_KEY};
use crate::store::parser::{unquote, RawStore};

const BANNER_WIDTH: usize = 25;

/// One `key = value` line with an optional descriptive comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    /// Rendered value, exactly as it appears in the file.
    pub value: String,
    pub comment: Option<String>,
}

/// One `[section]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionBlock {
    /// Dotted section path used in the header.
    pub name: String,
    pub label: Option<String>,
    pub entries: Vec<Entry>,
}

/// An ordered document ready to be rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatDocument {
    pub header: Vec<String>,
    pub root: Vec<Entry>,
    pub sections: Vec<SectionBlock>,
}

impl FlatDocument {
    /// Document for a materialized instance, grouped the way the layout
    /// groups leaves. Each leaf gets a comment derived from its name.
    pub fn from_instance(layout: &SchemaLayout, instance: &ConfigInstance, header: Vec<String>) -> Self {
        let entry = |leaf: &crate::schema::Leaf| {
            let value = instance.get(&leaf.path).unwrap_or(&leaf.default);
            Entry {
                key: leaf.name.clone(),
                value: render_value(value),
                comment: Some(describe_field(&leaf.name)),
            }
        };

        let mut root = vec![Entry {
            key: CONFIG_VERSION_KEY.to_string(),
            value: instance.version().to_string(),
            comment: None,
        }];
        root.extend(layout.root_leaves().map(entry));

        let sections = layout
            .sections()
            .iter()
            .map(|section| SectionBlock {
                name: section.path.clone(),
                label: section.label.clone(),
                entries: layout.section_leaves(section).map(entry).collect(),
            })
            .collect();

        Self {
            header,
            root,
            sections,
        }
    }

    /// Document for raw values with no schema information. Keys are split
    /// at their last dot into section and key.
    pub fn from_raw(store: &RawStore, header: Vec<String>) -> Self {
        let mut doc = Self {
            header,
            ..Self::default()
        };

        if let Some(version) = store.get(CONFIG_VERSION_KEY) {
            doc.root.push(Entry {
                key: CONFIG_VERSION_KEY.to_string(),
                value: render_raw(version),
                comment: None,
            });
        }

        for (key, value) in store.iter() {
            if key == CONFIG_VERSION_KEY {
                continue;
            }
            let (section, name) = match key.rsplit_once('.') {
                Some((section, name)) => (Some(section), name),
                None => (None, key),
            };
            let entry = Entry {
                key: name.to_string(),
                value: render_raw(value),
                comment: None,
            };
            match section {
                None => doc.root.push(entry),
                Some(section) => match doc.sections.iter_mut().find(|s| s.name == section) {
                    Some(block) => block.entries.push(entry),
                    None => doc.sections.push(SectionBlock {
                        name: section.to_string(),
                        label: None,
                        entries: vec![entry],
                    }),
                },
            }
        }

        doc
    }

    /// Raw values as the parser would read them back from the rendered file.
    pub fn to_raw_store(&self) -> RawStore {
        let root = self.root.iter().map(|e| (e.key.clone(), unquote(&e.value)));
        let sections = self.sections.iter().flat_map(|s| {
            s.entries
                .iter()
                .map(move |e| (format!("{}.{}", s.name, e.key), unquote(&e.value)))
        });
        root.chain(sections).collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        for line in &self.header {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        if !self.header.is_empty() {
            out.push('\n');
        }

        for entry in &self.root {
            render_entry(&mut out, entry);
        }
        if !self.root.is_empty() {
            out.push('\n');
        }

        for section in &self.sections {
            if let Some(label) = &section.label {
                let rule = "-".repeat(BANNER_WIDTH);
                out.push_str(&format!("#{rule}\n# {label}\n#{rule}\n\n"));
            }
            out.push_str(&format!("[{}]\n", section.name));
            for entry in &section.entries {
                render_entry(&mut out, entry);
            }
            out.push('\n');
        }

        out
    }

    /// Render and atomically replace `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(path);
        fs::write(&tmp, self.render())?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        tracing::debug!(path = %path.display(), "Config file written");
        Ok(())
    }
}

fn render_entry(out: &mut String, entry: &Entry) {
    if let Some(comment) = &entry.comment {
        out.push_str("## ");
        out.push_str(comment);
        out.push('\n');
    }
    out.push_str(&entry.key);
    out.push_str(" = ");
    out.push_str(&entry.value);
    out.push('\n');
    if entry.comment.is_some() {
        out.push('\n');
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Render a typed value in the persisted syntax.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Bool(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Double(v) => format!("{v:?}"),
        Value::String(v) | Value::Enum(v) => quote(v),
        Value::List(items) => render_list(items),
    }
}

/// Render a list as `["a", "b"]`.
pub fn render_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Render a raw string without type information: booleans, numbers and
/// lists stay bare, everything else is quoted.
pub fn render_raw(raw: &str) -> String {
    let bare = !raw.chars().any(char::is_control)
        && (raw == "true"
            || raw == "false"
            || raw.parse::<i64>().is_ok()
            || raw.parse::<f64>().is_ok()
            || (raw.starts_with('[') && raw.ends_with(']')));
    if bare {
        raw.to_string()
    } else {
        quote(raw)
    }
}

/// Double-quote `s`, escaping quotes, backslashes and control characters
/// so the value stays on one line.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Turn a field name into a comment: `enableEntityCulling` becomes
/// `Enable Entity Culling`.
pub fn describe_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut capitalize = true;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            capitalize = true;
            continue;
        }
        if capitalize {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else if c.is_uppercase() {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}
