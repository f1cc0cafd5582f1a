//! Auto-VJ group templates.
//!
//! A template is a host project file holding a reference copy of the
//! AUTO_VJ group. The store resolves which file to use (explicit override,
//! user config dir, or the embedded default) and digs the group's channel
//! definitions out of the document.

use std::path::{Path, PathBuf};

use anyhow::Result;

// Embedded default template
const BUILTIN_TEMPLATE: &str =
    include_str!("../../../../assets/templates/auto_vj.json");

/// One channel of the reference group, with host ids stripped.
#[derive(Debug, Clone)]
pub struct ChannelDef {
    pub label: String,
    pub fader: f64,
    pub enabled: bool,
    /// Pattern class names, in template order.
    pub patterns: Vec<String>,
}

/// Resolves and parses the auto-VJ template document.
pub struct TemplateStore {
    override_path: Option<PathBuf>,
}

impl TemplateStore {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }

    pub fn user_template_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("cadence").join("auto_vj.json")
    }

    /// Load the template document.
    ///
    /// An explicit override path must load; a broken user file falls back
    /// to the embedded default so a bad edit can't take the engine down.
    pub fn load(&self) -> Result<serde_json::Value> {
        if let Some(path) = &self.override_path {
            return Self::read_document(path)
                .map_err(|e| anyhow::anyhow!("Cannot load template {}: {e}", path.display()));
        }

        let user_path = Self::user_template_path();
        if user_path.exists() {
            match Self::read_document(&user_path) {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    log::warn!(
                        "Ignoring user template {}: {e}; using the built-in one",
                        user_path.display()
                    );
                }
            }
        }

        serde_json::from_str(BUILTIN_TEMPLATE)
            .map_err(|e| anyhow::anyhow!("Cannot parse built-in template: {e}"))
    }

    fn read_document(path: &Path) -> Result<serde_json::Value> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Find the reference group named `label` and return its channels in
    /// declaration order.
    pub fn reference_group(
        doc: &serde_json::Value,
        label: &str,
    ) -> Result<Vec<ChannelDef>> {
        let Some(channels) = doc
            .pointer("/engine/children/mixer/channels")
            .and_then(serde_json::Value::as_array)
        else {
            anyhow::bail!("template has no mixer channel list");
        };

        let Some(group) = channels.iter().find(|entry| {
            def_class(entry) == Some("mixer.Group") && def_label(entry) == Some(label)
        }) else {
            anyhow::bail!("template has no '{label}' group");
        };
        let Some(group_id) = group.get("id") else {
            anyhow::bail!("template group '{label}' has no id");
        };

        // Members point back at the group through their "group" field.
        let defs: Vec<ChannelDef> = channels
            .iter()
            .filter(|entry| entry.get("group") == Some(group_id))
            .map(channel_def)
            .collect();
        if defs.is_empty() {
            anyhow::bail!("template group '{label}' has no member channels");
        }
        Ok(defs)
    }
}

/// Extract one member channel, dropping the ids the source project
/// assigned so instantiated copies never collide with live ones.
fn channel_def(entry: &serde_json::Value) -> ChannelDef {
    let mut entry = entry.clone();
    strip_identity(&mut entry);

    let label = entry
        .pointer("/parameters/label")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .to_string();
    let fader = entry
        .pointer("/parameters/fader")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    let enabled = entry
        .pointer("/parameters/enabled")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let patterns = entry
        .get("patterns")
        .and_then(serde_json::Value::as_array)
        .map(|patterns| {
            patterns
                .iter()
                .filter_map(|p| p.get("class").and_then(serde_json::Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ChannelDef {
        label,
        fader,
        enabled,
        patterns,
    }
}

/// Recursively remove host-assigned identity ("id" and "group" keys).
pub fn strip_identity(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("id");
            map.remove("group");
            for child in map.values_mut() {
                strip_identity(child);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                strip_identity(item);
            }
        }
        _ => {}
    }
}

fn def_class(value: &serde_json::Value) -> Option<&str> {
    value.get("class").and_then(serde_json::Value::as_str)
}

fn def_label(value: &serde_json::Value) -> Option<&str> {
    value.pointer("/parameters/label").and_then(serde_json::Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::roles::ChannelRole;
    use std::io::Write;

    #[test]
    fn builtin_template_covers_every_role() {
        let doc: serde_json::Value = serde_json::from_str(BUILTIN_TEMPLATE).unwrap();
        let defs = TemplateStore::reference_group(&doc, "AUTO_VJ").unwrap();
        assert_eq!(defs.len(), ChannelRole::ALL.len());
        for role in ChannelRole::ALL {
            let def = defs
                .iter()
                .find(|d| d.label == role.label())
                .unwrap_or_else(|| panic!("missing {}", role.label()));
            assert!(!def.patterns.is_empty(), "{} has no patterns", role.label());
        }
    }

    #[test]
    fn builtin_defs_are_in_lane_order() {
        let doc: serde_json::Value = serde_json::from_str(BUILTIN_TEMPLATE).unwrap();
        let defs = TemplateStore::reference_group(&doc, "AUTO_VJ").unwrap();
        let labels: Vec<&str> = defs.iter().map(|d| d.label.as_str()).collect();
        let expected: Vec<&str> = ChannelRole::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn strip_identity_reaches_nested_values() {
        let mut doc: serde_json::Value = serde_json::from_str(
            r#"{
                "id": 7,
                "group": 3,
                "parameters": {"label": "UP", "id": 9},
                "patterns": [{"id": 11, "class": "warp.Tunnel"}]
            }"#,
        )
        .unwrap();
        strip_identity(&mut doc);
        assert!(doc.get("id").is_none());
        assert!(doc.get("group").is_none());
        assert!(doc.pointer("/parameters/id").is_none());
        assert!(doc.pointer("/patterns/0/id").is_none());
        assert_eq!(
            doc.pointer("/patterns/0/class").and_then(serde_json::Value::as_str),
            Some("warp.Tunnel")
        );
    }

    #[test]
    fn override_path_is_loaded_and_must_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"engine": {{"children": {{"mixer": {{"channels": [
                {{"id": 1, "class": "mixer.Group", "parameters": {{"label": "AUTO_VJ"}}}},
                {{"id": 2, "class": "mixer.Channel", "group": 1,
                 "parameters": {{"label": "UP", "fader": 0.5, "enabled": true}},
                 "patterns": [{{"class": "solid.Color"}}]}},
                {{"id": 3, "class": "mixer.Channel",
                 "parameters": {{"label": "LOOSE"}}}}
            ]}}}}}}}}"#
        )
        .unwrap();

        let store = TemplateStore::new(Some(file.path().to_path_buf()));
        let doc = store.load().unwrap();
        let defs = TemplateStore::reference_group(&doc, "AUTO_VJ").unwrap();
        // The ungrouped channel is not a member
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].label, "UP");
        assert!((defs[0].fader - 0.5).abs() < 1e-9);
        assert!(defs[0].enabled);
        assert_eq!(defs[0].patterns, ["solid.Color"]);
    }

    #[test]
    fn missing_override_is_a_hard_error() {
        let store = TemplateStore::new(Some(PathBuf::from("/nonexistent/auto_vj.json")));
        assert!(store.load().is_err());
    }

    #[test]
    fn reference_group_requires_the_group() {
        let doc: serde_json::Value = serde_json::from_str(
            r#"{"engine": {"children": {"mixer": {"channels": []}}}}"#,
        )
        .unwrap();
        assert!(TemplateStore::reference_group(&doc, "AUTO_VJ").is_err());
    }
}
