//! Declarative patches over configuration documents.
//!
//! A [`Patch`] is an ordered list of [`PatchOp`]s. Applying it produces a new
//! document; the input is never modified and fields not named by an operation
//! are carried over untouched.

use crate::path::{FieldPath, Segment};
use serde_json::Value;

/// A single patch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Set the value at `path`.
    ///
    /// The final key is created or overwritten; every container above it must
    /// already exist; branches that lack one are left as they are.
    Set { path: FieldPath, value: Value },

    /// Replace a counted list (`{"Quantity": n, "Items": [...]}`) at `path`,
    /// recomputing `Quantity` from the new items.
    SetCounted { path: FieldPath, items: Vec<Value> },
}

/// An ordered set of patch operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a [`PatchOp::Set`].
    pub fn set(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set {
            path,
            value: value.into(),
        });
        self
    }

    /// Add a [`PatchOp::SetCounted`].
    pub fn set_counted(mut self, path: FieldPath, items: Vec<Value>) -> Self {
        self.ops.push(PatchOp::SetCounted { path, items });
        self
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the patch to a copy of `document`.
    pub fn apply(&self, document: &Value) -> Value {
        let mut patched = document.clone();
        for op in &self.ops {
            match op {
                PatchOp::Set { path, value } => apply_set(&mut patched, path, value),
                PatchOp::SetCounted { path, items } => {
                    path.visit_mut(&mut patched, &mut |target| {
                        if let Some(map) = target.as_object_mut() {
                            map.insert("Items".to_string(), Value::Array(items.clone()));
                            map.insert("Quantity".to_string(), Value::from(items.len()));
                        }
                    });
                }
            }
        }
        patched
    }
}

fn apply_set(document: &mut Value, path: &FieldPath, value: &Value) {
    let Some((parent, last)) = path.split_last() else {
        *document = value.clone();
        return;
    };

    parent.visit_mut(document, &mut |container| match last {
        Segment::Key(key) => {
            if let Some(map) = container.as_object_mut() {
                map.insert(key.clone(), value.clone());
            }
        }
        Segment::Each => {
            if let Some(items) = container.as_array_mut() {
                for item in items.iter_mut() {
                    *item = value.clone();
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(expr: &str) -> FieldPath {
        FieldPath::parse(expr).unwrap()
    }

    #[test]
    fn test_set_top_level_field() {
        let doc = json!({"Enabled": true, "Comment": "keep me"});
        let patched = Patch::new().set(path("Enabled"), false).apply(&doc);
        assert_eq!(patched, json!({"Enabled": false, "Comment": "keep me"}));
        // Input is untouched.
        assert_eq!(doc["Enabled"], json!(true));
    }

    #[test]
    fn test_set_skips_branches_without_container() {
        let doc = json!({
            "Origins": {"Items": [
                {"Id": "s3", "S3OriginConfig": {"OriginAccessIdentity": ""}},
                {"Id": "web", "CustomOriginConfig": {"OriginProtocolPolicy": "http-only"}},
            ]}
        });
        let patched = Patch::new()
            .set(
                path("Origins.Items[].CustomOriginConfig.OriginProtocolPolicy"),
                "https-only",
            )
            .apply(&doc);

        assert_eq!(
            patched["Origins"]["Items"][1]["CustomOriginConfig"]["OriginProtocolPolicy"],
            json!("https-only")
        );
        assert!(patched["Origins"]["Items"][0].get("CustomOriginConfig").is_none());
        assert_eq!(patched["Origins"]["Items"][0], doc["Origins"]["Items"][0]);
    }

    #[test]
    fn test_set_counted_recomputes_quantity() {
        let doc = json!({
            "CustomOriginConfig": {
                "OriginSslProtocols": {"Quantity": 3, "Items": ["SSLv3", "TLSv1", "TLSv1.1"]},
                "HTTPPort": 80
            }
        });
        let patched = Patch::new()
            .set_counted(
                path("CustomOriginConfig.OriginSslProtocols"),
                vec![json!("TLSv1.2")],
            )
            .apply(&doc);

        assert_eq!(
            patched["CustomOriginConfig"]["OriginSslProtocols"],
            json!({"Quantity": 1, "Items": ["TLSv1.2"]})
        );
        assert_eq!(patched["CustomOriginConfig"]["HTTPPort"], json!(80));
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let doc = json!({"a": {"b": [1, 2, 3]}});
        assert!(Patch::new().is_empty());
        assert_eq!(Patch::new().apply(&doc), doc);
    }
}
