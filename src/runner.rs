//! Batch execution of one node kind over a list of parameter items.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::media::BinaryArtifact;
use crate::nodes::{Node, NodeContext, OutputItem};

/// Input is either a JSON array of parameter objects or one object.
pub fn parse_input(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(AdapterError::Config(format!(
            "Input must be a JSON object or array, got {}",
            other
        ))),
    }
}

/// Runs items in order. Without `continue_on_fail` the first error aborts the
/// batch; with it the failing item yields its error record instead.
pub async fn run_batch(
    node: &dyn Node,
    ctx: &NodeContext<'_>,
    items: Vec<Value>,
    continue_on_fail: bool,
) -> Result<Vec<OutputItem>> {
    let run_id = Uuid::new_v4();
    let mut outputs = Vec::new();
    for (index, params) in items.into_iter().enumerate() {
        let span = tracing::info_span!("item", node = node.name(), %run_id, index);
        match node.execute(ctx, params).instrument(span).await {
            Ok(items) => outputs.extend(items),
            Err(e) if continue_on_fail => {
                tracing::warn!("Item {} failed, continuing: {}", index, e);
                outputs.push(OutputItem::json(e.to_item_json()));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outputs)
}

pub fn write_artifact(dir: &Path, index: usize, artifact: &BinaryArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}-{}", index, artifact.file_name));
    std::fs::write(&path, &artifact.data)?;
    Ok(path)
}

/// Final JSON line for an output item, describing any binary it carries.
pub fn render(item: &OutputItem, written_to: Option<&Path>) -> Value {
    let mut json = item.json.clone();
    if let (Some(artifact), Some(obj)) = (&item.binary, json.as_object_mut()) {
        let mut binary = json!({
            "file_name": artifact.file_name,
            "mime_type": artifact.mime_type,
            "size": artifact.data.len(),
        });
        if let Some(path) = written_to {
            binary["path"] = json!(path.display().to_string());
        }
        obj.insert("binary".into(), binary);
    }
    json
}
