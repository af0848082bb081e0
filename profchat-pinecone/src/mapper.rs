use std::collections::HashMap;

use profchat_core::RetrievedRecord;
use serde_json::Value;

use crate::error::PineconeError;

/// Converts one Pinecone match into a record. Absent metadata becomes an
/// empty map; anything other than an object is rejected.
pub fn match_to_record(
    id: &str,
    score: f32,
    metadata: Option<&Value>,
) -> Result<RetrievedRecord, PineconeError> {
    let metadata = match metadata {
        None | Some(Value::Null) => HashMap::new(),
        Some(Value::Object(object)) => object
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Some(_) => {
            return Err(PineconeError::Malformed(format!(
                "metadata for match '{id}' must be an object"
            )))
        }
    };

    Ok(RetrievedRecord {
        id: id.to_string(),
        score,
        metadata,
    })
}
