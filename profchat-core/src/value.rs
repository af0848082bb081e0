pub type Value = serde_json::Value;
