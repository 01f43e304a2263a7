use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(chunking, "chunking.overlap", "overlap", 0, 1_000_000)?;
        let chunk_size = chunking.get("chunk_size").and_then(|v| v.as_u64());
        let overlap = chunking.get("overlap").and_then(|v| v.as_u64());
        if let (Some(chunk_size), Some(overlap)) = (chunk_size, overlap) {
            if overlap >= chunk_size {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'chunking.overlap': must be smaller than chunking.chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(ingestion) = expect_optional_object(root, "ingestion")? {
        validate_optional_string_field(ingestion, "ingestion.corpus_root", "corpus_root")?;
        validate_u64_field(ingestion, "ingestion.batch_size", "batch_size", 1, 1_000)?;
        validate_u64_field(ingestion, "ingestion.concurrency", "concurrency", 1, 64)?;
        validate_string_array_field(ingestion, "ingestion.extensions", "extensions")?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
    }

    if let Some(prompt) = expect_optional_object(root, "prompt")? {
        validate_optional_string_field(prompt, "prompt.subject", "subject")?;
        validate_string_array_field(prompt, "prompt.general_topics", "general_topics")?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(embedding, "embedding.provider", "provider", &["gemini", "openai"])?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 1, 65_536)?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(
            embedding,
            "embedding.requests_per_minute",
            "requests_per_minute",
            1,
            1_000_000,
        )?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_optional_string_field(generation, "generation.base_url", "base_url")?;
        validate_optional_string_field(generation, "generation.model", "model")?;
        validate_optional_string_field(generation, "generation.api_key", "api_key")?;
        validate_f64_field(generation, "generation.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(generation, "generation.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(generation, "generation.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(index) = expect_optional_object(root, "vector_index")? {
        validate_enum_field(index, "vector_index.provider", "provider", &["qdrant", "memory"])?;
        validate_optional_string_field(index, "vector_index.url", "url")?;
        validate_optional_string_field(index, "vector_index.api_key", "api_key")?;
        validate_optional_string_field(index, "vector_index.collection", "collection")?;
        validate_u64_field(index, "vector_index.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(history) = expect_optional_object(root, "history")? {
        validate_bool_field(history, "history.enabled", "enabled")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_complete_configs() {
        validate_config(&json!({})).expect("empty config is valid");
        validate_config(&json!({
            "server": { "host": "127.0.0.1", "port": 8000 },
            "chunking": { "chunk_size": 1000, "overlap": 100 },
            "ingestion": { "batch_size": 10, "concurrency": 2, "extensions": ["md", "mdx"] },
            "retrieval": { "top_k": 3 },
            "embedding": { "provider": "gemini", "dimension": 768, "api_key": null },
            "generation": { "temperature": 0.7, "max_tokens": 1024 },
            "vector_index": { "provider": "qdrant", "collection": "textbook_content" },
            "history": { "enabled": true }
        }))
        .expect("complete config is valid");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = validate_config(&json!({
            "chunking": { "chunk_size": 100, "overlap": 100 }
        }))
        .expect_err("overlap == chunk_size");
        assert!(err.to_string().contains("chunking.overlap"));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = validate_config(&json!({ "vector_index": { "provider": "pinecone" } }))
            .expect_err("unknown provider");
        assert!(err.to_string().contains("qdrant, memory"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(validate_config(&json!({ "retrieval": { "top_k": 0 } })).is_err());
        assert!(validate_config(&json!({ "generation": { "temperature": 3.5 } })).is_err());
        assert!(validate_config(&json!({ "ingestion": { "batch_size": "ten" } })).is_err());
    }

    #[test]
    fn rejects_non_object_sections() {
        let err = validate_config(&json!({ "history": true })).expect_err("history must be a map");
        assert!(err.to_string().contains("'history': expected object"));
    }
}
