//! Loading input documents from a file or stdin.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// `-` reads stdin.
pub fn load(path: &Path) -> Result<Value> {
    let (text, origin) = if path == Path::new("-") {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| anyhow!("failed to read stdin: {e}"))?;
        (input, "<stdin>".to_string())
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        (text, path.display().to_string())
    };
    parse(&text, &origin)
}

pub fn parse(text: &str, origin: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Err(anyhow!("{origin}: expected a JSON document, got nothing"));
    }
    let value: Value =
        serde_json::from_str(text).with_context(|| format!("{origin}: invalid JSON"))?;
    if !value.is_object() {
        return Err(anyhow!("{origin}: the document must be a JSON object"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_origin_on_bad_input() {
        let err = parse("{", "cities.json").unwrap_err();
        assert!(format!("{err:#}").starts_with("cities.json: invalid JSON"));

        let err = parse("[1, 2]", "<stdin>").unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));

        assert!(parse("  \n", "x.json").is_err());
    }

    #[test]
    fn loads_documents_from_disk() {
        let path = std::env::temp_dir().join(format!("protoquery-load-{}.json", std::process::id()));
        fs::write(&path, r#"{"proto": {"id": "?id"}}"#).unwrap();
        let value = load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(value["proto"]["id"], "?id");

        let missing = Path::new("/nonexistent/protoquery.json");
        let err = load(missing).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/protoquery.json"));
    }
}
