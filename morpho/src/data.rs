//! Data is read from the file system and handed to views when they are
//! rendered.

use std::{fs, path::Path};

use eyre::Result;
use log::debug;
use serde_json::{Map, Value as JsonValue};

use crate::Error;

/// Load arbitrary structured data from the given text file.
///
/// JSON (`.json`), YAML (`.yml`, `.yaml`) and Markdown with optional YAML
/// front matter (`.md`) are supported.
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<JsonValue> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| Error::CannotDetermineDataFileType(path.to_path_buf()))?;
    let content =
        fs::read_to_string(path).map_err(|e| Error::Io(path.display().to_string(), e))?;
    debug!("Loading {} data from {}", ext, path.display());
    match ext {
        "json" => Ok(serde_json::from_str(&content).map_err(Error::from)?),
        "yml" | "yaml" => Ok(serde_yaml::from_str(&content).map_err(Error::from)?),
        "md" => parse_markdown(&content),
        _ => Err(Error::CannotDetermineDataFileType(path.to_path_buf()).into()),
    }
}

fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    const DELIMITERS: &[&str] = &["---\n", "---\r\n"];
    for delim in DELIMITERS {
        if let Some(rest) = content.strip_prefix(delim) {
            // Empty front matter.
            if let Some(body) = rest.strip_prefix(delim) {
                return (Some(""), body);
            }
            let closing = format!("\n{}", delim);
            if let Some((front_matter, body)) = rest.split_once(closing.as_str()) {
                return (Some(front_matter), body);
            }
        }
    }
    (None, content)
}

// Given a Markdown file that looks as follows:
//
// ```
// ---
// title: The Title
// published: 2022-01-02
// ---
// Raw markdown content goes **here**.
// ```
//
// this method parses a Markdown file into an object whose JSON representation
// looks like:
//
// {
//   "title": "The Title",
//   "published": "2022-01-02",
//   "content": "Raw markdown content goes **here**.\n",
// }
fn parse_markdown(content: &str) -> Result<JsonValue> {
    let (maybe_front_matter, content) = split_front_matter(content);
    let obj = match maybe_front_matter {
        Some(front_matter) if front_matter.trim().is_empty() => JsonValue::Null,
        Some(front_matter) => {
            serde_yaml::from_str::<JsonValue>(front_matter).map_err(Error::from)?
        }
        None => JsonValue::Object(Map::new()),
    };
    match obj {
        JsonValue::Object(mut o) => {
            o.insert("content".to_string(), JsonValue::String(content.to_string()));
            Ok(JsonValue::Object(o))
        }
        JsonValue::Null => {
            let mut o = Map::new();
            o.insert("content".to_string(), JsonValue::String(content.to_string()));
            Ok(JsonValue::Object(o))
        }
        _ => Err(Error::InvalidMarkdownFrontMatter(
            "front matter must be an object".to_string(),
        )
        .into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    const DATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/data");

    #[test]
    fn json_and_yaml_load_identically() {
        let from_json = load_data(format!("{}/greeting.json", DATA)).unwrap();
        let from_yaml = load_data(format!("{}/greeting.yaml", DATA)).unwrap();
        assert_eq!(from_json, json!({ "name": "world", "tags": ["a", "b"] }));
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn markdown_with_front_matter() {
        let post = load_data(format!("{}/post.md", DATA)).unwrap();
        assert_eq!(
            post,
            json!({
                "title": "The Title",
                "published": "2022-01-02",
                "content": "Raw markdown content goes **here**.\n",
            })
        );
    }

    #[test]
    fn markdown_without_front_matter() {
        let post = parse_markdown("# Heading\n").unwrap();
        assert_eq!(post, json!({ "content": "# Heading\n" }));
    }

    #[test]
    fn markdown_with_empty_front_matter() {
        let post = parse_markdown("---\n---\nbody\n").unwrap();
        assert_eq!(post, json!({ "content": "body\n" }));

        let post = parse_markdown("---\n\n---\nbody\n").unwrap();
        assert_eq!(post, json!({ "content": "body\n" }));

        let post = parse_markdown("---\r\n---\r\nbody\r\n").unwrap();
        assert_eq!(post, json!({ "content": "body\r\n" }));
    }

    #[test]
    fn non_object_front_matter_is_rejected() {
        let err = parse_markdown("---\n- a\n- b\n---\nbody\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidMarkdownFrontMatter(_))
        ));
    }

    #[test]
    fn unsupported_data_file_type() {
        let err = load_data(format!("{}/greeting.toml", DATA)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::CannotDetermineDataFileType(_))
        ));
    }
}
