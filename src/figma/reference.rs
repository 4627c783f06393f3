//! Parsing of Figma share URLs into the file key and frame node id the REST API expects.

use url::Url;

use crate::{LayoutCheckError, Result};

/// Path markers that precede the file key in Figma share URLs.
const FILE_KEY_MARKERS: &[&str] = &["file", "design", "proto", "board"];

/// A frame inside a Figma file, identified the way the REST API expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReference {
    pub file_key: String,
    /// Node id in API form (`1:921`), converted from the URL form (`1-921`).
    pub frame_node_id: String,
}

/// Extract `file_key` and `frame_node_id` from a share URL such as
/// `https://www.figma.com/design/ABC123/Title?node-id=1-921&t=xyz`.
pub fn parse_figma_url(value: &str) -> Result<FrameReference> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LayoutCheckError::InvalidReference(
            "Figma URL is empty".to_string(),
        ));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        LayoutCheckError::InvalidReference(format!("'{trimmed}' is not a valid URL: {e}"))
    })?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let file_key = segments
        .iter()
        .position(|s| FILE_KEY_MARKERS.contains(s))
        .and_then(|i| segments.get(i + 1))
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            LayoutCheckError::InvalidReference(format!("Figma URL missing file key: {trimmed}"))
        })?;

    let frame_node_id = url
        .query_pairs()
        .find(|(k, _)| k == "node-id")
        .map(|(_, v)| v.trim().replace('-', ":"))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            LayoutCheckError::InvalidReference(format!("Figma URL missing node-id: {trimmed}"))
        })?;

    Ok(FrameReference {
        file_key,
        frame_node_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_design_url_and_converts_node_id() {
        let reference =
            parse_figma_url("https://www.figma.com/design/ABC123/Title?node-id=1-921&t=xyz")
                .unwrap();
        assert_eq!(reference.file_key, "ABC123");
        assert_eq!(reference.frame_node_id, "1:921");
    }

    #[test]
    fn parses_legacy_file_url() {
        let reference =
            parse_figma_url("https://www.figma.com/file/XYZ789/My-Design?node-id=12-34")
                .unwrap();
        assert_eq!(reference.file_key, "XYZ789");
        assert_eq!(reference.frame_node_id, "12:34");
    }

    #[test]
    fn accepts_percent_encoded_colon() {
        let reference =
            parse_figma_url("https://www.figma.com/design/KEY/T?node-id=5%3A10").unwrap();
        assert_eq!(reference.frame_node_id, "5:10");
    }

    #[test]
    fn missing_node_id_is_invalid_reference() {
        let err = parse_figma_url("https://www.figma.com/design/ABC123/Title").unwrap_err();
        assert!(matches!(err, LayoutCheckError::InvalidReference(msg) if msg.contains("node-id")));
    }

    #[test]
    fn empty_node_id_is_invalid_reference() {
        let err =
            parse_figma_url("https://www.figma.com/design/ABC123/Title?node-id=").unwrap_err();
        assert!(matches!(err, LayoutCheckError::InvalidReference(_)));
    }

    #[test]
    fn missing_file_key_is_invalid_reference() {
        let err = parse_figma_url("https://www.figma.com/design/?node-id=1-2").unwrap_err();
        assert!(matches!(err, LayoutCheckError::InvalidReference(msg) if msg.contains("file key")));
    }

    #[test]
    fn garbage_is_invalid_reference() {
        assert!(matches!(
            parse_figma_url("not a url"),
            Err(LayoutCheckError::InvalidReference(_))
        ));
        assert!(matches!(
            parse_figma_url("   "),
            Err(LayoutCheckError::InvalidReference(_))
        ));
    }
}
