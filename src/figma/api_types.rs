//! Figma API response types for the nodes and image export endpoints.

use serde::Deserialize;
use std::collections::HashMap;

/// Export formats the checker requests.
#[derive(Debug, Clone, Copy)]
pub enum ImageFormat {
    Png,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
        }
    }
}

/// Response from the nodes endpoint. Unknown ids come back as `null`.
#[derive(Debug, Deserialize)]
pub struct FigmaNodesResponse {
    #[serde(default)]
    pub nodes: HashMap<String, Option<FigmaNodeWrapper>>,
}

/// Wrapper containing the document for a node.
#[derive(Debug, Deserialize)]
pub struct FigmaNodeWrapper {
    pub document: Option<FigmaNodeData>,
}

/// The subset of a node document the checker needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaNodeData {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    pub absolute_bounding_box: Option<FigmaBoundingBox>,
}

/// Frame size from `absoluteBoundingBox`; the position is not needed.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FigmaBoundingBox {
    pub width: f64,
    pub height: f64,
}

/// Response from the images export endpoint.
#[derive(Debug, Deserialize)]
pub struct FigmaImageExport {
    #[serde(default)]
    pub err: Option<String>,
    #[serde(default)]
    pub images: HashMap<String, Option<String>>,
}
