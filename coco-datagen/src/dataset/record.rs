//! Serde schema for COCO instances files.
//!
//! Format specification: https://cocodataset.org/#format-data

use crate::common::*;

/// Top-level structure of an instances JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instances {
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub coco_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// COCO (left, top, width, height) in pixels.
    pub bbox: [f64; 4],
    #[serde(default)]
    pub area: Option<f64>,
    /// Either 0/1 or a bool in the wild.
    #[serde(default, deserialize_with = "deserialize_iscrowd")]
    pub iscrowd: bool,
    #[serde(default)]
    pub segmentation: Option<Segmentation>,
    /// Flat [x, y, visibility] triples; visibility 0 = absent, 1 = occluded,
    /// 2 = visible.
    #[serde(default)]
    pub keypoints: Option<Vec<f64>>,
    #[serde(default)]
    pub num_keypoints: Option<u32>,
}

/// Polygon lists for discrete objects, RLE for crowd regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    Polygons(Vec<Vec<f64>>),
    Rle(RleRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RleRecord {
    /// (height, width) of the encoded mask.
    pub size: [u32; 2],
    pub counts: RleCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    Raw(Vec<u32>),
    Encoded(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub supercategory: String,
}

fn deserialize_iscrowd<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IsCrowd {
        Bool(bool),
        Int(u8),
    }

    match IsCrowd::deserialize(deserializer)? {
        IsCrowd::Bool(value) => Ok(value),
        IsCrowd::Int(value) => Ok(value != 0),
    }
}
