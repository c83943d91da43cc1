use super::record::*;
use crate::common::*;

/// In-memory index over one COCO instances file.
///
/// Annotation order within an image follows the file order, so downstream
/// truncation keeps the first annotations as stored.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    images: IndexMap<u64, ImageRecord>,
    annotations: Vec<AnnotationRecord>,
    ann_index: IndexMap<u64, usize>,
    img_to_anns: IndexMap<u64, Vec<usize>>,
    categories: HashMap<u64, String>,
}

impl AnnotationStore {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let instances: Instances = serde_json::from_str(text)?;
        Self::from_instances(instances)
    }

    pub fn from_instances(instances: Instances) -> Result<Self> {
        let Instances {
            images,
            annotations,
            categories,
        } = instances;

        if images.is_empty() {
            warn!("annotation source has no images");
        }
        if categories.is_empty() {
            warn!("annotation source has no categories");
        }

        let images: IndexMap<u64, ImageRecord> =
            images.into_iter().map(|image| (image.id, image)).collect();
        let categories: HashMap<u64, String> = categories
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();

        let annotations: Vec<AnnotationRecord> = annotations
            .into_iter()
            .filter(|ann| {
                let known = images.contains_key(&ann.image_id);
                if !known {
                    warn!(
                        "dropping annotation {}: unknown image id {}",
                        ann.id, ann.image_id
                    );
                }
                known
            })
            .collect();

        annotations.iter().try_for_each(|ann| {
            ensure!(
                categories.contains_key(&ann.category_id),
                "invalid category id {} in annotation {}",
                ann.category_id,
                ann.id
            );
            Ok(())
        })?;

        let ann_index: IndexMap<u64, usize> = annotations
            .iter()
            .enumerate()
            .map(|(index, ann)| (ann.id, index))
            .collect();

        let mut img_to_anns: IndexMap<u64, Vec<usize>> = IndexMap::new();
        for (index, ann) in annotations.iter().enumerate() {
            img_to_anns.entry(ann.image_id).or_default().push(index);
        }

        Ok(Self {
            images,
            annotations,
            ann_index,
            img_to_anns,
            categories,
        })
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    pub fn num_annotations(&self) -> usize {
        self.annotations.len()
    }

    pub fn category_name(&self, category_id: u64) -> Option<&str> {
        self.categories.get(&category_id).map(String::as_str)
    }

    pub fn image(&self, image_id: u64) -> Result<&ImageRecord> {
        self.images
            .get(&image_id)
            .ok_or_else(|| format_err!("invalid image id {}", image_id))
    }

    pub fn annotation(&self, annotation_id: u64) -> Result<&AnnotationRecord> {
        let index = *self
            .ann_index
            .get(&annotation_id)
            .ok_or_else(|| format_err!("invalid annotation id {}", annotation_id))?;
        Ok(&self.annotations[index])
    }

    /// Annotations of one image whose crowd flag matches the policy.
    pub fn annotations(&self, image_id: u64, include_crowd: bool) -> Vec<&AnnotationRecord> {
        self.img_to_anns
            .get(&image_id)
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|&index| &self.annotations[index])
                    .filter(|ann| ann.iscrowd == include_crowd)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Image ids carrying at least one annotation that matches the policy.
    pub fn image_ids(&self, include_crowd: bool) -> Vec<u64> {
        self.img_to_anns
            .iter()
            .filter(|(_, indexes)| {
                indexes
                    .iter()
                    .any(|&index| self.annotations[index].iscrowd == include_crowd)
            })
            .map(|(&image_id, _)| image_id)
            .collect()
    }

    /// Rasterize an annotation's segmentation into a row-major 0/1 mask of
    /// the owning image's size.
    pub fn ann_to_mask(&self, ann: &AnnotationRecord) -> Result<Array2<u8>> {
        let image = self.image(ann.image_id)?;
        let h = image.height as usize;
        let w = image.width as usize;

        let segmentation = ann
            .segmentation
            .as_ref()
            .ok_or_else(|| format_err!("annotation {} has no segmentation", ann.id))?;

        let column_major = match segmentation {
            Segmentation::Polygons(polygons) => coco_mask::rasterize_polygons(polygons, h, w),
            Segmentation::Rle(rle) => {
                let [rle_h, rle_w] = rle.size;
                ensure!(
                    rle_h as usize == h && rle_w as usize == w,
                    "RLE size ({}, {}) does not match image size ({}, {}) in annotation {}",
                    rle_h,
                    rle_w,
                    h,
                    w,
                    ann.id
                );
                match &rle.counts {
                    RleCounts::Raw(counts) => coco_mask::decode_counts(counts, h, w),
                    RleCounts::Encoded(text) => {
                        coco_mask::decode_counts(&coco_mask::counts_from_string(text), h, w)
                    }
                }
            }
        };

        let mut mask = Array2::zeros((h, w));
        for x in 0..w {
            for y in 0..h {
                mask[(y, x)] = column_major[y + h * x];
            }
        }
        Ok(mask)
    }
}
