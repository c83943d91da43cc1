use super::geometry;
use crate::{
    common::*,
    config::DataGenConfig,
    dataset::{AnnotationRecord, AnnotationStore},
};
use bbox::{Hw, PixelBox};

/// One image's normalized annotation set, resized into the target shape.
///
/// `image` is `None` when the source file failed to decode; the batch layer
/// drops such samples. Instance-level fields share one instance axis.
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: Option<Array3<i32>>,
    pub bboxes: Vec<PixelBox<i16>>,
    pub labels: Vec<i8>,
    pub masks: Option<Array3<i8>>,
    pub keypoints: Option<Vec<Array2<i16>>>,
}

impl Sample {
    fn empty() -> Self {
        Self {
            image: None,
            bboxes: Vec::new(),
            labels: Vec::new(),
            masks: None,
            keypoints: None,
        }
    }

    pub fn num_instances(&self) -> usize {
        self.labels.len()
    }
}

/// Builds one sample per image id from the backing store.
///
/// Keypoints are carried through in source-image coordinates; they are not
/// rescaled alongside the image.
#[derive(Debug)]
pub struct SampleBuilder<'a> {
    store: &'a AnnotationStore,
    config: &'a DataGenConfig,
}

impl<'a> SampleBuilder<'a> {
    pub fn new(store: &'a AnnotationStore, config: &'a DataGenConfig) -> Self {
        Self { store, config }
    }

    pub fn build(&self, image_id: u64) -> Result<Sample> {
        let (tgt_h, tgt_w, tgt_c) = self.config.image_shape.hwc();
        let annotations = self.store.annotations(image_id, self.config.include_crowd);

        let mut raw_boxes: Vec<PixelBox<f64>> = Vec::with_capacity(annotations.len());
        let mut labels: Vec<i8> = Vec::with_capacity(annotations.len());
        let mut masks: Vec<Array2<u8>> = Vec::new();
        let mut keypoints: Vec<Array2<i16>> = Vec::new();

        for ann in &annotations {
            raw_boxes.push(corner_box(ann));
            labels.push(ann.category_id as i8);
            if self.config.include_mask {
                masks.push(self.store.ann_to_mask(ann)?);
            }
            if self.config.include_keypoint {
                keypoints.push(keypoint_triples(ann, self.config.num_keypoints.get()));
            }
        }

        let record = self.store.image(image_id)?;
        let path = self.config.image_dir.join(&record.file_name);
        let decoded = match image::open(&path) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(
                    "skipping image {}: failed to decode '{}': {}",
                    image_id,
                    path.display(),
                    err
                );
                return Ok(Sample::empty());
            }
        };

        let pixels = match decoded {
            image::DynamicImage::ImageLuma8(gray) => {
                let (w, h) = gray.dimensions();
                let plane = Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
                    gray.get_pixel(x as u32, y as u32).0[0] as i32
                });
                geometry::promote_gray(&plane, tgt_c)
            }
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
                    rgb.get_pixel(x as u32, y as u32).0[c] as i32
                })
            }
        };

        let (src_h, src_w, _) = pixels.dim();
        let src_size = Hw::from_hw([src_h, src_w]);
        let scale = geometry::compute_scale(src_size.long_side(), tgt_h);
        let image = geometry::resize_image(&pixels, scale, (tgt_h, tgt_w, tgt_c))?;

        // Mask-derived boxes supersede the raw annotation boxes.
        let (bboxes, mask_stack) = if self.config.include_mask {
            let mut resized = Vec::with_capacity(masks.len());
            let mut derived = Vec::with_capacity(masks.len());
            for mask in &masks {
                let (mask, bbox) = geometry::resize_mask(mask, scale, (tgt_h, tgt_w))?;
                resized.push(mask);
                derived.push(bbox);
            }
            let stack = if resized.is_empty() {
                Array3::zeros((0, tgt_h, tgt_w))
            } else {
                let views: Vec<_> = resized.iter().map(|mask| mask.view()).collect();
                ndarray::stack(Axis(0), &views)?
            };
            (derived, Some(stack))
        } else {
            (geometry::resize_boxes(&raw_boxes, scale), None)
        };

        ensure!(
            bboxes.len() == labels.len(),
            "instance count mismatch: {} boxes vs {} labels",
            bboxes.len(),
            labels.len()
        );
        if let Some(stack) = &mask_stack {
            ensure!(
                stack.dim().0 == labels.len(),
                "instance count mismatch: {} masks vs {} labels",
                stack.dim().0,
                labels.len()
            );
        }

        Ok(Sample {
            image: Some(image),
            bboxes,
            labels,
            masks: mask_stack,
            keypoints: self.config.include_keypoint.then(|| keypoints),
        })
    }
}

/// COCO (left, top, width, height) to truncated integer corners.
fn corner_box(ann: &AnnotationRecord) -> PixelBox<f64> {
    let [x, y, w, h] = ann.bbox;
    let xmin = x.trunc();
    let ymin = y.trunc();
    PixelBox::from_xyxy([xmin, ymin, (xmin + w).trunc(), (ymin + h).trunc()])
}

/// Reshape the flat keypoint list into (x, y, visibility) rows; instances
/// without keypoints produce an all-zero block (visibility 0 = absent).
fn keypoint_triples(ann: &AnnotationRecord, num_keypoints: usize) -> Array2<i16> {
    let mut out = Array2::zeros((num_keypoints, 3));
    if let Some(flat) = &ann.keypoints {
        for (row, triple) in flat.chunks_exact(3).take(num_keypoints).enumerate() {
            for (col, &value) in triple.iter().enumerate() {
                out[(row, col)] = value as i16;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("coco-datagen-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_rgb(dir: &Path, name: &str, w: u32, h: u32) {
        let buffer = image::RgbImage::from_pixel(w, h, image::Rgb([100, 150, 200]));
        buffer.save(dir.join(name)).unwrap();
    }

    fn write_gray(dir: &Path, name: &str, w: u32, h: u32) {
        let buffer = image::GrayImage::from_pixel(w, h, image::Luma([120]));
        buffer.save(dir.join(name)).unwrap();
    }

    fn config(image_dir: &Path) -> DataGenConfig {
        json5::from_str(&format!(
            r#"{{
                annotation_file: "unused.json",
                image_dir: "{}",
                image_shape: {{ height: 64, width: 64, channels: 3 }},
                batch_size: 1,
                max_instances: 8,
            }}"#,
            image_dir.display()
        ))
        .unwrap()
    }

    fn store(json: &str) -> AnnotationStore {
        AnnotationStore::from_json(json).unwrap()
    }

    #[test]
    fn builds_boxes_and_labels() {
        let dir = test_dir("sample-basic");
        write_rgb(&dir, "a.png", 40, 30);

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "a.png", "width": 40, "height": 30}],
            "annotations": [
                {"id": 10, "image_id": 1, "category_id": 3, "bbox": [10.0, 5.0, 20.0, 10.0]},
                {"id": 11, "image_id": 1, "category_id": 7, "bbox": [0.0, 0.0, 40.0, 30.0]}
            ],
            "categories": [{"id": 3, "name": "cat"}, {"id": 7, "name": "dog"}]
        }"#,
        );
        let config = config(&dir);
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        assert_eq!(sample.image.as_ref().unwrap().dim(), (64, 64, 3));
        assert_eq!(sample.num_instances(), 2);
        assert_eq!(sample.labels, vec![3, 7]);
        // scale = 64 / 40 = 1.6
        assert_eq!(sample.bboxes[0].xyxy(), [16, 8, 48, 24]);
        assert_eq!(sample.bboxes[1].xyxy(), [0, 0, 64, 48]);
        assert!(sample.masks.is_none());
        assert!(sample.keypoints.is_none());
    }

    #[test]
    fn zero_annotation_image_still_resizes() {
        let dir = test_dir("sample-noann");
        write_rgb(&dir, "a.png", 32, 32);

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "a.png", "width": 32, "height": 32}],
            "annotations": [],
            "categories": [{"id": 1, "name": "cat"}]
        }"#,
        );
        let config = config(&dir);
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        assert!(sample.image.is_some());
        assert!(sample.bboxes.is_empty());
        assert!(sample.labels.is_empty());
    }

    #[test]
    fn decode_failure_yields_empty_sample() {
        let dir = test_dir("sample-missing");

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "nope.png", "width": 32, "height": 32}],
            "annotations": [{"id": 10, "image_id": 1, "category_id": 1, "bbox": [0, 0, 5, 5]}],
            "categories": [{"id": 1, "name": "cat"}]
        }"#,
        );
        let config = config(&dir);
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        assert!(sample.image.is_none());
        assert!(sample.bboxes.is_empty());
        assert!(sample.labels.is_empty());
    }

    #[test]
    fn grayscale_promotes_with_zero_channels() {
        let dir = test_dir("sample-gray");
        write_gray(&dir, "g.png", 32, 32);

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "g.png", "width": 32, "height": 32}],
            "annotations": [{"id": 10, "image_id": 1, "category_id": 1, "bbox": [0, 0, 5, 5]}],
            "categories": [{"id": 1, "name": "cat"}]
        }"#,
        );
        let config = config(&dir);
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        let image = sample.image.unwrap();
        assert_eq!(image[(10, 10, 0)], 120);
        assert_eq!(image[(10, 10, 1)], 0);
        assert_eq!(image[(10, 10, 2)], 0);
    }

    #[test]
    fn mask_mode_supersedes_raw_boxes() {
        let dir = test_dir("sample-mask");
        write_rgb(&dir, "a.png", 32, 32);

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "a.png", "width": 32, "height": 32}],
            "annotations": [{
                "id": 10, "image_id": 1, "category_id": 1, "bbox": [0.0, 0.0, 32.0, 32.0],
                "iscrowd": 1,
                "segmentation": {"size": [32, 32], "counts": [264, 8, 24, 8, 24, 8, 24, 8, 24, 8, 24, 8, 24, 8, 24, 8, 528]}
            }],
            "categories": [{"id": 1, "name": "cat"}]
        }"#,
        );
        let mut config = config(&dir);
        config.include_mask = true;
        config.include_crowd = true;
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        let masks = sample.masks.unwrap();
        assert_eq!(masks.dim(), (1, 64, 64));
        assert!(masks.iter().all(|&v| v == 0 || v == 1));
        assert!(masks.iter().any(|&v| v == 1));

        // derived from the resized mask, not the raw [0, 0, 32, 32] box
        let [xmin, ymin, xmax, ymax] = sample.bboxes[0].xyxy();
        assert!(xmax < 64 && ymax < 64);
        assert!(xmin > 0 && ymin > 0);
        assert!(xmin <= xmax && ymin <= ymax);
    }

    #[test]
    fn keypoints_pass_through_unscaled() {
        let dir = test_dir("sample-kp");
        write_rgb(&dir, "a.png", 32, 32);

        let store = store(
            r#"{
            "images": [{"id": 1, "file_name": "a.png", "width": 32, "height": 32}],
            "annotations": [
                {"id": 10, "image_id": 1, "category_id": 1, "bbox": [0, 0, 5, 5],
                 "keypoints": [10.0, 20.0, 2.0, 30.0, 40.0, 1.0]},
                {"id": 11, "image_id": 1, "category_id": 1, "bbox": [1, 1, 5, 5]}
            ],
            "categories": [{"id": 1, "name": "cat"}]
        }"#,
        );
        let mut config = config(&dir);
        config.include_keypoint = true;
        config.num_keypoints = NonZeroUsize::new(2).unwrap();
        let sample = SampleBuilder::new(&store, &config).build(1).unwrap();

        let keypoints = sample.keypoints.unwrap();
        assert_eq!(keypoints.len(), 2);
        assert_eq!(keypoints[0][(0, 0)], 10);
        assert_eq!(keypoints[0][(0, 1)], 20);
        assert_eq!(keypoints[0][(0, 2)], 2);
        assert_eq!(keypoints[0][(1, 0)], 30);
        // the second annotation has no keypoints: all-zero block
        assert!(keypoints[1].iter().all(|&v| v == 0));
    }

    #[test]
    fn corner_box_truncates_left_top_first() {
        let ann: AnnotationRecord = serde_json::from_str(
            r#"{"id": 1, "image_id": 1, "category_id": 1, "bbox": [10.7, 20.3, 5.9, 4.8]}"#,
        )
        .unwrap();
        assert_eq!(corner_box(&ann).xyxy(), [10.0, 20.0, 15.0, 24.0]);
    }
}
