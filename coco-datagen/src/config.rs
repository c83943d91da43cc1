//! Batch generator configuration format.

use crate::common::*;

/// The main generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGenConfig {
    /// The COCO instances JSON file.
    pub annotation_file: PathBuf,
    /// The directory holding the dataset image files.
    pub image_dir: PathBuf,
    /// The fixed output image shape; every sample image is resized into it.
    pub image_shape: ImageShape,
    /// The number of samples per produced batch.
    pub batch_size: NonZeroUsize,
    /// The instance count every per-sample array is padded or truncated to.
    pub max_instances: NonZeroUsize,
    /// If set, keep crowd annotations instead of non-crowd ones.
    #[serde(default)]
    pub include_crowd: bool,
    /// If set, produce mask stacks and mask-derived boxes.
    #[serde(default)]
    pub include_mask: bool,
    /// If set, produce keypoint tensors.
    #[serde(default)]
    pub include_keypoint: bool,
    /// Keypoints per instance; sizes the keypoint tensor.
    #[serde(default = "default_num_keypoints")]
    pub num_keypoints: NonZeroUsize,
    /// Id slices tried before a batch request gives up.
    #[serde(default = "default_max_batch_attempts")]
    pub max_batch_attempts: NonZeroUsize,
    /// Optional RNG seed for reproducible epoch shuffles.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// The target image shape in (height, width, channels) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: NonZeroUsize,
    pub width: NonZeroUsize,
    pub channels: NonZeroUsize,
}

impl ImageShape {
    pub fn hwc(&self) -> (usize, usize, usize) {
        (self.height.get(), self.width.get(), self.channels.get())
    }
}

impl DataGenConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.image_shape.channels.get() == 3,
            "only 3-channel output images are supported, got {}",
            self.image_shape.channels
        );
        Ok(())
    }
}

fn default_num_keypoints() -> NonZeroUsize {
    NonZeroUsize::new(17).unwrap()
}

fn default_max_batch_attempts() -> NonZeroUsize {
    NonZeroUsize::new(16).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_json5() {
        let text = r#"{
            annotation_file: "instances_val2017.json",
            image_dir: "val2017",
            image_shape: { height: 640, width: 640, channels: 3 },
            batch_size: 4,
            max_instances: 100,
            include_mask: true,
        }"#;
        let config: DataGenConfig = json5::from_str(text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.image_shape.hwc(), (640, 640, 3));
        assert_eq!(config.batch_size.get(), 4);
        assert!(config.include_mask);
        assert!(!config.include_crowd);
        assert!(!config.include_keypoint);
        assert_eq!(config.num_keypoints.get(), 17);
        assert_eq!(config.max_batch_attempts.get(), 16);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn config_rejects_bad_channels() {
        let text = r#"{
            annotation_file: "a.json",
            image_dir: "imgs",
            image_shape: { height: 64, width: 64, channels: 1 },
            batch_size: 1,
            max_instances: 10,
        }"#;
        let config: DataGenConfig = json5::from_str(text).unwrap();
        assert!(config.validate().is_err());
    }
}
