//! Batch assembly over an annotation store.

use crate::{
    common::*,
    config::DataGenConfig,
    dataset::AnnotationStore,
    processor::{Sample, SampleBuilder},
};

/// One fixed-shape training batch.
///
/// Every instance-level array is padded or truncated to the configured
/// `max_instances`, so all batches share the same shape.
#[derive(Debug, Clone)]
pub struct Batch {
    /// (batch, height, width, channel) pixel values.
    pub imgs: Array4<i32>,
    /// (batch, max_instances, 4) boxes in (xmin, ymin, xmax, ymax) order.
    pub bboxes: Array3<i16>,
    /// (batch, max_instances) category ids; padding rows are zero.
    pub labels: Array2<i8>,
    /// (batch, max_instances, height, width) 0/1 masks, when enabled.
    pub masks: Option<Array4<i8>>,
    /// (batch, max_instances, num_keypoints, 3) triples, when enabled.
    pub keypoints: Option<Array4<i16>>,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.imgs.dim().0
    }
}

/// Sequential batch producer with epoch bookkeeping.
///
/// The first pass over the dataset follows annotation file order; the id list
/// is shuffled at every epoch rollover.
#[derive(Debug)]
pub struct BatchGenerator {
    config: DataGenConfig,
    store: AnnotationStore,
    image_ids: Vec<u64>,
    cursor: usize,
    rng: StdRng,
}

impl BatchGenerator {
    pub fn new(config: DataGenConfig) -> Result<Self> {
        config.validate()?;
        let store = AnnotationStore::open(&config.annotation_file)?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: DataGenConfig, store: AnnotationStore) -> Result<Self> {
        config.validate()?;
        let image_ids = store.image_ids(config.include_crowd);
        ensure!(
            image_ids.len() >= config.batch_size.get(),
            "{} eligible images cannot fill a batch of {}",
            image_ids.len(),
            config.batch_size
        );

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "loaded {} annotations over {} images, {} eligible",
            store.num_annotations(),
            store.num_images(),
            image_ids.len()
        );

        Ok(Self {
            config,
            store,
            image_ids,
            cursor: 0,
            rng,
        })
    }

    pub fn num_eligible(&self) -> usize {
        self.image_ids.len()
    }

    /// Full batches per pass; the trailing remainder of ids is skipped.
    pub fn batches_per_epoch(&self) -> usize {
        self.image_ids.len() / self.config.batch_size.get()
    }

    /// Rewind to the start of the current id order without shuffling.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Rewind and reshuffle the id order, as at an epoch rollover.
    pub fn advance_epoch(&mut self) {
        self.cursor = 0;
        self.image_ids.shuffle(&mut self.rng);
    }

    /// Produce the next batch, consuming id slices until one yields a full
    /// batch of decodable images or the attempt limit is hit.
    pub fn next_batch(&mut self) -> Result<Batch> {
        let batch_size = self.config.batch_size.get();

        for _ in 0..self.config.max_batch_attempts.get() {
            if self.cursor >= self.batches_per_epoch() {
                self.advance_epoch();
            }
            let start = self.cursor * batch_size;
            self.cursor += 1;

            let builder = SampleBuilder::new(&self.store, &self.config);
            let slice = &self.image_ids[start..start + batch_size];
            let mut samples = Vec::with_capacity(batch_size);
            for &image_id in slice {
                let sample = builder.build(image_id)?;
                if sample.image.is_some() {
                    samples.push(sample);
                }
            }

            if samples.len() == batch_size {
                return self.assemble(samples);
            }
            warn!(
                "discarding short batch of {} samples, retrying with the next id slice",
                samples.len()
            );
        }

        bail!(
            "failed to assemble a full batch of {} after {} attempts: insufficient decodable images",
            batch_size,
            self.config.max_batch_attempts
        )
    }

    fn assemble(&self, samples: Vec<Sample>) -> Result<Batch> {
        let (tgt_h, tgt_w, _) = self.config.image_shape.hwc();
        let max_instances = self.config.max_instances.get();
        let num_keypoints = self.config.num_keypoints.get();

        let images: Vec<Array3<i32>> = samples
            .iter()
            .map(|sample| {
                sample
                    .image
                    .clone()
                    .ok_or_else(|| format_err!("sample without image reached assembly"))
            })
            .try_collect()?;
        let image_views: Vec<_> = images.iter().map(|image| image.view()).collect();
        let imgs = ndarray::stack(Axis(0), &image_views)?;

        let padded_boxes: Vec<Array2<i16>> = samples
            .iter()
            .map(|sample| {
                let mut out = Array2::zeros((max_instances, 4));
                for (row, bbox) in sample.bboxes.iter().take(max_instances).enumerate() {
                    let [xmin, ymin, xmax, ymax] = bbox.xyxy();
                    out[(row, 0)] = xmin;
                    out[(row, 1)] = ymin;
                    out[(row, 2)] = xmax;
                    out[(row, 3)] = ymax;
                }
                out
            })
            .collect();
        let box_views: Vec<_> = padded_boxes.iter().map(|boxes| boxes.view()).collect();
        let bboxes = ndarray::stack(Axis(0), &box_views)?;

        let padded_labels: Vec<Array1<i8>> = samples
            .iter()
            .map(|sample| {
                let mut out = Array1::zeros(max_instances);
                for (row, &label) in sample.labels.iter().take(max_instances).enumerate() {
                    out[row] = label;
                }
                out
            })
            .collect();
        let label_views: Vec<_> = padded_labels.iter().map(|labels| labels.view()).collect();
        let labels = ndarray::stack(Axis(0), &label_views)?;

        let masks = if self.config.include_mask {
            let padded: Vec<Array3<i8>> = samples
                .iter()
                .map(|sample| -> Result<Array3<i8>> {
                    let stack = sample
                        .masks
                        .as_ref()
                        .ok_or_else(|| format_err!("sample without masks reached assembly"))?;
                    let keep = stack.dim().0.min(max_instances);
                    let mut out = Array3::zeros((max_instances, tgt_h, tgt_w));
                    out.slice_mut(s![..keep, .., ..])
                        .assign(&stack.slice(s![..keep, .., ..]));
                    Ok(out)
                })
                .try_collect()?;
            let views: Vec<_> = padded.iter().map(|masks| masks.view()).collect();
            Some(ndarray::stack(Axis(0), &views)?)
        } else {
            None
        };

        let keypoints = if self.config.include_keypoint {
            let padded: Vec<Array3<i16>> = samples
                .iter()
                .map(|sample| -> Result<Array3<i16>> {
                    let blocks = sample
                        .keypoints
                        .as_ref()
                        .ok_or_else(|| format_err!("sample without keypoints reached assembly"))?;
                    let mut out = Array3::zeros((max_instances, num_keypoints, 3));
                    for (row, block) in blocks.iter().take(max_instances).enumerate() {
                        ensure!(
                            block.dim() == (num_keypoints, 3),
                            "keypoint block of shape {:?} does not match ({}, 3)",
                            block.dim(),
                            num_keypoints
                        );
                        out.slice_mut(s![row, .., ..]).assign(block);
                    }
                    Ok(out)
                })
                .try_collect()?;
            let views: Vec<_> = padded.iter().map(|keypoints| keypoints.view()).collect();
            Some(ndarray::stack(Axis(0), &views)?)
        } else {
            None
        };

        Ok(Batch {
            imgs,
            bboxes,
            labels,
            masks,
            keypoints,
        })
    }
}
