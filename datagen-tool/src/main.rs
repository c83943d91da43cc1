use anyhow::{Context, Result};
use coco_datagen::{config::DataGenConfig, generator::BatchGenerator};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Load a COCO dataset and produce fixed-shape training batches.
struct Args {
    #[structopt(long, default_value = "datagen.json5")]
    /// configuration file
    config_file: PathBuf,
    #[structopt(long, default_value = "1")]
    /// number of batches to produce
    num_batches: usize,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let Args {
        config_file,
        num_batches,
    } = Args::from_args();
    let config = DataGenConfig::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    let mut generator = BatchGenerator::new(config)?;
    info!(
        "{} eligible images, {} batches per epoch",
        generator.num_eligible(),
        generator.batches_per_epoch()
    );

    for index in 0..num_batches {
        let batch = generator.next_batch()?;
        let (batch_size, height, width, channels) = batch.imgs.dim();
        info!(
            "batch {}: imgs ({}, {}, {}, {}), bboxes {:?}, labels {:?}, masks {}, keypoints {}",
            index,
            batch_size,
            height,
            width,
            channels,
            batch.bboxes.dim(),
            batch.labels.dim(),
            batch
                .masks
                .as_ref()
                .map(|masks| format!("{:?}", masks.dim()))
                .unwrap_or_else(|| "off".to_owned()),
            batch
                .keypoints
                .as_ref()
                .map(|keypoints| format!("{:?}", keypoints.dim()))
                .unwrap_or_else(|| "off".to_owned()),
        );
    }

    Ok(())
}
