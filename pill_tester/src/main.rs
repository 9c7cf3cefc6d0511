mod args;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pill_vision::core_modules::utils::image_helper::save_stages;
use pill_vision::pipeline::{Blob, ClickOutcome, CountingPipeline, PixelBuffer, Point};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct Report<'a> {
    image: String,
    width: u32,
    height: u32,
    blobs: &'a [Blob],
    default_reference_size: f64,
    reference: f64,
    count: usize,
    points: &'a [Point],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = args::Args::parse();

    // --- 1. Decode ---
    let decoded = image::open(&args.image).with_context(|| format!("failed to open {}", args.image.display()))?;
    let buffer = PixelBuffer::from(&decoded);
    info!(width = buffer.width(), height = buffer.height(), "decoded {}", args.image.display());

    // --- 2. Segment ---
    let pipeline = CountingPipeline::new(args.pipeline_config())?;
    let (detection, stages) = pipeline.segment_with_stages(&buffer)?;
    drop(buffer);

    if let Some(dir) = &args.dump_dir {
        let written = save_stages(dir, &stages).with_context(|| format!("failed to write stages to {}", dir.display()))?;
        info!(files = written.len(), "wrote stage images to {}", dir.display());
    }
    drop(stages);

    // --- 3. Calibrate ---
    let mut session = pipeline.calibration_session(detection);
    let reference = match (args.reference, args.calibrate_at) {
        (Some(reference), _) => reference,
        (None, Some((x, y))) => {
            session.begin();
            match session.click(x, y) {
                ClickOutcome::Calibrated { blob_index, reference } => {
                    info!(blob_index, reference, "calibrated on the blob at ({x}, {y})");
                    reference
                }
                ClickOutcome::Missed => bail!("no blob at ({x}, {y}) to calibrate on"),
                ClickOutcome::Ignored => bail!("calibration session did not accept the click"),
            }
        }
        (None, None) => session.reference(),
    };
    if reference <= 0.0 {
        warn!("no reference size, counting one pill per blob");
    }

    // --- 4. Estimate ---
    let detection = session.detection();
    let points = pipeline.estimate_points(&detection.blobs, reference);

    if args.json {
        let report = Report {
            image: args.image.display().to_string(),
            width: detection.width,
            height: detection.height,
            blobs: &detection.blobs,
            default_reference_size: detection.default_reference_size,
            reference,
            count: points.len(),
            points: &points,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Pill count: {}", points.len());
    println!(
        "Reference size: {:.1} px (default {:.1} px)",
        reference, detection.default_reference_size
    );
    println!("Blobs: {}", detection.blobs.len());
    for (i, blob) in detection.blobs.iter().enumerate() {
        println!(
            "  #{:<3} {:>7} px at ({:.1}, {:.1})",
            i, blob.pixel_count, blob.centroid.x, blob.centroid.y
        );
    }

    Ok(())
}
