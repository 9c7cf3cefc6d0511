use clap::Parser;
use pill_vision::pipeline::PipelineConfig;
use std::path::PathBuf;

/// Count the pills in a photographed tray.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image file to count (any format the `image` crate decodes).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Pixels per pill. Overrides the computed default reference size.
    #[arg(long, value_name = "PIXELS", conflicts_with = "calibrate_at")]
    pub reference: Option<f64>,

    /// Calibrate by "clicking" the blob at X,Y, which is known to be one pill.
    #[arg(long, value_name = "X,Y", value_parser = parse_click)]
    pub calibrate_at: Option<(f64, f64)>,

    /// Directory to write gray/blurred/mask/eroded PNGs into.
    #[arg(long, value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Print a JSON report instead of text.
    #[arg(long)]
    pub json: bool,

    /// Smallest blob size floor, in pixels.
    #[arg(long, default_value_t = PipelineConfig::default().min_blob_floor, value_name = "PIXELS")]
    pub min_blob_floor: f64,

    /// Number of erosion passes applied to the mask.
    #[arg(long, default_value_t = PipelineConfig::default().erosion_passes, value_name = "COUNT")]
    pub erosion_passes: u32,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            min_blob_floor: self.min_blob_floor,
            erosion_passes: self.erosion_passes,
            ..PipelineConfig::default()
        }
    }
}

fn parse_click(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{s}`"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X `{x}`: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y `{y}`: {e}"))?;
    Ok((x, y))
}
