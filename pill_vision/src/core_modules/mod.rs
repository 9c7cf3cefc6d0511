// Stages in pipeline order, followed by shared types and helpers.
pub mod grayscale;
pub mod noise_filter;
pub mod binarizer;
pub mod morphology;
pub mod labeler;
pub mod blob_filter;
pub mod calibrator;
pub mod point_estimator;

pub mod binary_mask;
pub mod blob;
pub mod calibration;
pub mod pixel_buffer;
pub mod utils;
