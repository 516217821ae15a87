//! MNIST images and IDX file decoding
//!
//! IDX files start with a big-endian header: a magic number (2051 for images,
//! 2049 for labels), the item count and, for images, the row and column counts.
//! The payload follows as one unsigned byte per pixel or label.

use std::fs;
use std::path::Path;

use crate::error::{NetworkError, Result};

/// Pixels per image (28 × 28).
pub const IMAGE_SIZE: usize = 28 * 28;
/// Digit classes, one output unit each.
pub const NUM_CLASSES: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// A labelled digit image with raw and normalized pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MnistImage {
    label: u8,
    pixels: Vec<u8>,
    normalized: Vec<f64>,
}

impl MnistImage {
    /// Creates an image, normalizing every pixel to [0, 1].
    ///
    /// # Errors
    ///
    /// Returns an error if the label is not a digit or if `pixels` does not hold
    /// exactly `IMAGE_SIZE` values.
    pub fn new(label: u8, pixels: Vec<u8>) -> Result<Self> {
        if label as usize >= NUM_CLASSES {
            return Err(NetworkError::InvalidLabel { label });
        }
        if pixels.len() != IMAGE_SIZE {
            return Err(NetworkError::SizeMismatch {
                what: "image pixels",
                got: pixels.len(),
                expected: IMAGE_SIZE,
            });
        }

        let normalized = pixels.iter().map(|&p| p as f64 / 255.0).collect();
        Ok(Self {
            label,
            pixels,
            normalized,
        })
    }

    pub fn label(&self) -> u8 {
        self.label
    }

    pub fn pixel(&self, index: usize) -> u8 {
        self.pixels[index]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn normalized_pixel(&self, index: usize) -> f64 {
        self.normalized[index]
    }

    pub fn normalized_pixels(&self) -> &[f64] {
        &self.normalized
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> NetworkError {
    NetworkError::MalformedDataset {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn read_be_u32(data: &[u8], offset: &mut usize, path: &Path) -> Result<u32> {
    let bytes = data
        .get(*offset..*offset + 4)
        .ok_or_else(|| malformed(path, "header is truncated"))?;
    *offset += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn check_magic(found: u32, expected: u32, path: &Path) -> Result<()> {
    if found != expected {
        return Err(malformed(
            path,
            format!("invalid magic number {found}, expected {expected}"),
        ));
    }
    Ok(())
}

/// Reads up to `limit` raw images (all of them when `None`) from an IDX file.
pub fn read_images(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let data = fs::read(path)?;

    let mut offset = 0usize;
    check_magic(read_be_u32(&data, &mut offset, path)?, IMAGES_MAGIC, path)?;
    let total_images = read_be_u32(&data, &mut offset, path)? as usize;
    let rows = read_be_u32(&data, &mut offset, path)? as usize;
    let cols = read_be_u32(&data, &mut offset, path)? as usize;

    if rows * cols != IMAGE_SIZE {
        return Err(NetworkError::SizeMismatch {
            what: "IDX image dimensions",
            got: rows * cols,
            expected: IMAGE_SIZE,
        });
    }

    let count = limit.map_or(total_images, |limit| limit.min(total_images));
    let total_bytes = count * IMAGE_SIZE;
    let payload = data
        .get(offset..offset + total_bytes)
        .ok_or_else(|| malformed(path, "image payload is truncated"))?;

    Ok(payload
        .chunks_exact(IMAGE_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Reads up to `limit` labels (all of them when `None`) from an IDX file.
pub fn read_labels(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path)?;

    let mut offset = 0usize;
    check_magic(read_be_u32(&data, &mut offset, path)?, LABELS_MAGIC, path)?;
    let total_labels = read_be_u32(&data, &mut offset, path)? as usize;
    let count = limit.map_or(total_labels, |limit| limit.min(total_labels));

    let payload = data
        .get(offset..offset + count)
        .ok_or_else(|| malformed(path, "label payload is truncated"))?;
    Ok(payload.to_vec())
}

/// Loads a labelled dataset from an image file and its matching label file.
pub fn load_dataset(
    images_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
    limit: Option<usize>,
) -> Result<Vec<MnistImage>> {
    let images = read_images(images_path, limit)?;
    let labels = read_labels(labels_path, limit)?;

    if images.len() != labels.len() {
        return Err(NetworkError::SizeMismatch {
            what: "image and label counts",
            got: labels.len(),
            expected: images.len(),
        });
    }

    images
        .into_iter()
        .zip(labels)
        .map(|(pixels, label)| MnistImage::new(label, pixels))
        .collect()
}
