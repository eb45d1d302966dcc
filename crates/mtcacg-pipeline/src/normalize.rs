// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort JPEG re-encoding for payloads above the transport ceiling.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use tracing::{debug, warn};

use mtcacg_config::model::NormalizerConfig;
use mtcacg_core::MtcError;

/// Re-encodes oversized images at decreasing JPEG quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeNormalizer {
    pub start_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
}

/// Result of [`SizeNormalizer::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The input already fit.
    Unchanged,
    /// The smallest encoding produced. `fits` is false when even the floor
    /// quality stayed above the ceiling.
    Reencoded {
        bytes: Vec<u8>,
        qualities: Vec<u8>,
        fits: bool,
    },
}

impl Normalized {
    /// Bytes to send, given the original input.
    pub fn into_bytes(self, original: Vec<u8>) -> Vec<u8> {
        match self {
            Normalized::Unchanged => original,
            Normalized::Reencoded { bytes, .. } => bytes,
        }
    }
}

impl Default for SizeNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }
}

impl SizeNormalizer {
    pub fn from_config(config: &NormalizerConfig) -> Self {
        Self {
            start_quality: config.start_quality,
            quality_step: config.quality_step,
            min_quality: config.min_quality,
        }
    }

    /// Quality values tried, strictly decreasing and never below the floor.
    pub fn qualities(&self) -> impl Iterator<Item = u8> + use<> {
        let step = self.quality_step.max(1);
        let min = self.min_quality;
        std::iter::successors(Some(self.start_quality), move |q| q.checked_sub(step))
            .take_while(move |q| *q >= min)
    }

    /// Shrinks `bytes` below `max_bytes` if it is larger.
    ///
    /// Never fails because of size alone; the smallest attempt is returned
    /// even when it is still oversized. Fails only when the input cannot be
    /// decoded or an encode attempt errors.
    pub fn normalize(&self, bytes: &[u8], max_bytes: usize) -> Result<Normalized, MtcError> {
        if bytes.len() <= max_bytes {
            return Ok(Normalized::Unchanged);
        }

        let image = image::load_from_memory(bytes).map_err(|e| MtcError::Normalize {
            message: format!("failed to decode {} byte image: {e}", bytes.len()),
            source: Some(Box::new(e)),
        })?;

        let mut best: Option<Vec<u8>> = None;
        let mut qualities = Vec::new();
        let mut fits = false;

        for quality in self.qualities() {
            let encoded = encode_jpeg(&image, quality)?;
            qualities.push(quality);
            debug!(quality, size = encoded.len(), max_bytes, "re-encoded image");

            fits = encoded.len() <= max_bytes;
            if best.as_ref().is_none_or(|b| encoded.len() < b.len()) {
                best = Some(encoded);
            }
            if fits {
                break;
            }
        }

        let Some(bytes) = best else {
            return Ok(Normalized::Unchanged);
        };
        if !fits {
            warn!(
                size = bytes.len(),
                max_bytes,
                floor = self.min_quality,
                "image still oversized at quality floor"
            );
        }
        Ok(Normalized::Reencoded {
            bytes,
            qualities,
            fits,
        })
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, MtcError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&image.to_rgb8())
        .map_err(|e| MtcError::Normalize {
            message: format!("jpeg encode at quality {quality} failed: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(buf)
}

/// Reads width and height from the image header without decoding pixels.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
