use std::io::Cursor;

use image::ImageFormat;

use crate::errors::{IconBgError, Result};
use crate::traits::{BackgroundRemover, ImageSegmentationModel};

/// Background remover backed by a segmentation model: decodes the bytes,
/// masks out the background, and encodes the result in `format`.
pub struct SegmentationRemover<M: ImageSegmentationModel> {
    model: M,
    format: ImageFormat,
    premultiply: bool,
}

impl<M: ImageSegmentationModel> SegmentationRemover<M> {
    pub const fn new(model: M, format: ImageFormat) -> Self {
        Self {
            model,
            format,
            premultiply: false,
        }
    }

    pub fn with_premultiply(mut self, premultiply: bool) -> Self {
        self.premultiply = premultiply;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: ImageSegmentationModel> BackgroundRemover for SegmentationRemover<M> {
    fn remove(&self, input: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(input).map_err(|e| IconBgError::ImageProcessing {
            path: "<memory>".to_string(),
            operation: "decode".to_string(),
            source: Box::new(e),
        })?;

        let segmented = self.model.segment_image(&img, self.premultiply)?;

        let mut buf = Vec::new();
        segmented
            .write_to(&mut Cursor::new(&mut buf), self.format)
            .map_err(|e| IconBgError::ImageProcessing {
                path: "<memory>".to_string(),
                operation: format!("encode as {:?}", self.format),
                source: Box::new(e),
            })?;
        Ok(buf)
    }
}
