use crate::config::Normalization;
use crate::errors::Result;
use crate::model::{apply_mask, postprocess_mask, preprocess};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Turns the raw bytes of an image into the raw bytes of the same image with
/// its background removed.
///
/// This is the only thing the batch run knows about background removal.
pub trait BackgroundRemover: Send + Sync {
    fn remove(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// A salient-object segmentation model.
///
/// Implementors only provide inference; `segment_image` runs the
/// letterbox / normalise / mask pipeline around it.
pub trait ImageSegmentationModel: Send + Sync {
    /// Side length of the square input the model expects.
    fn get_image_size(&self) -> u32;

    fn normalization(&self) -> Normalization {
        Normalization::default()
    }

    /// NCHW image tensor in, N1HW (or NCHW, channel 0 used) mask out.
    fn predict(&self, tensor: Array4<f32>) -> Result<Array4<f32>>;

    fn segment_image(&self, img: &DynamicImage, premultiply: bool) -> Result<DynamicImage> {
        let image_size = self.get_image_size();
        let (tensor, crop) = preprocess(&img.to_rgb8(), image_size, &self.normalization())?;
        let mask = self.predict(tensor)?;
        let (width, height) = img.dimensions();

        let mask = postprocess_mask(mask, image_size, crop, width, height)?;
        apply_mask(img, &mask, premultiply)
    }
}
