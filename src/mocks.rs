use crate::errors::{IconBgError, Result};
use crate::traits::{BackgroundRemover, ImageSegmentationModel};
use ndarray::prelude::*;
use parking_lot::Mutex;

/// Mask a mock model answers with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockMask {
    /// Same value everywhere.
    Uniform(f32),
    /// Ones over the middle half of the square, zeros around it.
    Centered,
}

/// Segmentation model answering every tensor with a fixed mask.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub image_size: u32,
    pub mask: MockMask,
}

impl MockSegmentationModel {
    pub const fn new(image_size: u32, mask: MockMask) -> Self {
        Self { image_size, mask }
    }

    pub const fn centered(image_size: u32) -> Self {
        Self::new(image_size, MockMask::Centered)
    }

    pub const fn opaque(image_size: u32) -> Self {
        Self::new(image_size, MockMask::Uniform(1.0))
    }
}

impl ImageSegmentationModel for MockSegmentationModel {
    fn get_image_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, tensor: Array4<f32>) -> Result<Array4<f32>> {
        let (batch, _, height, width) = tensor.dim();
        let mask = match self.mask {
            MockMask::Uniform(value) => Array4::from_elem((batch, 1, height, width), value),
            MockMask::Centered => {
                let mut mask = Array4::<f32>::zeros((batch, 1, height, width));
                mask.slice_mut(s![.., .., height / 4..height * 3 / 4, width / 4..width * 3 / 4])
                    .fill(1.0);
                mask
            }
        };
        Ok(mask)
    }
}

type Transform = Box<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Stand-in for the background removal routine that records every input it
/// is handed.
pub struct StubRemover {
    transform: Transform,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl StubRemover {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            transform: Box::new(transform),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Prepends `marker` to the input, and fails on input starting with `poison`.
    pub fn marking(marker: &'static [u8], poison: &'static [u8]) -> Self {
        Self::new(move |input| {
            if input.starts_with(poison) {
                return Err(IconBgError::Validation {
                    field: "input".to_string(),
                    reason: "was rejected by the stub remover".to_string(),
                });
            }
            let mut output = marker.to_vec();
            output.extend_from_slice(input);
            Ok(output)
        })
    }

    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl BackgroundRemover for StubRemover {
    fn remove(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.calls.lock().push(input.to_vec());
        (self.transform)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_mock_model_predict_shape() -> Result<()> {
        let mock = MockSegmentationModel::centered(32);
        let input_tensor = Array4::<f32>::zeros((1, 3, 32, 32));

        let result = mock.predict(input_tensor)?;
        assert_eq!(result.shape(), &[1, 1, 32, 32]);
        assert_eq!(result[[0, 0, 0, 0]], 0.0);
        assert_eq!(result[[0, 0, 16, 16]], 1.0);
        Ok(())
    }

    #[test]
    fn test_opaque_mock_keeps_image() -> Result<()> {
        let mock = MockSegmentationModel::opaque(16);
        let test_image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 6, Rgb([255, 0, 0])));

        let result = mock.segment_image(&test_image, false)?;
        assert_eq!(result.dimensions(), test_image.dimensions());
        assert!(result.to_rgba8().pixels().all(|p| p.0 == [255, 0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_stub_remover_records_and_rejects() {
        let stub = StubRemover::marking(b"ok:", b"BAD");

        assert_eq!(stub.remove(b"icon").unwrap(), b"ok:icon".to_vec());
        assert!(stub.remove(b"BAD icon").is_err());
        assert_eq!(stub.call_count(), 2);
        assert_eq!(stub.calls()[1], b"BAD icon".to_vec());
    }
}
