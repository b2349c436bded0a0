use std::path::Path;

use crate::{
    config::{Config, Normalization},
    errors::{IconBgError, Result},
    imageops_ai::{
        mask::apply_to_rgba,
        padding::{padding, Position},
    },
    traits::ImageSegmentationModel,
};
use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
    value::Tensor,
};
use tracing::{debug, info};

pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Salient-object segmentation model running on ONNX Runtime.
pub struct Model {
    pub image_size: u32,
    normalization: Normalization,
    input_name: String,
    output_name: String,
    session: Session,
}

impl Model {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.model_path,
            config.device_id,
            config.model_size,
            config.normalization(),
        )
    }

    /// Load the model and run one warm-up inference.
    ///
    /// `fallback_size` is used when the first input has a dynamic spatial
    /// dimension.
    pub fn new(
        model_path: &Path,
        device_id: i32,
        fallback_size: u32,
        normalization: Normalization,
    ) -> Result<Self> {
        let session = SessionBuilder::new()
            .map_err(|e| IconBgError::model("session builder initialization", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| IconBgError::model("execution provider registration", e))?
            .with_memory_pattern(true)
            .map_err(|e| IconBgError::model("memory pattern setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                IconBgError::model(format!("model load: {}", model_path.display()), e)
            })?;

        let input = session.inputs.first().ok_or_else(|| IconBgError::Validation {
            field: "model".to_string(),
            reason: "declares no inputs".to_string(),
        })?;
        let output = session.outputs.first().ok_or_else(|| IconBgError::Validation {
            field: "model".to_string(),
            reason: "declares no outputs".to_string(),
        })?;

        let image_size = input
            .input_type
            .tensor_dimensions()
            .and_then(|dims| dims.get(2).copied())
            .filter(|&d| d > 0)
            .map_or(fallback_size, |d| d as u32);
        let input_name = input.name.clone();
        let output_name = output.name.clone();

        let model = Self {
            image_size,
            normalization,
            input_name,
            output_name,
            session,
        };
        debug!(
            input = %model.input_name,
            output = %model.output_name,
            image_size,
            "model session ready"
        );

        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        model.predict(data)?;
        info!(path = %model_path.display(), "model loaded");

        Ok(model)
    }
}

impl ImageSegmentationModel for Model {
    fn get_image_size(&self) -> u32 {
        self.image_size
    }

    fn normalization(&self) -> Normalization {
        self.normalization
    }

    fn predict(&self, tensor: Array4<f32>) -> Result<Array4<f32>> {
        let input = Tensor::from_array(tensor)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input]?)?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

/// Letterbox `image` into an `image_size` square and convert it to a
/// normalised `1x3xNxN` tensor.
///
/// Returns the tensor and the `[x, y, w, h]` rectangle the real image
/// occupies inside the square.
pub fn preprocess(
    image: &RgbImage,
    image_size: u32,
    normalization: &Normalization,
) -> Result<(Array4<f32>, [u32; 4])> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || image_size == 0 {
        return Err(IconBgError::Validation {
            field: "image".to_string(),
            reason: format!("has an empty dimension ({width}x{height}, model {image_size})"),
        });
    }

    let scale = image_size as f32 / width.max(height) as f32;
    let w = ((width as f32 * scale).round() as u32).clamp(1, image_size);
    let h = ((height as f32 * scale).round() as u32).clamp(1, image_size);
    let resized = imageops::resize(image, w, h, FilterType::Lanczos3);

    let (canvas, (x, y)) = padding(
        &resized,
        image_size,
        image_size,
        Position::Center,
        Rgb([0, 0, 0]),
    )
    .ok_or_else(|| IconBgError::Validation {
        field: "image".to_string(),
        reason: format!("{w}x{h} does not fit a {image_size} square"),
    })?;

    let mut tensor = canvas.as_ndarray3().mapv(|v| f32::from(v) / 255.0);
    for (channel, mut plane) in tensor.axis_iter_mut(Axis(0)).enumerate() {
        let mean = normalization.mean[channel];
        let std = normalization.std[channel];
        plane.mapv_inplace(|v| (v - mean) / std);
    }

    Ok((tensor.insert_axis(Axis(0)), [x, y, w, h]))
}

/// Turn raw model output into a `width x height` mask in `0.0..=1.0`.
///
/// Channel 0 of the first batch item is min-max normalised, the letterbox
/// padding described by `crop` is cut away, and the rest is resized to the
/// original image size.
pub fn postprocess_mask(
    mask: Array4<f32>,
    image_size: u32,
    crop: [u32; 4],
    width: u32,
    height: u32,
) -> Result<Mask> {
    let (batch, channels, mask_height, mask_width) = mask.dim();
    if batch == 0 || channels == 0 || mask_height == 0 || mask_width == 0 {
        return Err(IconBgError::Validation {
            field: "mask".to_string(),
            reason: format!("has shape {:?}", mask.shape()),
        });
    }

    let plane = mask.slice(s![0, 0, .., ..]);
    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    let values = plane
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                (v - min) / range
            } else {
                v.clamp(0.0, 1.0)
            }
        })
        .collect::<Vec<_>>();

    let mask: Mask = ImageBuffer::from_raw(mask_width as u32, mask_height as u32, values)
        .ok_or_else(|| IconBgError::Validation {
            field: "mask".to_string(),
            reason: "buffer does not match its shape".to_string(),
        })?;

    // crop is in model input coordinates; the mask may come out at another size
    let image_size = image_size.max(1);
    let scale_x = mask_width as f32 / image_size as f32;
    let scale_y = mask_height as f32 / image_size as f32;
    let [x, y, w, h] = crop;
    let cx = ((x as f32 * scale_x) as u32).min(mask.width() - 1);
    let cy = ((y as f32 * scale_y) as u32).min(mask.height() - 1);
    let cw = ((w as f32 * scale_x).round() as u32).clamp(1, mask.width() - cx);
    let ch = ((h as f32 * scale_y).round() as u32).clamp(1, mask.height() - cy);

    let cropped = imageops::crop_imm(&mask, cx, cy, cw, ch).to_image();
    Ok(imageops::resize(&cropped, width, height, FilterType::Lanczos3))
}

pub fn apply_mask(img: &DynamicImage, mask: &Mask, premultiply: bool) -> Result<DynamicImage> {
    let rgba = img.to_rgba8();
    let result = apply_to_rgba(&rgba, mask, premultiply)?;
    Ok(DynamicImage::ImageRgba8(result))
}
