use anyhow::{anyhow, ensure, Result};
use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, Rgba};
use num_traits::AsPrimitive;

use crate::imageops_ai::get_max_value;

/// Multiply the alpha channel of `image` by `mask`.
///
/// Pixels the mask marks as background end up transparent while the
/// original transparency of the foreground is kept. With `premultiply`
/// the colour channels are scaled by the mask as well.
pub fn apply_to_rgba<I, M, SI, SM>(
    image: &I,
    mask: &M,
    premultiply: bool,
) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>>
where
    I: GenericImageView<Pixel = Rgba<SI>>,
    M: GenericImageView<Pixel = Luma<SM>>,
    Rgba<SI>: Pixel<Subpixel = SI>,
    SI: Primitive + 'static + AsPrimitive<f32>,
    SM: Primitive + 'static + AsPrimitive<f32>,
    f32: AsPrimitive<SI>,
{
    ensure!(
        image.dimensions() == mask.dimensions(),
        "Image and mask dimensions do not match: image {:?}, mask {:?}",
        image.dimensions(),
        mask.dimensions()
    );

    let sm_max: f32 = get_max_value::<SM>().as_();

    let processed_pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|((_, _, image_pixel), (_, _, mask_pixel))| {
            let Rgba([red, green, blue, alpha]) = image_pixel;
            let mask_value: f32 = mask_pixel.0[0].as_();
            let weight = (mask_value / sm_max).clamp(0.0, 1.0);
            let scale = |c: SI| -> SI {
                let channel: f32 = c.as_();
                (channel * weight).round().as_()
            };

            if premultiply {
                [scale(red), scale(green), scale(blue), scale(alpha)]
            } else {
                [red, green, blue, scale(alpha)]
            }
        })
        .collect::<Vec<SI>>();

    ImageBuffer::from_raw(image.width(), image.height(), processed_pixels)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from processed pixels"))
}
