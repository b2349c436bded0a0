use image::{imageops, GenericImageView, ImageBuffer, Pixel, Primitive};

/// Where the original image sits on the padded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    TopLeft,
    Center,
}

/// Offset of a `width x height` image on a `pad_width x pad_height` canvas,
/// or `None` when the image does not fit.
pub fn to_position(
    width: u32,
    height: u32,
    pad_width: u32,
    pad_height: u32,
    position: Position,
) -> Option<(u32, u32)> {
    if width > pad_width || height > pad_height {
        return None;
    }

    Some(match position {
        Position::TopLeft => (0, 0),
        Position::Center => ((pad_width - width) / 2, (pad_height - height) / 2),
    })
}

/// Letterbox `image` onto a canvas filled with `color`. Returns the canvas
/// and the offset the image was placed at.
pub fn padding<I, P, S>(
    image: &I,
    pad_width: u32,
    pad_height: u32,
    position: Position,
    color: P,
) -> Option<(ImageBuffer<P, Vec<S>>, (u32, u32))>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (width, height) = image.dimensions();

    to_position(width, height, pad_width, pad_height, position).map(|(x, y)| {
        let mut canvas = ImageBuffer::from_pixel(pad_width, pad_height, color);
        imageops::overlay(&mut canvas, image, i64::from(x), i64::from(y));
        (canvas, (x, y))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_to_position() {
        assert_eq!(to_position(10, 4, 10, 10, Position::Center), Some((0, 3)));
        assert_eq!(to_position(10, 4, 10, 10, Position::TopLeft), Some((0, 0)));
        assert_eq!(to_position(11, 4, 10, 10, Position::Center), None);
    }

    #[test]
    fn test_padding_centers_image() {
        let image = RgbImage::from_pixel(4, 2, Rgb([200, 10, 10]));
        let (canvas, offset) = padding(&image, 4, 4, Position::Center, Rgb([0, 0, 0])).unwrap();

        assert_eq!(offset, (0, 1));
        assert_eq!(canvas.dimensions(), (4, 4));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(0, 1), &Rgb([200, 10, 10]));
        assert_eq!(canvas.get_pixel(3, 2), &Rgb([200, 10, 10]));
        assert_eq!(canvas.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }
}
