use image::{Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rotate `image` counter-clockwise by `degrees` about its centre.
///
/// With `expand` the canvas grows to hold the whole rotated image, otherwise
/// it keeps its size and the corners that fall outside are cut off. Uncovered
/// pixels are transparent. Sampling is nearest-neighbour, so quarter turns
/// are lossless.
#[must_use]
pub fn rotate(image: &RgbaImage, degrees: f64, expand: bool) -> RgbaImage {
    let (sin, cos) = sin_cos(degrees);
    let (width, height) = image.dimensions();
    let (out_width, out_height) = if expand {
        bounding_box(width, height, sin, cos)
    } else {
        (width, height)
    };

    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let (ox, oy) = (f64::from(out_width) / 2.0, f64::from(out_height) / 2.0);

    // Walk the output and look up where each pixel came from.
    RgbaImage::from_fn(out_width, out_height, |x, y| {
        let dx = f64::from(x) + 0.5 - ox;
        let dy = f64::from(y) + 0.5 - oy;
        let sx = dx * cos - dy * sin + cx;
        let sy = dx * sin + dy * cos + cy;
        sample(image, sx, sy)
    })
}

fn sin_cos(degrees: f64) -> (f64, f64) {
    let degrees = degrees.rem_euclid(360.0);

    // Exact values for quarter turns keep them pixel perfect.
    if degrees == 0.0 {
        (0.0, 1.0)
    } else if degrees == 90.0 {
        (1.0, 0.0)
    } else if degrees == 180.0 {
        (0.0, -1.0)
    } else if degrees == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}

fn bounding_box(width: u32, height: u32, sin: f64, cos: f64) -> (u32, u32) {
    let (w, h) = (f64::from(width), f64::from(height));
    let out_width = (w * cos.abs() + h * sin.abs() - 1e-9).ceil();
    let out_height = (w * sin.abs() + h * cos.abs() - 1e-9).ceil();
    (out_width.max(1.0) as u32, out_height.max(1.0) as u32)
}

fn sample(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    if x < 0.0 || y < 0.0 {
        return TRANSPARENT;
    }

    let (x, y) = (x.floor() as u32, y.floor() as u32);
    if x >= image.width() || y >= image.height() {
        return TRANSPARENT;
    }

    *image.get_pixel(x, y)
}
