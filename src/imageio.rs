use std::path::Path;

use image::{ImageBuffer, RgbImage, imageops::FilterType};
use ndarray::Array4;

use crate::error::{Result, StyleErr};

/// Loads an image file as a `[1, 3, size, size]` tensor with values in
/// `[0, 1]`.
///
/// The resize is exact on both dimensions; aspect ratio is not preserved,
/// so content and style images always line up pixel for pixel.
pub fn load_image(path: &Path, size: usize) -> Result<Array4<f32>> {
    let img = image::open(path)?
        .resize_exact(size as u32, size as u32, FilterType::Triangle)
        .into_rgb8();

    let mut out = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in img.enumerate_pixels() {
        for ci in 0..3 {
            out[[0, ci, y as usize, x as usize]] = pixel.0[ci] as f32 / 255.0;
        }
    }
    Ok(out)
}

/// Writes a `[1, 3, H, W]` tensor to an image file, clamping into `[0, 1]`.
/// The format follows the file extension.
pub fn save_image(tensor: &Array4<f32>, path: &Path) -> Result<()> {
    let (b, c, h, w) = tensor.dim();
    if b != 1 || c != 3 {
        return Err(StyleErr::ShapeMismatch {
            what: "image tensor".into(),
            got: vec![b, c, h, w],
            expected: vec![1, 3, h, w],
        });
    }

    let mut img: RgbImage = ImageBuffer::new(w as u32, h as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        for ci in 0..3 {
            let v = tensor[[0, ci, y as usize, x as usize]].clamp(0.0, 1.0);
            pixel.0[ci] = (v * 255.0).round() as u8;
        }
    }
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn round_trip_survives_quantization() {
        let dir = std::env::temp_dir().join("nst-imageio-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.png");

        let mut tensor = Array4::zeros((1, 3, 8, 8));
        for ci in 0..3 {
            for yy in 0..8 {
                for xx in 0..8 {
                    tensor[[0, ci, yy, xx]] = ((ci + yy + xx) % 7) as f32 / 7.0;
                }
            }
        }

        save_image(&tensor, &path).unwrap();
        let back = load_image(&path, 8).unwrap();
        for (a, b) in tensor.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1.0 / 255.0 + 1e-4);
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_rejects_non_rgb_tensors() {
        let path = std::env::temp_dir().join("nst-imageio-bad.png");
        let tensor = Array4::zeros((1, 1, 4, 4));
        assert!(matches!(
            save_image(&tensor, &path),
            Err(StyleErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn missing_file_propagates_the_image_error() {
        let err = load_image(Path::new("/definitely/not/here.png"), 8).unwrap_err();
        assert!(matches!(err, StyleErr::Image(_)));
    }
}
