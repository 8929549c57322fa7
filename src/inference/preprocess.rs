//! Image preprocessing
//!
//! Raw bytes -> RGB -> 224x224 (stretched, no aspect ratio preservation)
//! -> CHW float tensor normalized with mean 0.5 / std 0.5 per channel.
//!
//! The resize reproduces PIL's `Image.resize(size, BILINEAR)` (which is what
//! the training pipeline's `Resize((224, 224))` runs): a separable, antialiased
//! triangle filter evaluated in 8-bit fixed point, horizontal pass first.

use image::{DynamicImage, RgbImage};

use crate::utils::error::PredictionError;

/// Side of the square model input
pub const IMAGE_SIZE: usize = 224;

/// Number of color channels fed to the model
pub const CHANNELS: usize = 3;

/// Per-channel normalization. Training used 0.5/0.5, not ImageNet statistics.
pub const NORMALIZE_MEAN: [f32; 3] = [0.5, 0.5, 0.5];
pub const NORMALIZE_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// File extensions accepted by the inference boundary and the evaluator
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Fixed-point precision used by PIL for 8-bit resampling
const PRECISION_BITS: u32 = 32 - 8 - 2;

/// Support of the bilinear (triangle) filter
const BILINEAR_SUPPORT: f64 = 1.0;

/// Case-insensitive extension check on a bare file name
pub fn is_supported_image(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// A preprocessed image in CHW layout
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    shape: [usize; 3],
}

impl ImageTensor {
    /// Wrap raw CHW data. Fails if `data` does not hold exactly `C*H*W` values.
    pub fn new(data: Vec<f32>, shape: [usize; 3]) -> Result<Self, PredictionError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(PredictionError::Inference(format!(
                "tensor data has {} values but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { data, shape })
    }

    /// Shape as (channels, height, width)
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Deterministic image -> tensor transform
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Target image size (square)
    pub image_size: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE,
        }
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure image size
    pub fn with_image_size(mut self, size: usize) -> Self {
        self.image_size = size;
        self
    }

    /// Shape of every tensor this preprocessor produces
    pub fn output_shape(&self) -> [usize; 3] {
        [CHANNELS, self.image_size, self.image_size]
    }

    /// Decode encoded image bytes (JPEG, PNG, ...) and preprocess them
    pub fn preprocess_bytes(&self, bytes: &[u8]) -> Result<ImageTensor, PredictionError> {
        let image = image::load_from_memory(bytes)?;
        self.preprocess(&image)
    }

    /// Preprocess an already decoded image
    pub fn preprocess(&self, image: &DynamicImage) -> Result<ImageTensor, PredictionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PredictionError::InvalidImage(format!(
                "image has zero size ({}x{})",
                image.width(),
                image.height()
            )));
        }

        // Alpha is dropped, grayscale and palette images are expanded
        let rgb = image.to_rgb8();
        let resized = resize_bilinear(&rgb, self.image_size, self.image_size)?;
        ImageTensor::new(normalize_chw(&resized), self.output_shape())
    }
}

/// Map pixels to `(x/255 - mean) / std` in CHW order
fn normalize_chw(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let num_pixels = (width * height) as usize;
    let mut normalized = vec![0.0f32; CHANNELS * num_pixels];

    for (i, pixel) in image.pixels().enumerate() {
        for c in 0..CHANNELS {
            let x = pixel[c] as f32 / 255.0;
            normalized[c * num_pixels + i] = (x - NORMALIZE_MEAN[c]) / NORMALIZE_STD[c];
        }
    }

    normalized
}

/// Per-output-pixel filter taps along one axis
struct Coefficients {
    /// (first source index, number of taps) for each output index
    bounds: Vec<(usize, usize)>,
    /// `bounds.len() * ksize` fixed-point weights
    weights: Vec<i32>,
    ksize: usize,
}

impl Coefficients {
    fn taps(&self, out_idx: usize) -> (usize, &[i32]) {
        let (start, count) = self.bounds[out_idx];
        let offset = out_idx * self.ksize;
        (start, &self.weights[offset..offset + count])
    }
}

fn bilinear_filter(x: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 {
        1.0 - x
    } else {
        0.0
    }
}

fn to_fixed_point(weight: f64) -> i32 {
    let scaled = weight * (1i64 << PRECISION_BITS) as f64;
    if weight < 0.0 {
        (scaled - 0.5) as i32
    } else {
        (scaled + 0.5) as i32
    }
}

fn precompute_coefficients(in_size: usize, out_size: usize) -> Coefficients {
    let scale = in_size as f64 / out_size as f64;
    let filter_scale = scale.max(1.0);
    let support = BILINEAR_SUPPORT * filter_scale;
    let ksize = support.ceil() as usize * 2 + 1;

    let mut bounds = Vec::with_capacity(out_size);
    let mut weights = vec![0i32; out_size * ksize];
    let mut taps = vec![0.0f64; ksize];

    for xx in 0..out_size {
        let center = (xx as f64 + 0.5) * scale;
        let inv_scale = 1.0 / filter_scale;

        // Truncation toward zero, as in the C implementation
        let xmin = ((center - support + 0.5) as i64).max(0) as usize;
        let xmax = ((center + support + 0.5) as i64).min(in_size as i64) as usize;
        let count = xmax.saturating_sub(xmin).min(ksize);

        let mut total = 0.0;
        for (x, tap) in taps.iter_mut().enumerate().take(count) {
            let w = bilinear_filter((x as f64 + xmin as f64 - center + 0.5) * inv_scale);
            *tap = w;
            total += w;
        }

        let row = &mut weights[xx * ksize..(xx + 1) * ksize];
        for (x, tap) in taps.iter().enumerate().take(count) {
            let w = if total != 0.0 { tap / total } else { *tap };
            row[x] = to_fixed_point(w);
        }

        bounds.push((xmin, count));
    }

    Coefficients {
        bounds,
        weights,
        ksize,
    }
}

fn clip8(acc: i32) -> u8 {
    (acc >> PRECISION_BITS).clamp(0, 255) as u8
}

/// PIL-compatible bilinear resize of an RGB image.
///
/// Axes whose size does not change are copied untouched. Empty source or
/// target dimensions are rejected.
pub fn resize_bilinear(
    image: &RgbImage,
    width: usize,
    height: usize,
) -> Result<RgbImage, PredictionError> {
    let (in_w, in_h) = (image.width() as usize, image.height() as usize);
    if in_w == 0 || in_h == 0 || width == 0 || height == 0 {
        return Err(PredictionError::InvalidImage(format!(
            "cannot resize {}x{} to {}x{}",
            in_w, in_h, width, height
        )));
    }
    let mut src: Vec<u8> = image.as_raw().clone();
    let mut cur_w = in_w;

    if width != in_w {
        let coeffs = precompute_coefficients(in_w, width);
        let mut out = vec![0u8; width * in_h * CHANNELS];

        for y in 0..in_h {
            let row = &src[y * in_w * CHANNELS..(y + 1) * in_w * CHANNELS];
            for xx in 0..width {
                let (start, taps) = coeffs.taps(xx);
                let mut acc = [1i32 << (PRECISION_BITS - 1); CHANNELS];
                for (i, &k) in taps.iter().enumerate() {
                    let px = (start + i) * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += row[px + c] as i32 * k;
                    }
                }
                let dst = (y * width + xx) * CHANNELS;
                for c in 0..CHANNELS {
                    out[dst + c] = clip8(acc[c]);
                }
            }
        }

        src = out;
        cur_w = width;
    }

    if height != in_h {
        let coeffs = precompute_coefficients(in_h, height);
        let mut out = vec![0u8; cur_w * height * CHANNELS];

        for yy in 0..height {
            let (start, taps) = coeffs.taps(yy);
            for x in 0..cur_w {
                let mut acc = [1i32 << (PRECISION_BITS - 1); CHANNELS];
                for (i, &k) in taps.iter().enumerate() {
                    let px = ((start + i) * cur_w + x) * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += src[px + c] as i32 * k;
                    }
                }
                let dst = (yy * cur_w + x) * CHANNELS;
                for c in 0..CHANNELS {
                    out[dst + c] = clip8(acc[c]);
                }
            }
        }

        src = out;
    }

    let len = src.len();
    RgbImage::from_raw(width as u32, height as u32, src).ok_or_else(|| {
        PredictionError::Inference(format!(
            "resized buffer holds {} bytes, expected {}",
            len,
            width * height * CHANNELS
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image("CornCommonRust3.JPG"));
        assert!(is_supported_image("leaf.jpeg"));
        assert!(is_supported_image("leaf.Png"));
        assert!(!is_supported_image("leaf.gif"));
        assert!(!is_supported_image("AppleScab"));
        assert!(!is_supported_image("notes.txt"));
    }

    #[test]
    fn test_landscape_image_is_stretched_to_square() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(512, 384, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }));

        let tensor = Preprocessor::new()
            .preprocess_bytes(&encode_png(&image))
            .unwrap();

        assert_eq!(tensor.shape(), [3, 224, 224]);
        assert_eq!(tensor.data().len(), 3 * 224 * 224);
        assert!(tensor.data().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_uniform_color_survives_resize_and_normalization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(512, 384, Rgb([255, 0, 51])));
        let tensor = Preprocessor::new().preprocess(&image).unwrap();
        let plane = 224 * 224;

        assert!(tensor.data()[..plane].iter().all(|&v| v == 1.0));
        assert!(tensor.data()[plane..2 * plane].iter().all(|&v| v == -1.0));
        let blue = (51.0f32 / 255.0 - 0.5) / 0.5;
        assert!(tensor.data()[2 * plane..].iter().all(|&v| v == blue));
    }

    #[test]
    fn test_resize_matches_pil_reference() {
        // PIL: Image.fromarray([[0, 0, 255, 255]]).resize((2, 1), BILINEAR) -> [36, 219]
        let mut image = RgbImage::new(4, 1);
        for (x, value) in [0u8, 0, 255, 255].into_iter().enumerate() {
            image.put_pixel(x as u32, 0, Rgb([value, value, value]));
        }

        let resized = resize_bilinear(&image, 2, 1).unwrap();

        assert_eq!(resized.get_pixel(0, 0)[0], 36);
        assert_eq!(resized.get_pixel(1, 0)[0], 219);
    }

    #[test]
    fn test_same_size_is_identity() {
        let image = RgbImage::from_fn(224, 224, |x, y| Rgb([x as u8, y as u8, 7]));
        assert_eq!(resize_bilinear(&image, 224, 224).unwrap(), image);
    }

    #[test]
    fn test_resize_rejects_empty_dimensions() {
        let empty = RgbImage::new(0, 5);
        let err = resize_bilinear(&empty, 224, 224).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidImage(_)));

        let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        assert!(resize_bilinear(&image, 0, 224).is_err());
        assert_eq!(resize_bilinear(&image, 3, 5).unwrap().dimensions(), (3, 5));
    }

    #[test]
    fn test_alpha_is_dropped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0])));
        let tensor = Preprocessor::new().preprocess(&image).unwrap();
        assert!(tensor.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_preprocessing_is_deterministic() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
        }));
        let bytes = encode_png(&image);
        let preprocessor = Preprocessor::new();

        assert_eq!(
            preprocessor.preprocess_bytes(&bytes).unwrap(),
            preprocessor.preprocess_bytes(&bytes).unwrap()
        );
    }

    #[test]
    fn test_garbage_bytes_are_invalid_image() {
        let err = Preprocessor::new()
            .preprocess_bytes(b"this is not an image")
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidImage(_)));
    }

    #[test]
    fn test_tensor_length_must_match_shape() {
        assert!(ImageTensor::new(vec![0.0; 12], [3, 2, 2]).is_ok());
        assert!(matches!(
            ImageTensor::new(vec![0.0; 11], [3, 2, 2]),
            Err(PredictionError::Inference(_))
        ));
    }
}
