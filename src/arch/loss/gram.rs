use ndarray::{Array2, Array4};

/// Pairwise channel-correlation ("Gram") matrix of a feature-map batch.
///
/// Entry `(i, j)` is the inner product of flattened feature maps `i` and
/// `j`, divided by the total element count so values stay comparable across
/// feature-map sizes. Spatial arrangement is erased by the flattening,
/// which is exactly what makes this a style signature rather than a content
/// one.
pub fn gram_matrix(x: &Array4<f32>) -> Array2<f32> {
    let (b, c, h, w) = x.dim();
    let f = x.view().into_shape_with_order((b * c, h * w)).unwrap();
    f.dot(&f.t()) / (b * c * h * w) as f32
}
