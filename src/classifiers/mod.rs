//! Models assembled from the layer library.
//!
//! - [`cnn`]: [`ThreeLayerConvNet`], conv - relu - pool - affine - relu - affine - softmax
//! - [`linear`]: softmax classifier over raw features, naive and vectorized

pub mod cnn;
pub mod linear;

pub use cnn::{ConvNetConfig, ConvNetGrads, ThreeLayerConvNet};
