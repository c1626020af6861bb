//! Input normalization for the learned classifier.
//!
//! - `image`: raw JPEG/PNG bytes to a fixed-size `[H, W, C]` tensor in [0, 1]
//! - `tabular`: (hardness, density) to scaled features using a fitted scaler

pub mod image;
pub mod tabular;

pub use self::image::{ChannelOrder, ImageNormalizer, ImageNormalizerConfig, ImageTensor};
pub use tabular::{FittedScaler, TabularFeatures, TabularNormalizer};
