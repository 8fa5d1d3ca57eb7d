//! The vadpcm codec
//!
//! Encoding happens in two passes. The first trains a codebook: it computes
//! each frame's autocorrelation, clusters frames that want similar
//! second-order predictors, and turns each cluster's predictor into fixed
//! point vectors. The second pass picks the best predictor and scale for
//! every frame and quantizes its residuals to four bits.
//!
//! Decoding runs the same fixed-point predictor as the encoder, so the
//! decoder output is exactly what the encoder measured its error against.

pub mod autocorr;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod predictor;

pub use decoder::{decode, Decoder};
pub use encoder::{encode_frames, Encoder};
pub use frame::{pack_codes, unpack_codes, FrameHeader};
