//! labelops: CLI for CTC label encoding, decoding and beam search evaluation.

pub mod cli;
pub mod config;
pub mod decode;
pub mod encode;
pub mod infer;
pub mod input;
