//! Speech synthesis engines.
//!
//! # Available Engines
//!
//! - `espeak` - espeak-ng command line synthesizer (espeak-ng required)

pub mod espeak;
