//! Noise: colored-noise generators, the shared buffer bank and the noise source.

mod brown;
mod buffer;
mod pink;
mod source;
mod white;

pub use brown::{BrownFilter, BrownNoise};
pub use buffer::{synthesize, NoiseColor};
pub(crate) use buffer::NoiseBank;
pub use pink::{PinkFilter, PinkNoise};
pub use source::Noise;
pub use white::WhiteNoise;
