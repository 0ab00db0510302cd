pub mod raw;
pub mod waveform;

pub use raw::{AxisOrder, RawSamples, RecordingMeta};
pub use waveform::WaveformModel;
