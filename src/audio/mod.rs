pub mod vad;
pub mod wav;

pub use vad::{AudioEvent, Segmenter, VadConfig};
pub use wav::{pcm_file_to_wav_file, read_wav_info, write_wav, WavInfo};
