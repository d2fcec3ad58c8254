pub mod capture_buffer;
pub mod convert;
pub mod wav_format;
