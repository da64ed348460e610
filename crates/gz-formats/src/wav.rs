//! WAV decoding to mono and multichannel float encoding.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use gz_dsp::AudioBuffer;

use crate::FormatError;

/// Decoded input, mixed down to one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

// --- Reading ---

/// Read a WAV file from disk. See [`read_wav`].
pub fn load_wav(path: impl AsRef<Path>) -> Result<MonoAudio, FormatError> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

/// Read any integer or float WAV stream, averaging all channels to mono.
pub fn read_wav<R: Read>(reader: R) -> Result<MonoAudio, FormatError> {
    decode(hound::WavReader::new(reader)?)
}

fn decode<R: Read>(mut reader: hound::WavReader<R>) -> Result<MonoAudio, FormatError> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(FormatError::NoChannels);
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        let scale = 1.0 / channels as f32;
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    };

    log::debug!(
        "decoded {} frames at {} Hz from {} channel(s)",
        samples.len(),
        spec.sample_rate,
        channels
    );
    Ok(MonoAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

// --- Writing ---

/// Write the first `channels` channels of `buffer` as 32-bit float WAV.
pub fn write_wav<W: Write + Seek>(
    w: W,
    buffer: &AudioBuffer,
    channels: usize,
    sample_rate: u32,
) -> Result<(), FormatError> {
    let channels = channels.min(buffer.channels());
    if channels == 0 {
        return Err(FormatError::NoChannels);
    }
    let spec = hound::WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::new(w, spec)?;
    for frame in 0..buffer.frames() {
        for ch in 0..channels {
            writer.write_sample(buffer.channel(ch)[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Encode `buffer` into an in-memory WAV file.
pub fn render_to_wav_bytes(
    buffer: &AudioBuffer,
    channels: usize,
    sample_rate: u32,
) -> Result<Vec<u8>, FormatError> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, buffer, channels, sample_rate)?;
    Ok(cursor.into_inner())
}
