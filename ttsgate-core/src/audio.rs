//! Waveform helpers and WAV container handling.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::AudioError;
use crate::types::AudioFormat;

/// Duration in seconds of `num_samples` mono samples. Zero for a zero rate.
pub fn waveform_duration(num_samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    num_samples as f64 / sample_rate as f64
}

/// Scale so the loudest sample has magnitude 1.0. Silence is returned as is.
pub fn normalize_waveform(mut samples: Vec<f32>) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return samples;
    }
    for s in samples.iter_mut() {
        *s /= peak;
    }
    samples
}

/// Average interleaved channels down to mono
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Encode mono samples as 16-bit PCM WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut buffer, spec)?;
        for sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }
    Ok(buffer.into_inner())
}

/// Decode a WAV payload into mono samples and its sample rate
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
    };

    Ok((downmix_to_mono(&samples, spec.channels as usize), spec.sample_rate))
}

/// Fail early for containers this build cannot produce
pub fn ensure_encodable(format: AudioFormat) -> Result<(), AudioError> {
    match format {
        AudioFormat::Wav => Ok(()),
        // No MP3 encoder is linked into this build.
        AudioFormat::Mp3 => Err(AudioError::UnsupportedFormat(format.to_string())),
    }
}

/// Encode samples into the requested container
pub fn encode(samples: &[f32], sample_rate: u32, format: AudioFormat) -> Result<Vec<u8>, AudioError> {
    ensure_encodable(format)?;
    match format {
        AudioFormat::Wav => encode_wav(samples, sample_rate),
        AudioFormat::Mp3 => Err(AudioError::UnsupportedFormat(format.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(waveform_duration(48_000, 24_000), 2.0);
        assert_eq!(waveform_duration(100, 0), 0.0);
    }

    #[test]
    fn test_normalize_peak() {
        let out = normalize_waveform(vec![0.25, -0.5, 0.1]);
        assert_eq!(out, vec![0.5, -1.0, 0.2]);
        assert_eq!(normalize_waveform(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_downmix() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn test_wav_encode_then_decode() {
        let samples = vec![0.0, 0.5, -0.5, 1.0];
        let bytes = encode_wav(&samples, 16_000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");

        let (decoded, rate) = decode_wav(&bytes).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in decoded.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mp3_unsupported() {
        let err = encode(&[0.0], 24_000, AudioFormat::Mp3).unwrap_err();
        assert_eq!(err, AudioError::UnsupportedFormat("mp3".to_string()));
        assert_eq!(ensure_encodable(AudioFormat::Mp3), Err(err));
        assert_eq!(ensure_encodable(AudioFormat::Wav), Ok(()));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_wav(b"RIFF...."), Err(AudioError::Decode(_))));
    }
}
