//! Audio file loading, WAV writing and sample-rate conversion

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};
use vocoder_core::{AudioBuffer, OutputSampleFormat, Result, VocoderError};

const SINC_LEN: usize = 256;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Average interleaved frames down to one channel
pub fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|ch| ch.iter().sum::<f32>() / ch.len() as f32)
        .collect()
}

/// Decode `path` to mono at its native sample rate.
///
/// WAV goes through hound first; anything hound rejects (and every other
/// container) is decoded by symphonia.
pub fn load_mono(path: &Path) -> Result<AudioBuffer> {
    let ext = extension(path);
    let (samples, channels, sample_rate) = if ext == "wav" || ext == "wave" {
        match read_wav(path) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "hound rejected WAV, trying symphonia");
                decode_with_symphonia(path, &ext)?
            }
        }
    } else {
        decode_with_symphonia(path, &ext)?
    };

    let mono = to_mono(&samples, channels);
    info!(
        path = %path.display(),
        channels,
        sample_rate,
        samples = mono.len(),
        "Loaded audio"
    );
    AudioBuffer::new(mono, sample_rate)
        .map_err(|_| VocoderError::Decode(format!("{}: missing sample rate", path.display())))
}

/// Interleaved samples, channel count and sample rate of a WAV file
fn read_wav(path: &Path) -> std::result::Result<(Vec<f32>, usize, u32), hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            reader.samples::<f32>().collect::<std::result::Result<_, _>>()?
        }
        hound::SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    Ok((samples, spec.channels as usize, spec.sample_rate))
}

fn decode_with_symphonia(path: &Path, ext: &str) -> Result<(Vec<f32>, usize, u32)> {
    let decode_err = |what: &str, e: &dyn std::fmt::Display| {
        VocoderError::Decode(format!("{}: {what}: {e}", path.display()))
    };

    let mut hint = Hint::new();
    if !ext.is_empty() {
        hint.with_extension(ext);
    }
    let file = File::open(path).map_err(|e| decode_err("open failed", &e))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err("unsupported format", &e))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| VocoderError::Decode(format!("{}: no audio track", path.display())))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channels = params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| decode_err("unsupported codec", &e))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(decode_err("read packet failed", &e)),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_err("decode failed", &e)),
        };

        let (rate, layout) = (decoded.spec().rate, decoded.spec().channels);
        sample_rate = rate;
        channels = layout.count();
        let needs_realloc = sample_buf
            .as_ref()
            .is_none_or(|buf| buf.capacity() < decoded.capacity());
        if needs_realloc {
            sample_buf = Some(SampleBuffer::<f32>::new(
                decoded.capacity() as u64,
                SignalSpec::new(rate, layout),
            ));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if sample_rate == 0 {
        return Err(VocoderError::Decode(format!("{}: unknown sample rate", path.display())));
    }
    Ok((samples, channels.max(1), sample_rate))
}

/// Sibling path the writer fills before renaming into place
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.wav".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Write `buffer` as a mono WAV file.
///
/// The data goes to a temporary sibling first and is renamed over `path`
/// only once complete, so a failure never leaves a partial file behind.
pub fn write_wav(path: &Path, buffer: &AudioBuffer, format: OutputSampleFormat) -> Result<()> {
    if extension(path) != "wav" {
        return Err(VocoderError::Write(format!(
            "{}: only .wav output is supported",
            path.display()
        )));
    }

    let temp = temp_path_for(path);
    let result = write_wav_file(&temp, buffer, format).and_then(|()| {
        std::fs::rename(&temp, path)
            .map_err(|e| VocoderError::Write(format!("{}: {e}", path.display())))
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
        return result;
    }

    info!(
        path = %path.display(),
        samples = buffer.len(),
        sample_rate = buffer.sample_rate(),
        format = ?format,
        "Wrote WAV"
    );
    Ok(())
}

fn write_wav_file(path: &Path, buffer: &AudioBuffer, format: OutputSampleFormat) -> Result<()> {
    let spec = match format {
        OutputSampleFormat::Float32 => hound::WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
        OutputSampleFormat::Pcm16 => hound::WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
    };
    let write_err = |e: hound::Error| VocoderError::Write(format!("{}: {e}", path.display()));

    let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
    for &sample in buffer.samples() {
        match format {
            OutputSampleFormat::Float32 => writer.write_sample(sample).map_err(write_err)?,
            OutputSampleFormat::Pcm16 => {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                writer.write_sample(value).map_err(write_err)?
            }
        }
    }
    writer.finalize().map_err(write_err)
}

/// Sinc resample by `ratio` (output rate / input rate) to exactly `target_len`
/// samples, with the resampler's group delay removed.
pub(crate) fn resample_by_ratio(
    samples: &[f32],
    ratio: f64,
    target_len: usize,
) -> Result<Vec<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // zero tail so the delayed output still covers `target_len`
    let chunk = samples.len() + SINC_LEN + 16;
    let mut padded = samples.to_vec();
    padded.resize(chunk, 0.0);
    let input = vec![padded];

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk, 1)
        .map_err(|e| VocoderError::config(format!("Resample init error: {e}")))?;
    let output = resampler
        .process(&input, None)
        .map_err(|e| VocoderError::config(format!("Resample error: {e}")))?;
    let delay = resampler.output_delay();

    let mut out: Vec<f32> = output
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .skip(delay)
        .take(target_len)
        .collect();
    out.resize(target_len, 0.0);
    Ok(out)
}

/// Convert between sample rates, keeping the duration
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let target_len = (samples.len() as f64 * ratio).round() as usize;
    debug!(from_rate, to_rate, target_len, "Resampling");
    resample_by_ratio(samples, ratio, target_len)
}
