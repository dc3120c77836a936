use std::f32::consts::TAU;
use std::path::PathBuf;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use vocoder_core::{
    AudioBuffer, BandpassParams, EffectConfig, EffectKind, OutputSampleFormat, VocoderError,
};
use vocoder_services::{load_mono, process, write_wav, Vocoder};

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vocoder-pipeline-{}-{name}", std::process::id()))
}

fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> AudioBuffer {
    let samples = (0..len)
        .map(|i| amplitude * (TAU * freq * i as f32 / sample_rate as f32).sin())
        .collect();
    AudioBuffer::new(samples, sample_rate).unwrap()
}

fn white_noise(seed: u64, sample_rate: u32, len: usize) -> AudioBuffer {
    let mut rng = fastrand::Rng::with_seed(seed);
    let samples = (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect();
    AudioBuffer::new(samples, sample_rate).unwrap()
}

/// Energy of `samples` between `low_hz` and `high_hz`
fn band_energy(samples: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32) -> f32 {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(samples.len());
    let mut bins: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut bins);
    let hz_per_bin = sample_rate as f32 / samples.len() as f32;
    bins[..samples.len() / 2]
        .iter()
        .enumerate()
        .filter(|(k, _)| {
            let f = *k as f32 * hz_per_bin;
            f >= low_hz && f < high_hz
        })
        .map(|(_, c)| c.norm_sqr())
        .sum()
}

#[test]
fn test_all_disabled_is_identity() {
    let input = white_noise(1, 44100, 10000);
    let vocoder = Vocoder::new(EffectConfig::all_disabled()).unwrap();
    let output = vocoder.process_buffer(input.clone()).unwrap();
    assert_eq!(output.len(), input.len());
    assert_eq!(output.sample_rate(), input.sample_rate());
    for (a, b) in output.samples().iter().zip(input.samples()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_full_chain_preserves_duration() {
    let mut config = EffectConfig::default();
    for kind in EffectKind::ORDER {
        config.set_enabled(kind, true);
    }
    let input = sine(440.0, 0.5, 44100, 30000);
    let output = Vocoder::new(config).unwrap().process_buffer(input.clone()).unwrap();
    assert_eq!(output.len(), input.len());
    assert_eq!(output.sample_rate(), 44100);
    assert!(output.samples().iter().all(|s| s.is_finite()));
}

#[test]
fn test_bandpass_attenuates_white_noise_outside_band() {
    let mut config = EffectConfig::all_disabled();
    config.set_enabled(EffectKind::Bandpass, true);
    config.bandpass.params = BandpassParams { low_cut_hz: 300.0, high_cut_hz: 5000.0, order: 4 };

    let input = white_noise(42, 44100, 44100);
    let output = Vocoder::new(config).unwrap().process_buffer(input.clone()).unwrap();
    assert_eq!(output.len(), input.len());
    assert!(output.rms() < input.rms());

    let ratio = |low, high| {
        band_energy(output.samples(), 44100, low, high)
            / band_energy(input.samples(), 44100, low, high)
    };
    // roughly unity in the pass band, at least 20 dB down well outside it
    let pass = ratio(800.0, 3000.0);
    assert!(pass > 0.7 && pass < 1.3, "pass band ratio {pass}");
    assert!(ratio(12000.0, 22000.0) < 0.01);
    assert!(ratio(1.0, 60.0) < 0.01);
}

#[test]
fn test_full_range_high_order_bandpass_stays_bounded() {
    for (low_cut_hz, high_cut_hz, sample_rate) in [(20.0, 20000.0, 44100), (80.0, 200.0, 96000)] {
        for order in [4, 6, 8] {
            let mut config = EffectConfig::all_disabled();
            config.set_enabled(EffectKind::Bandpass, true);
            config.bandpass.params = BandpassParams { low_cut_hz, high_cut_hz, order };

            let input = white_noise(order as u64, sample_rate, sample_rate as usize);
            let output = Vocoder::new(config).unwrap().process_buffer(input.clone()).unwrap();
            assert_eq!(output.len(), input.len());
            assert!(output.peak() < 4.0, "order {order} peak {}", output.peak());
            assert!(output.rms() <= input.rms() * 1.05);
        }
    }
}

#[test]
fn test_default_chain_end_to_end() {
    let input_path = scratch("e2e-in.wav");
    let output_path = scratch("e2e-out.wav");
    let input = sine(440.0, 0.5, 44100, 88200);
    write_wav(&input_path, &input, OutputSampleFormat::Float32).unwrap();

    let report = process(&input_path, &output_path).unwrap();
    assert_eq!(report.stages, vec!["Flanger", "Phaser"]);
    assert_eq!(report.output_samples, 88200);

    let output = load_mono(&output_path).unwrap();
    std::fs::remove_file(&input_path).unwrap();
    std::fs::remove_file(&output_path).unwrap();

    assert_eq!(output.len(), 88200);
    assert_eq!(output.sample_rate(), 44100);
    let ratio = output.rms() / input.rms();
    assert!((0.25..=1.5).contains(&ratio), "rms ratio {ratio}");
}

#[test]
fn test_failed_run_leaves_no_output() {
    let input_path = scratch("fail-in.wav");
    let output_path = scratch("fail-out.wav");
    write_wav(&input_path, &sine(440.0, 0.5, 8000, 4000), OutputSampleFormat::Float32).unwrap();

    // upper cutoff above Nyquist only shows up once the sample rate is known
    let mut config = EffectConfig::default();
    config.set_enabled(EffectKind::Bandpass, true);
    let result = Vocoder::new(config).unwrap().process(&input_path, &output_path);
    std::fs::remove_file(&input_path).unwrap();

    assert!(matches!(result, Err(VocoderError::Configuration(_))));
    assert!(!output_path.exists());
}

#[test]
fn test_pcm16_output_format() {
    let input_path = scratch("pcm-in.wav");
    let output_path = scratch("pcm-out.wav");
    write_wav(&input_path, &sine(220.0, 0.5, 22050, 5000), OutputSampleFormat::Float32).unwrap();

    let mut config = EffectConfig::default();
    config.output.sample_format = OutputSampleFormat::Pcm16;
    Vocoder::new(config).unwrap().process(&input_path, &output_path).unwrap();

    let reader = hound::WavReader::open(&output_path).unwrap();
    let spec = reader.spec();
    let frames = reader.len();
    drop(reader);
    std::fs::remove_file(&input_path).unwrap();
    std::fs::remove_file(&output_path).unwrap();

    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(spec.channels, 1);
    assert_eq!(frames, 5000);
}

#[test]
fn test_reverb_from_toml_extends_tail() {
    let input_path = scratch("verb-in.wav");
    let ir_path = scratch("verb-ir.wav");
    let output_path = scratch("verb-out.wav");
    write_wav(&input_path, &sine(440.0, 0.5, 16000, 8000), OutputSampleFormat::Float32).unwrap();
    let ir: Vec<f32> = (0..800)
        .map(|i| (-(i as f32) / 100.0).exp() * if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect();
    let ir = AudioBuffer::new(ir, 16000).unwrap();
    write_wav(&ir_path, &ir, OutputSampleFormat::Float32).unwrap();

    let toml = format!(
        "[flanger]\nenabled = false\n\n[phaser]\nenabled = false\n\n\
         [reverb]\nimpulse_response = {:?}\nmix = 0.5\nenabled = true\n",
        ir_path.display().to_string()
    );
    let config = EffectConfig::from_toml_str(&toml).unwrap();
    let report = Vocoder::new(config).unwrap().process(&input_path, &output_path).unwrap();
    let output = load_mono(&output_path).unwrap();
    for path in [&input_path, &ir_path, &output_path] {
        std::fs::remove_file(path).unwrap();
    }

    assert_eq!(report.stages, vec!["Convolution Reverb"]);
    assert_eq!(output.len(), 8000 + 800 - 1);
    assert!(output.samples()[8000..].iter().any(|s| s.abs() > 1e-4));
}
