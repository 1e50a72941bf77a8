// Integration tests for the PCM16 codec and its base64 transport text

use stagecast::audio::pcm::{
    decode_pcm16, encode_pcm16, from_transport_text, pcm16_to_bytes, samples_to_transport_text,
    to_transport_text,
};
use stagecast::audio::{AudioSegment, NARRATION_SAMPLE_RATE};
use stagecast::DecodeError;

// Truncation plus the 32767/32768 encode/decode scale asymmetry
const STEP: f32 = 2.0 / 32768.0;

#[test]
fn test_round_trip_within_one_quantization_step() {
    let mut x = -1.0f32;
    while x <= 1.0 {
        let bytes = pcm16_to_bytes(&encode_pcm16(&[x]));
        let decoded = decode_pcm16(&bytes);

        assert_eq!(decoded.len(), 1);
        assert!(
            (decoded[0] - x).abs() <= STEP,
            "{} decoded as {}",
            x,
            decoded[0]
        );

        x += 0.0137;
    }
}

#[test]
fn test_encode_clamps_out_of_range_samples() {
    assert_eq!(encode_pcm16(&[2.5, -3.0]), vec![32767, -32768]);
    assert_eq!(encode_pcm16(&[1.0, -1.0, 0.0]), vec![32767, -32768, 0]);
}

#[test]
fn test_pcm_bytes_are_little_endian() {
    let bytes = pcm16_to_bytes(&[0x1234, -2]);
    assert_eq!(bytes, vec![0x34, 0x12, 0xfe, 0xff]);
}

#[test]
fn test_transport_text_round_trip() {
    let bytes: Vec<u8> = (0..=255u8).collect();
    let text = to_transport_text(&bytes);

    assert!(text.is_ascii());
    assert_eq!(from_transport_text(&text).unwrap(), bytes);
}

#[test]
fn test_transport_text_rejects_garbage() {
    let result = from_transport_text("not base64 at all!");
    assert!(matches!(result, Err(DecodeError::TransportText(_))));
}

#[test]
fn test_samples_survive_transport_text() {
    let samples = vec![0.0, 0.25, -0.25, 0.999, -0.999];
    let text = samples_to_transport_text(&samples);

    let segment = AudioSegment::from_transport_text(&text, NARRATION_SAMPLE_RATE).unwrap();
    assert_eq!(segment.samples.len(), samples.len());
    for (decoded, original) in segment.samples.iter().zip(&samples) {
        assert!((decoded - original).abs() <= STEP);
    }
}

#[test]
fn test_segment_rejects_odd_length_payload() {
    let text = to_transport_text(&[0x00, 0x40, 0x7f]);
    let result = AudioSegment::from_transport_text(&text, NARRATION_SAMPLE_RATE);
    assert_eq!(result, Err(DecodeError::OddLength(3)));
}

#[test]
fn test_segment_duration() {
    let segment = AudioSegment::new(vec![0.0; 12000], NARRATION_SAMPLE_RATE);
    assert!((segment.duration() - 0.5).abs() < 1e-9);

    assert_eq!(AudioSegment::silence(0.25, 16000).samples.len(), 4000);
}
