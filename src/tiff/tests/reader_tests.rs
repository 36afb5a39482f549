//! Tests for the TIFF reader

use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian};

use super::test_utils::{create_strip_tiff, create_test_bigtiff_buffer};
use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::TiffError;
use crate::tiff::reader::{decoded_size, SampleKind, TiffReader};

#[test]
fn test_read_and_decode_8bit() {
    let mut cursor = create_strip_tiff::<LittleEndian>(2, 2, 8, 1, &[1, 2, 3, 4]);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.byte_order, ByteOrder::LittleEndian);
    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(), Some((2, 2)));
    assert_eq!(SampleKind::of_ifd(ifd).unwrap(), SampleKind::U8);

    let decoded = reader.decode_samples(&mut cursor, ifd).unwrap();
    assert_eq!(decoded.samples, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_decode_big_endian_16bit_two_samples() {
    // One pixel per row, samples (258, 65535) and (1, 2)
    let data = [0x01, 0x02, 0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02];
    let mut cursor = create_strip_tiff::<BigEndian>(1, 2, 16, 2, &data);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    assert_eq!(tiff.byte_order, ByteOrder::BigEndian);

    let decoded = reader.decode_samples(&mut cursor, tiff.main_ifd().unwrap()).unwrap();
    assert_eq!(decoded.samples_per_pixel, 2);
    assert_eq!(decoded.plane(0), vec![258.0, 1.0]);
    assert_eq!(decoded.plane(1), vec![65535.0, 2.0]);
}

#[test]
fn test_decode_float_samples() {
    let mut data = Vec::new();
    data.extend_from_slice(&0.5f32.to_le_bytes());
    data.extend_from_slice(&(-2.0f32).to_le_bytes());
    let mut cursor = create_strip_tiff::<LittleEndian>(2, 1, 32, 1, &data);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let decoded = reader.decode_samples(&mut cursor, tiff.main_ifd().unwrap()).unwrap();
    assert_eq!(decoded.samples, vec![0.5, -2.0]);
}

#[test]
fn test_truncated_strip_is_rejected() {
    let mut cursor = create_strip_tiff::<LittleEndian>(4, 4, 8, 1, &[0; 8]);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(reader.decode_samples(&mut cursor, tiff.main_ifd().unwrap()).is_err());
}

#[test]
fn test_read_bigtiff_header() {
    let mut cursor = create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(tiff.is_big_tiff);
    assert!(reader.is_big_tiff());
    assert_eq!(tiff.ifd_count(), 1);
    assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_unsupported_version() {
    let mut cursor = Cursor::new(vec![0x49, 0x49, 41, 0, 8, 0, 0, 0]);
    let result = TiffReader::new().read(&mut cursor);

    assert!(matches!(result, Err(TiffError::UnsupportedVersion(41))));
}

#[test]
fn test_missing_subimage() {
    let mut cursor = create_strip_tiff::<LittleEndian>(1, 1, 8, 1, &[7]);
    let tiff = TiffReader::new().read(&mut cursor).unwrap();

    assert!(matches!(tiff.subimage(1), Err(TiffError::SubImageNotFound { index: 1, available: 1 })));
}

#[test]
fn test_overflowing_dimensions_are_rejected() {
    let mut cursor = create_strip_tiff::<LittleEndian>(u32::MAX, u32::MAX, 32, 2, &[0; 16]);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let result = reader.decode_samples(&mut cursor, tiff.main_ifd().unwrap());
    assert!(matches!(result, Err(TiffError::InvalidDimensions(_))));
}

#[test]
fn test_oversized_header_with_short_strip_is_rejected() {
    // Declares about 4 TB of samples backed by a 16-byte strip
    let mut cursor = create_strip_tiff::<LittleEndian>(1_000_000, 1_000_000, 32, 1, &[0; 16]);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let result = reader.decode_samples(&mut cursor, tiff.main_ifd().unwrap());
    match result {
        Err(TiffError::GenericError(message)) => assert!(message.contains("truncated")),
        other => panic!("expected a truncation error, got {:?}", other.map(|d| d.samples.len())),
    }
}

#[test]
fn test_decoded_size_checks_overflow() {
    assert_eq!(decoded_size(4, 2, 3, 2).unwrap(), 48);
    assert!(matches!(decoded_size(usize::MAX, 2, 1, 1), Err(TiffError::InvalidDimensions(_))));
}
