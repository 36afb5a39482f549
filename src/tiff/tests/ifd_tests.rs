//! Tests for IFD and tag value handling

use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::{TagValue, IFD};

#[test]
fn test_ascii_count_includes_terminator() {
    let value = TagValue::Ascii("layer".to_string());
    assert_eq!(value.count(), 6);
    assert_eq!(value.to_le_bytes(), b"layer\0".to_vec());
    assert_eq!(value.field_type(), field_types::ASCII);
}

#[test]
fn test_unsigned_views() {
    assert_eq!(TagValue::Shorts(vec![8, 8]).as_u64_vec(), Some(vec![8, 8]));
    assert_eq!(TagValue::Long8s(vec![1 << 40]).as_u64_vec(), Some(vec![1 << 40]));
    assert_eq!(TagValue::Floats(vec![1.0]).as_u64_vec(), None);
    assert_eq!(TagValue::Rationals(vec![(1, 2)]).to_le_bytes(), vec![1, 0, 0, 0, 2, 0, 0, 0]);
}

#[test]
fn test_ifd_accessors() {
    let mut ifd = IFD::new(0, 8);
    assert!(ifd.get_dimensions().is_none());
    assert_eq!(ifd.get_samples_per_pixel(), 1);

    ifd.set(tags::IMAGE_LENGTH, TagValue::Shorts(vec![480]));
    ifd.set(tags::IMAGE_WIDTH, TagValue::Longs(vec![640]));
    ifd.set(tags::SAMPLES_PER_PIXEL, TagValue::Shorts(vec![4]));
    ifd.set(tags::SOFTWARE, TagValue::Ascii("layerkit".to_string()));

    assert_eq!(ifd.get_dimensions(), Some((640, 480)));
    assert_eq!(ifd.get_samples_per_pixel(), 4);
    assert_eq!(ifd.get_ascii(tags::SOFTWARE), Some("layerkit"));
    assert!(!ifd.is_tiled());

    // Entries iterate in ascending tag order
    let order: Vec<u16> = ifd.entries().map(|(tag, _)| tag).collect();
    assert_eq!(order, vec![tags::IMAGE_WIDTH, tags::IMAGE_LENGTH, tags::SAMPLES_PER_PIXEL, tags::SOFTWARE]);

    assert!(ifd.remove(tags::SOFTWARE).is_some());
    assert_eq!(ifd.entry_count(), 3);
}
