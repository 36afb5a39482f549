use std::io::Cursor;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Writes one classic IFD entry whose value fits in the 4-byte field
fn write_inline_entry<B: ByteOrder>(buffer: &mut Vec<u8>, tag: u16, field_type: u16, values: &[u32]) {
    buffer.write_u16::<B>(tag).unwrap();
    buffer.write_u16::<B>(field_type).unwrap();
    buffer.write_u32::<B>(values.len() as u32).unwrap();

    let mut field = Vec::new();
    for value in values {
        match field_type {
            3 => field.write_u16::<B>(*value as u16).unwrap(), // SHORT
            _ => field.write_u32::<B>(*value).unwrap(),        // LONG
        }
    }
    field.resize(4, 0);
    buffer.extend_from_slice(&field);
}

/// Creates a single-strip, uncompressed classic TIFF in the byte order `B`
///
/// At most two samples per pixel, so BitsPerSample stays inline. `data`
/// must already be encoded in the byte order `B`.
pub fn create_strip_tiff<B: ByteOrder>(width: u32, height: u32, bits: u16, samples_per_pixel: u16, data: &[u8]) -> Cursor<Vec<u8>> {
    assert!(samples_per_pixel <= 2);
    let mut buffer = Vec::new();

    // II and MM read the same in either byte order
    let marker = if B::read_u16(&[0x49, 0x00]) == 0x49 { 0x4949 } else { 0x4D4D };
    buffer.write_u16::<B>(marker).unwrap();
    buffer.write_u16::<B>(42).unwrap();
    buffer.write_u32::<B>(8).unwrap();

    let entry_count = 9u16;
    let data_offset = 8 + 2 + 12 * entry_count as u32 + 4;
    let spp = samples_per_pixel as usize;
    let sample_format = if bits == 32 { 3 } else { 1 };

    buffer.write_u16::<B>(entry_count).unwrap();
    write_inline_entry::<B>(&mut buffer, 256, 4, &[width]);
    write_inline_entry::<B>(&mut buffer, 257, 4, &[height]);
    write_inline_entry::<B>(&mut buffer, 258, 3, &vec![bits as u32; spp]);
    write_inline_entry::<B>(&mut buffer, 259, 3, &[1]);
    write_inline_entry::<B>(&mut buffer, 273, 4, &[data_offset]);
    write_inline_entry::<B>(&mut buffer, 277, 3, &[samples_per_pixel as u32]);
    write_inline_entry::<B>(&mut buffer, 278, 4, &[height]);
    write_inline_entry::<B>(&mut buffer, 279, 4, &[data.len() as u32]);
    write_inline_entry::<B>(&mut buffer, 339, 3, &vec![sample_format; spp]);
    buffer.write_u32::<B>(0).unwrap();

    assert_eq!(buffer.len() as u32, data_offset);
    buffer.extend_from_slice(data);
    Cursor::new(buffer)
}

/// Creates a BigTIFF buffer holding one IFD with only the image dimensions
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count

    buffer.write_u16::<LittleEndian>(256).unwrap();    // ImageWidth
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(1024).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();    // ImageLength
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(768).unwrap();

    buffer.write_u64::<LittleEndian>(0).unwrap();      // No next IFD

    Cursor::new(buffer)
}
