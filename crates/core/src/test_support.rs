//! Byte-level fixtures shared by unit tests.

/// Minimal baseline JPEG whose EXIF IFD carries `DateTimeOriginal = date`.
/// `date` must be the 19-character EXIF form.
pub(crate) fn jpeg_with_exif_date(date: &str) -> Vec<u8> {
    assert_eq!(date.len(), 19, "exif dates are 19 ascii characters");

    let mut tiff = Vec::new();
    // Little-endian header, IFD0 at offset 8.
    tiff.extend_from_slice(b"II\x2a\x00");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    // IFD0: one ExifIFDPointer entry.
    tiff.extend_from_slice(&1u16.to_le_bytes());
    push_ifd_entry(&mut tiff, 0x8769, 4, 1, 26);
    tiff.extend_from_slice(&0u32.to_le_bytes());
    // Exif IFD at 26: DateTimeOriginal, value stored at 44.
    tiff.extend_from_slice(&1u16.to_le_bytes());
    push_ifd_entry(&mut tiff, 0x9003, 2, 20, 44);
    tiff.extend_from_slice(&0u32.to_le_bytes());
    debug_assert_eq!(tiff.len(), 44);
    tiff.extend_from_slice(date.as_bytes());
    tiff.push(0);

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);

    let mut jpeg = vec![0xff, 0xd8, 0xff, 0xe1];
    jpeg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&payload);
    jpeg.extend_from_slice(&[0xff, 0xd9]);
    jpeg
}

fn push_ifd_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

/// One ISO-BMFF box with a 32-bit size header.
pub(crate) fn bmff_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Version-0 `mvhd` whose creation time is `created` QuickTime seconds.
pub(crate) fn mvhd_v0(created: u32) -> Vec<u8> {
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(&created.to_be_bytes());
    payload.extend_from_slice(&created.to_be_bytes());
    payload.extend_from_slice(&600u32.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(&[0u8; 80]);
    bmff_box(b"mvhd", &payload)
}
