use crate::datetime::{parse_timestamp, CaptureTimestamp};
use crate::error::SourceError;
use crate::metadata::{FileClass, MetadataSource};
use crate::source::TimestampSource;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const BMFF_EXTS: &[&str] = &["mp4", "mov", "m4v", "3gp"];
const QUICKTIME_EPOCH_OFFSET: u64 = 2_082_844_800;
const CREATION_DATE_KEY: &[u8] = b"com.apple.quicktime.creationdate";
const MAX_TEXT_ATOM: u64 = 1 << 20;

#[derive(Debug, Clone, Copy)]
struct AtomRange {
    data_start: u64,
    data_end: u64,
}

impl AtomRange {
    fn len(self) -> u64 {
        self.data_end.saturating_sub(self.data_start)
    }
}

/// Container-level creation dates of MP4/QuickTime files.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaInfoSource;

impl TimestampSource for MediaInfoSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::MediaInfo
    }

    fn supports(&self, class: FileClass) -> bool {
        class == FileClass::Video
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let ext = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        if !BMFF_EXTS.contains(&ext.as_str()) {
            return Err(SourceError::Unavailable(format!(
                "no container reader for .{ext}"
            )));
        }

        let mut file = fs::File::open(path)?;
        let end = file.metadata()?.len();
        let moov = find_atom(&mut file, 0, end, *b"moov").ok_or(SourceError::Missing)?;

        let mut rejected = None;
        for text in [
            read_keyed_creation_date(&mut file, moov),
            read_udta_day(&mut file, moov),
        ]
        .into_iter()
        .flatten()
        {
            match parse_timestamp(&normalize_media_date(&text)) {
                Ok(ts) => return Ok(ts),
                Err(err) => rejected = Some(err),
            }
        }

        if let Some(ts) = find_atom(&mut file, moov.data_start, moov.data_end, *b"mvhd")
            .and_then(|mvhd| read_header_creation_time(&mut file, mvhd))
        {
            return Ok(ts);
        }

        let mdhd = find_atom(&mut file, moov.data_start, moov.data_end, *b"trak")
            .and_then(|trak| find_atom(&mut file, trak.data_start, trak.data_end, *b"mdia"))
            .and_then(|mdia| find_atom(&mut file, mdia.data_start, mdia.data_end, *b"mdhd"));
        if let Some(ts) = mdhd.and_then(|mdhd| read_header_creation_time(&mut file, mdhd)) {
            return Ok(ts);
        }

        Err(rejected.unwrap_or(SourceError::Missing))
    }
}

/// `UTC 2023-04-13 05:30:15` and similar tool spellings to a parseable form.
pub fn normalize_media_date(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let trimmed = trimmed
        .strip_prefix("UTC ")
        .map(|rest| format!("{}Z", rest.trim()))
        .unwrap_or_else(|| trimmed.to_string());
    if trimmed.ends_with('Z') && !trimmed.contains('T') {
        if let Some((date, time)) = trimmed.split_once(' ') {
            return format!("{date}T{time}");
        }
    }
    trimmed
}

fn find_atom(file: &mut fs::File, start: u64, end: u64, atom_type: [u8; 4]) -> Option<AtomRange> {
    let mut offset = start;
    while offset + 8 <= end {
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header).ok()?;
        let mut atom_size = u64::from(u32::from_be_bytes([header[0], header[1], header[2], header[3]]));
        let atom_kind = [header[4], header[5], header[6], header[7]];
        let mut header_size = 8u64;

        if atom_size == 1 {
            let mut ext = [0u8; 8];
            file.read_exact(&mut ext).ok()?;
            atom_size = u64::from_be_bytes(ext);
            header_size = 16;
        } else if atom_size == 0 {
            atom_size = end.saturating_sub(offset);
        }
        if atom_size < header_size {
            return None;
        }
        let atom_end = offset.saturating_add(atom_size).min(end);
        if atom_end <= offset {
            return None;
        }

        if atom_kind == atom_type {
            return Some(AtomRange {
                data_start: offset + header_size,
                data_end: atom_end,
            });
        }
        offset = atom_end;
    }
    None
}

/// `moov/meta` with a `keys` table naming `com.apple.quicktime.creationdate`.
fn read_keyed_creation_date(file: &mut fs::File, moov: AtomRange) -> Option<String> {
    let meta = find_atom(file, moov.data_start, moov.data_end, *b"meta")?;
    // QuickTime writes `meta` without the ISO full-box header; MP4 writers add it.
    let (keys, ilst) = [meta.data_start, meta.data_start + 4]
        .into_iter()
        .find_map(|start| {
            let keys = find_atom(file, start, meta.data_end, *b"keys")?;
            let ilst = find_atom(file, start, meta.data_end, *b"ilst")?;
            Some((keys, ilst))
        })?;

    let keys = read_range(file, keys)?;
    let index = key_index(&keys, CREATION_DATE_KEY)?;

    let item = find_atom(file, ilst.data_start, ilst.data_end, index.to_be_bytes())?;
    let data = find_atom(file, item.data_start, item.data_end, *b"data")?;
    let bytes = read_range(file, data)?;
    // type indicator and locale precede the value.
    bytes.get(8..).map(|v| String::from_utf8_lossy(v).into_owned())
}

/// 1-based position of `wanted` in a `keys` payload.
fn key_index(keys: &[u8], wanted: &[u8]) -> Option<u32> {
    let count = u32::from_be_bytes(keys.get(4..8)?.try_into().ok()?);
    let mut pos = 8usize;
    for index in 1..=count {
        let size = u32::from_be_bytes(keys.get(pos..pos + 4)?.try_into().ok()?) as usize;
        if size < 8 {
            return None;
        }
        let value = keys.get(pos + 8..pos + size)?;
        if value == wanted {
            return Some(index);
        }
        pos += size;
    }
    None
}

fn read_udta_day(file: &mut fs::File, moov: AtomRange) -> Option<String> {
    let udta = find_atom(file, moov.data_start, moov.data_end, *b"udta")?;
    let day = find_atom(file, udta.data_start, udta.data_end, *b"\xa9day")?;
    let bytes = read_range(file, day)?;

    // Classic QuickTime text: u16 length, u16 language, then the text.
    if bytes.len() >= 4 {
        let declared = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
        if declared > 0 && declared <= bytes.len() - 4 {
            return Some(String::from_utf8_lossy(&bytes[4..4 + declared]).into_owned());
        }
    }
    // iTunes style: a nested `data` atom.
    if bytes.len() > 16 && &bytes[4..8] == b"data" {
        return Some(String::from_utf8_lossy(&bytes[16..]).into_owned());
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// `mvhd` and `mdhd` share the same version/creation-time prefix.
fn read_header_creation_time(file: &mut fs::File, atom: AtomRange) -> Option<CaptureTimestamp> {
    file.seek(SeekFrom::Start(atom.data_start)).ok()?;
    let mut ver_flags = [0u8; 4];
    file.read_exact(&mut ver_flags).ok()?;
    let qt_seconds = if ver_flags[0] == 1 {
        read_u64_be(file)?
    } else {
        u64::from(read_u32_be(file)?)
    };
    // Zero means the writer never set it.
    if qt_seconds <= QUICKTIME_EPOCH_OFFSET {
        return None;
    }
    let unix = i64::try_from(qt_seconds - QUICKTIME_EPOCH_OFFSET).ok()?;
    CaptureTimestamp::from_unix_seconds(unix)
}

fn read_range(file: &mut fs::File, atom: AtomRange) -> Option<Vec<u8>> {
    if atom.len() > MAX_TEXT_ATOM {
        return None;
    }
    file.seek(SeekFrom::Start(atom.data_start)).ok()?;
    let mut buf = vec![0u8; atom.len() as usize];
    file.read_exact(&mut buf).ok()?;
    Some(buf)
}

fn read_u32_be(file: &mut fs::File) -> Option<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).ok()?;
    Some(u32::from_be_bytes(buf))
}

fn read_u64_be(file: &mut fs::File) -> Option<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf).ok()?;
    Some(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::{normalize_media_date, MediaInfoSource, QUICKTIME_EPOCH_OFFSET};
    use crate::datetime::CaptureTimestamp;
    use crate::error::SourceError;
    use crate::source::TimestampSource;
    use crate::test_support::{bmff_box, mvhd_v0};
    use chrono::{Datelike, Timelike};
    use std::fs;
    use tempfile::tempdir;

    fn quicktime_text(text: &str) -> Vec<u8> {
        let mut payload = (text.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(&[0x15, 0xc7]);
        payload.extend_from_slice(text.as_bytes());
        payload
    }

    fn keyed_meta(key: &[u8], value: &str) -> Vec<u8> {
        let mut keys = vec![0, 0, 0, 0, 0, 0, 0, 1];
        keys.extend_from_slice(&((key.len() + 8) as u32).to_be_bytes());
        keys.extend_from_slice(b"mdta");
        keys.extend_from_slice(key);

        let mut data = vec![0, 0, 0, 1, 0, 0, 0, 0];
        data.extend_from_slice(value.as_bytes());
        let item = bmff_box(&1u32.to_be_bytes(), &bmff_box(b"data", &data));

        let mut meta = bmff_box(b"hdlr", &[0u8; 24]);
        meta.extend(bmff_box(b"keys", &keys));
        meta.extend(bmff_box(b"ilst", &item));
        bmff_box(b"meta", &meta)
    }

    fn write_movie(name: &str, moov_children: Vec<u8>) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(name);
        let mut bytes = bmff_box(b"ftyp", b"qt  \x00\x00\x02\x00qt  ");
        bytes.extend(bmff_box(b"mdat", &[0u8; 32]));
        bytes.extend(bmff_box(b"moov", &moov_children));
        fs::write(&path, bytes).expect("write movie");
        (temp, path)
    }

    #[test]
    fn keyed_creation_date_keeps_recorded_offset() {
        let mut moov = mvhd_v0(QUICKTIME_EPOCH_OFFSET as u32 + 1_000);
        moov.extend(keyed_meta(
            b"com.apple.quicktime.creationdate",
            "2023-04-13T14:30:15+0900",
        ));
        let (_temp, path) = write_movie("IMG_1000.MOV", moov);

        let ts = MediaInfoSource.extract(&path).expect("creation date");
        assert_eq!(ts.naive().hour(), 14);
        assert_eq!(ts.offset().map(|o| o.local_minus_utc()), Some(9 * 3600));
    }

    #[test]
    fn udta_day_is_read_before_movie_header() {
        let mut moov = mvhd_v0(QUICKTIME_EPOCH_OFFSET as u32 + 1_000);
        moov.extend(bmff_box(
            b"udta",
            &bmff_box(b"\xa9day", &quicktime_text("2016-08-19T09:10:11")),
        ));
        let (_temp, path) = write_movie("clip.mp4", moov);

        let ts = MediaInfoSource.extract(&path).expect("udta date");
        assert_eq!(ts.naive().year(), 2016);
        assert_eq!(ts.naive().second(), 11);
    }

    #[test]
    fn movie_header_time_is_converted_from_quicktime_epoch() {
        let unix = 1_681_396_215u32;
        let (_temp, path) = write_movie("clip.m4v", mvhd_v0(QUICKTIME_EPOCH_OFFSET as u32 + unix));

        let ts = MediaInfoSource.extract(&path).expect("mvhd date");
        assert_eq!(
            ts,
            CaptureTimestamp::from_unix_seconds(i64::from(unix)).expect("ts")
        );
    }

    #[test]
    fn zero_header_times_fall_through_to_track_header() {
        let unix = 1_500_000_000u32;
        let mdhd = bmff_box(b"mdhd", &mvhd_v0(QUICKTIME_EPOCH_OFFSET as u32 + unix)[8..]);
        let trak = bmff_box(b"trak", &bmff_box(b"mdia", &mdhd));
        let mut moov = mvhd_v0(0);
        moov.extend(trak);
        let (_temp, path) = write_movie("clip.3gp", moov);

        let ts = MediaInfoSource.extract(&path).expect("mdhd date");
        assert_eq!(
            ts,
            CaptureTimestamp::from_unix_seconds(i64::from(unix)).expect("ts")
        );
    }

    #[test]
    fn all_zero_times_are_missing() {
        let (_temp, path) = write_movie("clip.mov", mvhd_v0(0));
        assert!(matches!(
            MediaInfoSource.extract(&path),
            Err(SourceError::Missing)
        ));
    }

    #[test]
    fn non_bmff_containers_are_unavailable() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mkv");
        fs::write(&path, b"\x1a\x45\xdf\xa3").expect("write mkv");
        assert!(matches!(
            MediaInfoSource.extract(&path),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn normalizes_utc_prefix() {
        assert_eq!(
            normalize_media_date("UTC 2023-04-13 05:30:15"),
            "2023-04-13T05:30:15Z"
        );
        assert_eq!(
            normalize_media_date(" 2023:04:13 05:30:15\0"),
            "2023:04:13 05:30:15"
        );
    }
}
