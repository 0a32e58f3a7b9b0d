use std::fs;
use std::path::{Path, PathBuf};

/// `IMG_0001.jpg.xmp` wins over `IMG_0001.xmp`.
pub fn find_xmp_sidecar(media_path: &Path) -> Option<PathBuf> {
    let dir = media_path.parent()?;
    let name = media_path.file_name()?.to_string_lossy().to_string();
    let stem = media_path.file_stem()?.to_string_lossy().to_string();

    find_candidate_with_case_variants(dir, &name, "xmp")
        .or_else(|| find_candidate_with_case_variants(dir, &stem, "xmp"))
}

pub fn find_takeout_sidecar(media_path: &Path) -> Option<PathBuf> {
    let dir = media_path.parent()?;
    let name = media_path.file_name()?.to_string_lossy().to_string();
    find_candidate_with_case_variants(dir, &name, "json")
}

fn find_candidate_with_case_variants(search_dir: &Path, stem: &str, ext: &str) -> Option<PathBuf> {
    let lower = search_dir.join(format!("{}.{}", stem, ext));
    if lower.is_file() {
        return Some(lower);
    }

    let upper = search_dir.join(format!("{}.{}", stem, ext.to_ascii_uppercase()));
    if upper.is_file() {
        return Some(upper);
    }

    let expected = format!("{}.{}", stem, ext).to_ascii_lowercase();
    let entries = fs::read_dir(search_dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().eq_ignore_ascii_case(&expected) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{find_takeout_sidecar, find_xmp_sidecar};
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs must be creatable");
        }
        File::create(path).expect("file must be creatable");
    }

    #[test]
    fn prefers_full_name_xmp_over_stem_xmp() {
        let temp = tempdir().expect("tempdir");
        let media = temp.path().join("DSC00001.ARW");
        let full = temp.path().join("DSC00001.ARW.xmp");
        let stem = temp.path().join("DSC00001.xmp");
        touch(&media);
        touch(&full);
        touch(&stem);

        assert_eq!(find_xmp_sidecar(&media).as_deref(), Some(full.as_path()));
    }

    #[test]
    fn finds_stem_xmp_with_upper_case_extension() {
        let temp = tempdir().expect("tempdir");
        let media = temp.path().join("DSC00002.jpg");
        let stem = temp.path().join("DSC00002.XMP");
        touch(&media);
        touch(&stem);

        let found = find_xmp_sidecar(&media).expect("xmp should be found");
        assert!(found
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.eq_ignore_ascii_case("xmp"))
            .unwrap_or(false));
    }

    #[test]
    fn takeout_sidecar_requires_full_media_name() {
        let temp = tempdir().expect("tempdir");
        let media = temp.path().join("PXL_1.jpg");
        touch(&media);
        touch(&temp.path().join("PXL_1.json"));
        assert!(find_takeout_sidecar(&media).is_none());

        let json = temp.path().join("PXL_1.jpg.json");
        touch(&json);
        assert_eq!(find_takeout_sidecar(&media).as_deref(), Some(json.as_path()));
    }
}
