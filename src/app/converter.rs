// converter.rs
use crate::utils::{measure_time, Logger};
use image::RgbImage;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-file conversion failure. `Read` and `Decode` cover everything up to
/// having pixels in memory; `Encode` and `Write` cover the JPEG side.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of processing one input file.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Converted(PathBuf),
    Failed(String),
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: usize,
    pub total: usize,
}

/// Output path for an input: same directory, same stem, `.jpg` extension.
/// `with_extension` replaces any existing extension regardless of case and
/// appends one when the input has none.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("jpg")
}

/// Convert a single HEIC file to a JPEG written at `output_path(input)`,
/// overwriting any existing file there. Returns the output path.
pub fn convert_file(input: &Path) -> Result<PathBuf, ConvertError> {
    let img = decode_heic(input)?;
    let out = output_path(input);

    let mut jpeg_data = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new(&mut jpeg_data);
    encoder
        .encode_image(&img)
        .map_err(|e| ConvertError::Encode {
            path: input.display().to_string(),
            source: e,
        })?;

    fs::write(&out, &jpeg_data).map_err(|e| ConvertError::Write {
        path: out.display().to_string(),
        source: e,
    })?;

    Ok(out)
}

/// Decode the primary image of a HEIC container into an interleaved RGB
/// bitmap. Alpha, HDR bit depths and auxiliary images are left to libheif's
/// default conversion to 8-bit RGB.
fn decode_heic(input: &Path) -> Result<RgbImage, ConvertError> {
    let decode_err = |reason: String| ConvertError::Decode {
        path: input.display().to_string(),
        reason,
    };

    let data = fs::read(input).map_err(|e| ConvertError::Read {
        path: input.display().to_string(),
        source: e,
    })?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(&data).map_err(|e| decode_err(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| decode_err(e.to_string()))?;
    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| decode_err(e.to_string()))?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| decode_err("no interleaved RGB plane in decoded image".to_string()))?;

    let width = plane.width;
    let height = plane.height;
    let row_len = width as usize * 3;

    // The plane rows are padded to `stride` bytes; copy them out tightly.
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for y in 0..height as usize {
        let start = y * plane.stride;
        let row = plane
            .data
            .get(start..start + row_len)
            .ok_or_else(|| decode_err("pixel buffer shorter than plane dimensions".to_string()))?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| decode_err("pixel buffer does not match image dimensions".to_string()))
}

/// Run a batch over `paths` in order, one file at a time.
///
/// Failures are per-file: `on_file_error(path, message)` fires once for the
/// offending file and the batch moves on. `on_progress(done, total)` fires
/// after every file, success or not, with `done` counting up from 1. An
/// empty `paths` returns a zero summary without invoking either callback.
pub fn convert_batch<P, E>(
    paths: &[PathBuf],
    logger: Option<&Logger>,
    on_progress: P,
    on_file_error: E,
) -> ConversionSummary
where
    P: FnMut(usize, usize),
    E: FnMut(&Path, &str),
{
    let convert = |input: &Path| {
        let (result, duration) = measure_time(|| convert_file(input));
        if let Some(logger) = logger {
            match &result {
                Ok(out) => logger.log(format!(
                    "Converted {} -> {} in {:?}",
                    input.display(),
                    out.display(),
                    duration
                )),
                Err(e) => logger.log(format!("Failed: {}", e)),
            }
        }
        result
    };
    convert_batch_with(paths, convert, on_progress, on_file_error)
}

fn convert_batch_with<C, P, E>(
    paths: &[PathBuf],
    mut convert: C,
    mut on_progress: P,
    mut on_file_error: E,
) -> ConversionSummary
where
    C: FnMut(&Path) -> Result<PathBuf, ConvertError>,
    P: FnMut(usize, usize),
    E: FnMut(&Path, &str),
{
    let total = paths.len();
    let mut converted = 0;

    for (index, path) in paths.iter().enumerate() {
        let outcome = match convert(path) {
            Ok(out) => ConversionOutcome::Converted(out),
            Err(e) => ConversionOutcome::Failed(e.to_string()),
        };

        match &outcome {
            ConversionOutcome::Converted(_) => converted += 1,
            ConversionOutcome::Failed(message) => on_file_error(path, message),
        }

        on_progress(index + 1, total);
    }

    ConversionSummary { converted, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn stub_ok(input: &Path) -> Result<PathBuf, ConvertError> {
        let out = output_path(input);
        fs::write(&out, b"jpeg").map_err(|e| ConvertError::Write {
            path: out.display().to_string(),
            source: e,
        })?;
        Ok(out)
    }

    #[test]
    fn output_path_replaces_extension() {
        assert_eq!(output_path(Path::new("/tmp/foo.heic")), Path::new("/tmp/foo.jpg"));
        assert_eq!(output_path(Path::new("/tmp/foo.HEIC")), Path::new("/tmp/foo.jpg"));
        assert_eq!(output_path(Path::new("/tmp/foo")), Path::new("/tmp/foo.jpg"));
        assert_eq!(
            output_path(Path::new("/a/b/photo 001.Heif")),
            Path::new("/a/b/photo 001.jpg")
        );
    }

    #[test]
    fn empty_batch_reports_zero_and_fires_no_callbacks() {
        let summary = convert_batch_with(
            &[],
            stub_ok,
            |_, _| panic!("progress callback on empty batch"),
            |_, _| panic!("error callback on empty batch"),
        );
        assert_eq!(summary, ConversionSummary { converted: 0, total: 0 });
    }

    #[test]
    fn progress_fires_once_per_file_with_increasing_index() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a.heic", "b.heic", "c.heic"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();

        let seen = RefCell::new(Vec::new());
        let summary = convert_batch_with(
            &paths,
            stub_ok,
            |done, total| seen.borrow_mut().push((done, total)),
            |_, _| panic!("no errors expected"),
        );

        assert_eq!(summary, ConversionSummary { converted: 3, total: 3 });
        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn one_bad_file_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a.heic", "bad.heic", "b.heic", "c.heic"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();

        let convert = |input: &Path| {
            if input.file_name().unwrap() == "bad.heic" {
                Err(ConvertError::Decode {
                    path: input.display().to_string(),
                    reason: "not a HEIC container".to_string(),
                })
            } else {
                stub_ok(input)
            }
        };

        let errors = RefCell::new(Vec::new());
        let progressed = RefCell::new(0usize);
        let summary = convert_batch_with(
            &paths,
            convert,
            |_, _| *progressed.borrow_mut() += 1,
            |path, message| {
                errors
                    .borrow_mut()
                    .push((path.to_path_buf(), message.to_string()))
            },
        );

        assert_eq!(summary, ConversionSummary { converted: 3, total: 4 });
        assert_eq!(*progressed.borrow(), 4);

        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, dir.path().join("bad.heic"));
        assert!(errors[0].1.contains("bad.heic"));

        assert!(dir.path().join("a.jpg").exists());
        assert!(dir.path().join("b.jpg").exists());
        assert!(dir.path().join("c.jpg").exists());
        assert!(!dir.path().join("bad.jpg").exists());
    }

    #[test]
    fn rerunning_a_batch_overwrites_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a.heic")];

        let first = convert_batch_with(&paths, stub_ok, |_, _| {}, |_, _| {});
        let second = convert_batch_with(&paths, stub_ok, |_, _| {}, |_, _| {});

        assert_eq!(first, ConversionSummary { converted: 1, total: 1 });
        assert_eq!(second, first);
        assert!(dir.path().join("a.jpg").exists());
    }

    #[test]
    fn garbage_bytes_fail_decode_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.heic");
        fs::write(&input, b"this is not a heic container at all").unwrap();

        match convert_file(&input) {
            Err(ConvertError::Decode { .. }) => {}
            other => panic!("expected decode error, got {:?}", other.map(|p| p.display().to_string())),
        }
        assert!(!dir.path().join("garbage.jpg").exists());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nope.heic");

        match convert_file(&input) {
            Err(ConvertError::Read { .. }) => {}
            other => panic!("expected read error, got {:?}", other.map(|p| p.display().to_string())),
        }
    }
}
