use mime::Mime;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::discovery::Problem;
use crate::error::{Error, Result};
use crate::session::Session;

/// Downloads the statement of `problem` into `dir`, naming the file after the
/// problem and the extension implied by the response's content type.
pub async fn fetch_text(session: &Session, problem: &Problem, dir: &Path) -> Result<PathBuf> {
    let res = session.fetch_problem_text(&problem.id).await?;
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let body = res.bytes().await?;

    let mut file_name = problem.file_stem();
    match content_type.as_deref().and_then(extension_for) {
        Some(ext) => {
            file_name.push('.');
            file_name.push_str(ext);
        }
        None => warn!(
            problem = %problem.name,
            content_type = content_type.as_deref().unwrap_or("<none>"),
            "unknown content type, saving without extension"
        ),
    }

    let path = dir.join(file_name);
    fs::write(&path, &body).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = body.len(), "saved problem text");
    Ok(path)
}

/// Downloads the sample archive of `problem` and unpacks it into
/// `dir/<problem>/`. Returns that directory.
pub async fn fetch_sample(session: &Session, problem: &Problem, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(problem.file_stem());
    fs::create_dir_all(&target)?;

    let body = session.fetch_sample_archive(&problem.id).await?.bytes().await?;
    let count = extract_zip(&body, &target)?;
    debug!(problem = %problem.name, entries = count, "extracted samples");
    Ok(target)
}

/// Maps a `Content-Type` header value to a file extension. Parameters such as
/// `charset` are ignored.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime: Mime = content_type.trim().parse().ok()?;
    let extensions = mime_guess::get_mime_extensions_str(mime.essence_str())?;
    let subtype = mime.subtype().as_str();

    extensions
        .iter()
        .find(|ext| ext.eq_ignore_ascii_case(subtype))
        .or_else(|| extensions.first())
        .copied()
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<usize> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::Extraction(e.to_string()))?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Extraction(e.to_string()))?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            warn!(entry = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        let path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&path)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&path)?;
        io::copy(&mut entry, &mut out).map_err(|e| Error::Extraction(e.to_string()))?;
        extracted += 1;
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extension_should_ignore_parameters() {
        assert_eq!(extension_for("application/pdf"), Some("pdf"));
        assert_eq!(extension_for("application/pdf; charset=binary"), Some("pdf"));
        assert_eq!(extension_for("text/html;charset=UTF-8"), Some("html"));
    }

    #[test]
    fn unknown_content_type_should_have_no_extension() {
        assert_eq!(extension_for("application/x-not-a-real-type"), None);
        assert_eq!(extension_for("garbage"), None);
        assert_eq!(extension_for(""), None);
    }

    #[test]
    fn extract_zip_should_write_entries() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("1.in", "1 2\n"), ("1.ans", "3\n"), ("nested/2.in", "4 5\n")]);

        let count = extract_zip(&bytes, dir.path()).unwrap();

        assert_eq!(count, 3);
        assert_eq!(fs::read_to_string(dir.path().join("1.ans")).unwrap(), "3\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("nested/2.in")).unwrap(),
            "4 5\n"
        );
    }

    #[test]
    fn extract_zip_should_reject_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_zip(b"<html>not found</html>", dir.path()).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
