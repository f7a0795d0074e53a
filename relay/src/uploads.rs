use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

use crate::error::{RelayError, RelayResult};

const IMAGE_DATA_PREFIXES: [&str; 2] = ["data:image/png;base64,", "data:image/jpeg;base64,"];

/// Joins a single file name segment to `root`, refusing anything that would escape it
/// or that is not already in normal form.
pub fn safe_file_path(root: &Path, segment: &str) -> RelayResult<PathBuf> {
    let mut components = Path::new(segment).components();

    let is_single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == segment
    );

    if !is_single_normal {
        warn!(root = %root.display(), segment, "attempted path traversal");

        return Err(RelayError::PathTraversal {
            root: root.to_path_buf(),
            segment: String::from(segment),
        });
    }

    Ok(root.join(segment))
}

/// Decodes image data as sent by clients, with or without a `data:` url header
pub fn decode_image_data(image_data: &str) -> RelayResult<Vec<u8>> {
    let encoded = IMAGE_DATA_PREFIXES
        .iter()
        .find_map(|prefix| image_data.strip_prefix(prefix))
        .unwrap_or(image_data);

    if encoded.is_empty() {
        return Err(RelayError::Upload(String::from("no image data")));
    }

    STANDARD
        .decode(encoded)
        .map_err(|e| RelayError::Upload(format!("image data is not base64: {}", e)))
}

/// Writes an image into the upload folder of a room, returns the stored file name.
/// Files live under `<root>/<read_only_id>/<read_only_id>_<date>.png`.
pub async fn store_image(
    root: &Path,
    read_only_id: &str,
    date: &str,
    image_data: &str,
) -> RelayResult<String> {
    let image = decode_image_data(image_data)?;

    let room_dir = safe_file_path(root, read_only_id)?;
    let file_name = format!("{}_{}.png", read_only_id, date);
    let file_path = safe_file_path(&room_dir, &file_name)?;

    tokio::fs::create_dir_all(&room_dir)
        .await
        .map_err(|e| RelayError::Upload(format!("could not create upload folder: {}", e)))?;
    tokio::fs::write(&file_path, image)
        .await
        .map_err(|e| RelayError::Upload(format!("could not write image: {}", e)))?;

    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_path_accepts_plain_names() {
        let root = Path::new("public/uploads");

        assert_eq!(
            safe_file_path(root, "abc_123.png").unwrap(),
            PathBuf::from("public/uploads/abc_123.png")
        );
    }

    #[test]
    fn test_safe_file_path_rejects_traversal() {
        let root = Path::new("public/uploads");

        for segment in ["", ".", "..", "../etc", "a/b", "/etc/passwd", "./a", "a/", "a/../b"] {
            assert!(
                matches!(safe_file_path(root, segment), Err(RelayError::PathTraversal { .. })),
                "segment '{}' should be rejected",
                segment
            );
        }
    }

    #[test]
    fn test_decode_image_data() {
        let encoded = STANDARD.encode(b"png-bytes");

        assert_eq!(decode_image_data(&encoded).unwrap(), b"png-bytes");
        assert_eq!(
            decode_image_data(&format!("data:image/png;base64,{}", encoded)).unwrap(),
            b"png-bytes"
        );
        assert_eq!(
            decode_image_data(&format!("data:image/jpeg;base64,{}", encoded)).unwrap(),
            b"png-bytes"
        );
        assert!(matches!(decode_image_data(""), Err(RelayError::Upload(_))));
        assert!(matches!(decode_image_data("data:image/png;base64,"), Err(RelayError::Upload(_))));
    }

    #[tokio::test]
    async fn test_store_image() {
        let root = tempfile::tempdir().unwrap();
        let encoded = STANDARD.encode(b"png-bytes");

        let file_name = store_image(root.path(), "ro-id", "1700000000", &encoded)
            .await
            .unwrap();

        assert_eq!(file_name, "ro-id_1700000000.png");
        let written = std::fs::read(root.path().join("ro-id").join(&file_name)).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[tokio::test]
    async fn test_store_image_rejects_unsafe_date() {
        let root = tempfile::tempdir().unwrap();
        let encoded = STANDARD.encode(b"png-bytes");

        let result = store_image(root.path(), "ro-id", "../../escape", &encoded).await;

        assert!(matches!(result, Err(RelayError::PathTraversal { .. })));
    }
}
