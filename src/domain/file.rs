/// ドメイン層: アップロード候補ファイル
///
/// バリデーション前のファイルのメタデータ。擬似転送なので中身は送らない。
use crate::domain::error::DomainError;
use serde::Serialize;
use std::path::Path;

/// 拡張子からも内容からも判別できない場合の MIME タイプ
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    /// ローカルファイルのメタデータから候補ファイルを作成
    ///
    /// # エラー
    /// - ファイルが存在しない
    /// - ディレクトリが指定された
    pub fn from_path(file_path: &str) -> Result<Self, DomainError> {
        let path = Path::new(file_path);

        let metadata =
            std::fs::metadata(path).map_err(|_| DomainError::file_not_found(file_path))?;

        if metadata.is_dir() {
            return Err(DomainError::not_a_file(file_path));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path)
            .to_string();

        Ok(Self::new(name, metadata.len(), mime_type_for(path)))
    }

    /// プレビュー生成の対象か
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// MIME タイプを推定する
///
/// 拡張子で引けなければ先頭バイトのシグネチャで判別する。
pub fn mime_type_for(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.mime_type().to_string(),
        _ => FALLBACK_MIME_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("dir/b.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("missing.unknownext")), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_mime_type_for_less_common_extensions() {
        assert_eq!(mime_type_for(Path::new("scan.tiff")), "image/tiff");
        assert_eq!(mime_type_for(Path::new("README.md")), "text/markdown");
        assert_eq!(
            mime_type_for(Path::new("report.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[test]
    fn test_mime_type_from_content_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("snapshot");
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, png).expect("write");

        assert_eq!(mime_type_for(&path), "image/png");
    }

    #[test]
    fn test_extension_allowed_by_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("scan.tiff");
        std::fs::write(&path, b"II*\0").expect("write");

        let file = CandidateFile::from_path(path.to_str().expect("utf-8 path"))
            .expect("file should load");
        assert_eq!(file.mime_type, "image/tiff");
        assert!(file.is_image());
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("photo.png");
        std::fs::write(&path, vec![0u8; 500]).expect("write");

        let file = CandidateFile::from_path(path.to_str().expect("utf-8 path"))
            .expect("file should load");
        assert_eq!(file.name, "photo.png");
        assert_eq!(file.size, 500);
        assert_eq!(file.mime_type, "image/png");
        assert!(file.is_image());
    }

    #[test]
    fn test_from_path_missing() {
        let err = CandidateFile::from_path("/nonexistent/file.png").unwrap_err();
        assert!(matches!(err, DomainError::FileNotFound { .. }));
    }

    #[test]
    fn test_from_path_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let err = CandidateFile::from_path(temp_dir.path().to_str().expect("utf-8 path"))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAFile { .. }));
    }
}
