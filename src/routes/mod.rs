//! API route handlers, one module per resource cluster.

pub mod about;
pub mod auth;
pub mod gallery;
pub mod photos;
pub mod upload;
pub mod users;

use crate::error::ApiError;

/// Validate a client-supplied filename before it is used on disk or as a
/// database key. Rejects path traversal and separator characters.
pub fn checked_filename(name: &str) -> Result<&str, ApiError> {
    let ok = !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');

    if ok {
        Ok(name)
    } else {
        Err(ApiError::BadRequest("invalid file name".to_string()))
    }
}

/// Reject zero-length upload bodies. Every multipart file field goes
/// through this before anything touches disk.
pub fn checked_file_bytes(bytes: &[u8]) -> Result<(), ApiError> {
    if bytes.is_empty() {
        Err(ApiError::BadRequest("empty file".to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_filename_accepts_plain_names() {
        assert!(checked_filename("photo-01.jpg").is_ok());
        assert!(checked_filename("resume.pdf").is_ok());
    }

    #[test]
    fn test_checked_filename_rejects_traversal() {
        assert!(checked_filename("../etc/passwd").is_err());
        assert!(checked_filename("a/b.jpg").is_err());
        assert!(checked_filename("a\\b.jpg").is_err());
        assert!(checked_filename("").is_err());
        assert!(checked_filename("nul\0byte").is_err());
    }

    #[test]
    fn test_checked_file_bytes_rejects_empty_uploads() {
        assert!(matches!(
            checked_file_bytes(b""),
            Err(ApiError::BadRequest(_))
        ));
        assert!(checked_file_bytes(b"\xff\xd8\xff").is_ok());
    }
}
