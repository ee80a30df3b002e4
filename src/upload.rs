use std::path::PathBuf;

use thiserror::Error;

use crate::capture::{CapturedImage, PhotoRole};
use crate::profile::ProfilePayload;

/// Form field carrying the JSON-encoded profile.
pub const PROFILE_PART: &str = "personal_data";

/// Every photo goes out as a `.jpg` file of this type, whatever the camera wrote.
pub const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("expected {expected} photos, got {actual}")]
    IncompleteSession { expected: usize, actual: usize },
    #[error("personal data is not loaded")]
    MissingProfile,
    #[error("encode personal data: {0}")]
    Profile(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    File {
        path: PathBuf,
        file_name: String,
        content_type: &'static str,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub name: String,
    pub content: PartContent,
}

/// Multipart body of one advice request. Files are only read when it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBody {
    parts: Vec<UploadPart>,
}

impl UploadBody {
    pub fn parts(&self) -> &[UploadPart] {
        &self.parts
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Key of a meal photo: `ingredients_image_{i}` or `nutrition_image_{i}`, `i` 0-based.
pub fn part_key(role: PhotoRole, item_index: usize) -> String {
    match role {
        PhotoRole::Ingredients => format!("ingredients_image_{item_index}"),
        PhotoRole::NutritionLabel => format!("nutrition_image_{item_index}"),
    }
}

/// Packages a meal: two photos per product plus the profile.
pub fn build_meal(
    images: &[CapturedImage],
    target_item_count: usize,
    profile: Option<&ProfilePayload>,
) -> Result<UploadBody, PackageError> {
    let expected = target_item_count * 2;
    if images.is_empty() || images.len() % 2 != 0 || images.len() != expected {
        return Err(PackageError::IncompleteSession {
            expected,
            actual: images.len(),
        });
    }
    let profile = profile.ok_or(PackageError::MissingProfile)?;

    let mut parts: Vec<UploadPart> = images
        .iter()
        .map(|img| {
            let key = part_key(img.role, img.item_index);
            file_part(img, format!("{key}.jpg"), key)
        })
        .collect();
    parts.push(profile_part(profile)?);
    Ok(UploadBody { parts })
}

/// Packages a single product: exactly two photos keyed `file1`, `file2`.
pub fn build_product(
    images: &[CapturedImage],
    profile: Option<&ProfilePayload>,
) -> Result<UploadBody, PackageError> {
    if images.len() != 2 {
        return Err(PackageError::IncompleteSession {
            expected: 2,
            actual: images.len(),
        });
    }
    let profile = profile.ok_or(PackageError::MissingProfile)?;

    let mut parts: Vec<UploadPart> = images
        .iter()
        .enumerate()
        .map(|(i, img)| file_part(img, format!("photo_{}.jpg", i + 1), format!("file{}", i + 1)))
        .collect();
    parts.push(profile_part(profile)?);
    Ok(UploadBody { parts })
}

fn file_part(img: &CapturedImage, file_name: String, name: String) -> UploadPart {
    UploadPart {
        name,
        content: PartContent::File {
            path: img.storage_ref.path().to_path_buf(),
            file_name,
            content_type: PHOTO_CONTENT_TYPE,
        },
    }
}

fn profile_part(profile: &ProfilePayload) -> Result<UploadPart, PackageError> {
    let json = profile
        .to_json()
        .map_err(|e| PackageError::Profile(e.to_string()))?;
    Ok(UploadPart {
        name: PROFILE_PART.to_string(),
        content: PartContent::Text(json),
    })
}

#[cfg(test)]
mod upload_tests {
    use super::*;
    use crate::capture::CaptureSession;
    use crate::storage::StorageRef;
    use serde_json::json;

    fn profile() -> ProfilePayload {
        let mut p = ProfilePayload::new();
        p.insert("age", json!(30));
        p.insert("gender", json!("male"));
        p
    }

    fn captured(target: i64, shots: usize) -> CaptureSession {
        let mut session = CaptureSession::start(target).unwrap();
        for n in 0..shots {
            session
                .record_capture(StorageRef::new(format!("/cache/s/shot_{n}.jpg")))
                .unwrap();
        }
        session
    }

    #[test]
    fn meal_parts_are_keyed_by_role_and_item() {
        let session = captured(2, 4);
        let body = build_meal(session.images(), 2, Some(&profile())).unwrap();
        assert_eq!(
            body.part_names(),
            vec![
                "ingredients_image_0",
                "nutrition_image_0",
                "ingredients_image_1",
                "nutrition_image_1",
                "personal_data",
            ]
        );
        match &body.parts()[3].content {
            PartContent::File { path, file_name, content_type } => {
                assert_eq!(path, &PathBuf::from("/cache/s/shot_3.jpg"));
                assert_eq!(file_name, "nutrition_image_1.jpg");
                assert_eq!(*content_type, "image/jpeg");
            }
            other => panic!("expected file part, got {:?}", other),
        }
    }

    #[test]
    fn profile_part_is_json() {
        let session = captured(1, 2);
        let body = build_meal(session.images(), 1, Some(&profile())).unwrap();
        let PartContent::Text(json) = &body.parts()[2].content else {
            panic!("profile part should be text");
        };
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value, json!({ "age": 30, "gender": "male" }));
    }

    #[test]
    fn odd_or_short_meal_is_incomplete() {
        let session = captured(2, 3);
        assert_eq!(
            build_meal(session.images(), 2, Some(&profile())).unwrap_err(),
            PackageError::IncompleteSession { expected: 4, actual: 3 }
        );
        let session = captured(2, 2);
        assert_eq!(
            build_meal(session.images(), 2, Some(&profile())).unwrap_err(),
            PackageError::IncompleteSession { expected: 4, actual: 2 }
        );
        assert_eq!(
            build_meal(&[], 0, Some(&profile())).unwrap_err(),
            PackageError::IncompleteSession { expected: 0, actual: 0 }
        );
    }

    #[test]
    fn missing_profile_is_reported() {
        let session = captured(1, 2);
        assert_eq!(
            build_meal(session.images(), 1, None).unwrap_err(),
            PackageError::MissingProfile
        );
        assert_eq!(build_product(session.images(), None).unwrap_err(), PackageError::MissingProfile);
    }

    #[test]
    fn product_uses_positional_keys() {
        let session = captured(1, 2);
        let body = build_product(session.images(), Some(&profile())).unwrap();
        assert_eq!(body.part_names(), vec!["file1", "file2", "personal_data"]);
        let PartContent::File { file_name, .. } = &body.parts()[1].content else {
            panic!("expected file part");
        };
        assert_eq!(file_name, "photo_2.jpg");
    }

    #[test]
    fn non_jpeg_photo_keeps_jpeg_name_and_type() {
        let mut session = CaptureSession::start(1).unwrap();
        session.record_capture(StorageRef::new("/cache/s/ingredients.png")).unwrap();
        session.record_capture(StorageRef::new("/cache/s/nutrition.webp")).unwrap();
        let body = build_meal(session.images(), 1, Some(&profile())).unwrap();
        for (part, expected_name) in body.parts()[..2]
            .iter()
            .zip(["ingredients_image_0.jpg", "nutrition_image_0.jpg"])
        {
            let PartContent::File { file_name, content_type, .. } = &part.content else {
                panic!("expected file part");
            };
            assert_eq!(file_name, expected_name);
            assert_eq!(*content_type, "image/jpeg");
        }
    }

    #[test]
    fn product_needs_exactly_two_photos() {
        let session = captured(1, 1);
        assert_eq!(
            build_product(session.images(), Some(&profile())).unwrap_err(),
            PackageError::IncompleteSession { expected: 2, actual: 1 }
        );
    }
}
