use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageRef;

/// Which of the two photos of a product is being taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotoRole {
    Ingredients,
    NutritionLabel,
}

impl PhotoRole {
    /// Prompt shown over the camera preview.
    pub fn prompt(self) -> &'static str {
        match self {
            PhotoRole::Ingredients => "Ingredients",
            PhotoRole::NutritionLabel => "Nutritional Table",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("number of products must be at least 1, got {0}")]
    InvalidTarget(i64),
    #[error("all {0} photos have already been captured")]
    SessionComplete(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub slot_index: usize,
    pub item_index: usize,
    pub role: PhotoRole,
    pub storage_ref: StorageRef,
}

/// What the UI should ask for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPrompt {
    Capture { role: PhotoRole, item_index: usize },
    Complete,
}

impl fmt::Display for NextPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextPrompt::Capture { role, item_index } => {
                write!(f, "{} for Product {}", role.prompt(), item_index + 1)
            }
            NextPrompt::Complete => f.write_str("All photos captured"),
        }
    }
}

/// Ordered photo captures for one advice request.
///
/// The current item and role are derived from the number of images taken,
/// so images always alternate Ingredients/NutritionLabel per item.
#[derive(Debug)]
pub struct CaptureSession {
    id: Uuid,
    target_item_count: usize,
    images: Vec<CapturedImage>,
}

impl CaptureSession {
    /// Fails `InvalidTarget` below one product, or when twice the count does not fit in `usize`.
    pub fn start(target_item_count: i64) -> Result<Self, CaptureError> {
        let target = usize::try_from(target_item_count)
            .ok()
            .filter(|&n| n >= 1 && n.checked_mul(2).is_some())
            .ok_or(CaptureError::InvalidTarget(target_item_count))?;
        Ok(Self {
            id: Uuid::new_v4(),
            target_item_count: target,
            images: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target_item_count(&self) -> usize {
        self.target_item_count
    }

    pub fn required_images(&self) -> usize {
        self.target_item_count * 2
    }

    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn is_complete(&self) -> bool {
        self.images.len() == self.required_images()
    }

    pub fn next_prompt(&self) -> NextPrompt {
        if self.is_complete() {
            return NextPrompt::Complete;
        }
        let (role, item_index) = self.cursor();
        NextPrompt::Capture { role, item_index }
    }

    pub fn record_capture(&mut self, storage_ref: StorageRef) -> Result<&CapturedImage, CaptureError> {
        if self.is_complete() {
            return Err(CaptureError::SessionComplete(self.required_images()));
        }
        let (role, item_index) = self.cursor();
        self.images.push(CapturedImage {
            slot_index: self.images.len(),
            item_index,
            role,
            storage_ref,
        });
        Ok(&self.images[self.images.len() - 1])
    }

    /// Empties the session so capture restarts at the first product.
    pub fn reset(&mut self) -> Vec<CapturedImage> {
        std::mem::take(&mut self.images)
    }

    pub fn take_images(&mut self) -> Vec<CapturedImage> {
        self.reset()
    }

    fn cursor(&self) -> (PhotoRole, usize) {
        let taken = self.images.len();
        let role = if taken % 2 == 0 {
            PhotoRole::Ingredients
        } else {
            PhotoRole::NutritionLabel
        };
        (role, taken / 2)
    }
}
