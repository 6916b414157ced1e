use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::product::ProductType;

/// One produced mockup. Never mutated after creation; saving an edit creates a
/// new image with a fresh id.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: Uuid,
    pub image_data: String,
    pub source_prompt: String,
    pub product_type: ProductType,
    pub created_at: OffsetDateTime,
}

impl GeneratedImage {
    pub fn new(image_data: String, source_prompt: String, product_type: ProductType) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_data,
            source_prompt,
            product_type,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn created_at_iso(&self) -> String {
        self.created_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    }
}

pub fn now_epoch_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// `mockup-{label}-{epochMillis}.png`
pub fn mockup_file_name(product: ProductType, epoch_millis: i64) -> String {
    format!("mockup-{}-{}.png", product.label(), epoch_millis)
}

/// Session gallery, newest first. Only ever grows.
#[derive(Debug, Default)]
pub struct Gallery {
    images: Vec<GeneratedImage>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a batch keeping its internal order. Returns how many were added.
    pub fn prepend_batch(&mut self, batch: Vec<GeneratedImage>) -> usize {
        let mut fresh = Vec::with_capacity(batch.len());
        for image in batch {
            if self.contains(image.id) || fresh.iter().any(|f: &GeneratedImage| f.id == image.id) {
                warn!(id = %image.id, "duplicate image id skipped");
                continue;
            }
            fresh.push(image);
        }
        let added = fresh.len();
        if added > 0 {
            fresh.append(&mut self.images);
            self.images = fresh;
        }
        added
    }

    pub fn prepend(&mut self, image: GeneratedImage) -> bool {
        self.prepend_batch(vec![image]) == 1
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.images.iter().any(|i| i.id == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&GeneratedImage> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Zero-based position, newest first.
    pub fn at(&self, index: usize) -> Option<&GeneratedImage> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImage> {
        self.images.iter()
    }
}
