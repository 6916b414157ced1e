use futures_util::future::join_all;
use tracing::{info, instrument, warn};

use crate::error::MockupResult;
use crate::gallery::GeneratedImage;
use crate::gemini::MockupModel;
use crate::product::{ProductType, SelectionSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub product_type: ProductType,
    pub reason: String,
    pub retryable: bool,
}

/// Settled batch. `images` follow the selection's iteration order with failed
/// slots removed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn requested(&self) -> usize {
        self.images.len() + self.failures.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && !self.images.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.images.is_empty() && !self.failures.is_empty()
    }
}

pub fn mockup_prompt(product: ProductType) -> String {
    format!("Mockup for {}", product.label())
}

/// Runs one `generate` per selected product and waits for every one of them.
///
/// A failing product never cancels its siblings; it is logged and reported in
/// `failures` instead.
#[instrument(skip_all, fields(requested = selection.len()))]
pub async fn generate_batch<M: MockupModel + ?Sized>(
    model: &M,
    logo_payload: &str,
    selection: &SelectionSet,
    custom_instruction: Option<&str>,
) -> BatchOutcome {
    let tasks = selection.iter().map(|product| async move {
        let settled: MockupResult<GeneratedImage> = model
            .generate(logo_payload, product, custom_instruction)
            .await
            .map(|payload| GeneratedImage::new(payload, mockup_prompt(product), product));
        (product, settled)
    });

    let mut outcome = BatchOutcome::default();
    for (product, settled) in join_all(tasks).await {
        match settled {
            Ok(image) => outcome.images.push(image),
            Err(e) => {
                warn!(product = %product, error = %e, "failed to generate mockup");
                outcome.failures.push(BatchFailure {
                    product_type: product,
                    reason: e.to_string(),
                    retryable: e.is_retryable(),
                });
            }
        }
    }

    info!(
        succeeded = outcome.images.len(),
        failed = outcome.failures.len(),
        "batch settled"
    );
    outcome
}
