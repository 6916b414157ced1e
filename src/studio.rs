use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::batch::{generate_batch, BatchFailure};
use crate::codec::{decode_payload, encode_to_data_payload, load_image_file};
use crate::editor::EditSession;
use crate::error::{MockupError, MockupResult};
use crate::gallery::{mockup_file_name, now_epoch_millis, Gallery, GeneratedImage};
use crate::gemini::MockupModel;
use crate::product::{ProductType, SelectionSet};

/// What one "Generate" action produced.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub requested: usize,
    pub added: Vec<Uuid>,
    pub failures: Vec<BatchFailure>,
}

impl GenerateReport {
    /// Fewer mockups than requested; the caller decides whether to warn.
    pub fn has_shortfall(&self) -> bool {
        self.added.len() < self.requested
    }
}

/// In-memory state for one running session: logo, selection, gallery and the
/// single open editor. Everything is mutated from one control flow.
pub struct Studio {
    model: Arc<dyn MockupModel>,
    logo: Option<String>,
    selection: SelectionSet,
    gallery: Gallery,
    editor: Option<EditSession>,
}

impl Studio {
    pub fn new(model: Arc<dyn MockupModel>) -> Self {
        Self {
            model,
            logo: None,
            selection: SelectionSet::new(),
            gallery: Gallery::new(),
            editor: None,
        }
    }

    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn editor(&self) -> Option<&EditSession> {
        self.editor.as_ref()
    }

    /// Replaces the logo. A non-image leaves the current state as it was.
    pub fn upload_logo_bytes(&mut self, bytes: &[u8], mime: &str) -> MockupResult<()> {
        let payload = encode_to_data_payload(bytes, mime)?;
        self.logo = Some(payload);
        info!(mime, size = bytes.len(), "logo uploaded");
        Ok(())
    }

    pub async fn upload_logo_file(&mut self, path: &Path) -> MockupResult<()> {
        let payload = load_image_file(path).await?;
        self.logo = Some(payload);
        info!(path = %path.display(), "logo uploaded");
        Ok(())
    }

    pub fn toggle_product(&mut self, product: ProductType) -> bool {
        let selected = self.selection.toggle(product);
        debug!(product = %product, selected, "selection toggled");
        selected
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    #[instrument(skip_all, fields(selected = self.selection.len()))]
    pub async fn generate(&mut self, custom_instruction: Option<&str>) -> MockupResult<GenerateReport> {
        let logo = self.logo.as_deref().ok_or(MockupError::NoLogo)?;
        if self.selection.is_empty() {
            return Err(MockupError::EmptySelection);
        }

        let outcome =
            generate_batch(self.model.as_ref(), logo, &self.selection, custom_instruction).await;
        let requested = outcome.requested();
        let failed = outcome.failures.len();
        if outcome.all_failed() {
            warn!(requested, "no mockups could be generated");
        } else if outcome.is_partial() {
            warn!(failed, requested, "some mockups could not be generated");
        }

        let added: Vec<Uuid> = outcome.images.iter().map(|i| i.id).collect();
        self.gallery.prepend_batch(outcome.images);
        Ok(GenerateReport {
            requested,
            added,
            failures: outcome.failures,
        })
    }

    /// Idle -> Open. Only one editor may be open at a time.
    pub fn open_editor(&mut self, id: Uuid) -> MockupResult<&EditSession> {
        if self.editor.is_some() {
            return Err(MockupError::SessionAlreadyOpen);
        }
        let origin = self.gallery.get(id).cloned().ok_or(MockupError::ImageNotFound(id))?;
        Ok(&*self.editor.insert(EditSession::open(origin)))
    }

    /// Opens an editor on an image that did not come from this session's
    /// gallery (e.g. a file on disk).
    pub fn open_editor_with(&mut self, origin: GeneratedImage) -> MockupResult<&EditSession> {
        if self.editor.is_some() {
            return Err(MockupError::SessionAlreadyOpen);
        }
        Ok(&*self.editor.insert(EditSession::open(origin)))
    }

    pub async fn apply_edit(&mut self, instruction: &str) -> MockupResult<()> {
        let session = self.editor.as_mut().ok_or(MockupError::NoOpenSession)?;
        session.apply_edit(self.model.as_ref(), instruction).await
    }

    pub fn undo_edit(&mut self) -> MockupResult<()> {
        self.editor.as_mut().ok_or(MockupError::NoOpenSession)?.undo()
    }

    /// Open -> Saved. The copy is prepended to the gallery and the editor closes.
    pub fn save_copy(&mut self) -> MockupResult<Uuid> {
        let session = self.editor.as_ref().ok_or(MockupError::NoOpenSession)?;
        let copy = session.save_copy()?;
        let id = copy.id;
        self.gallery.prepend(copy);
        self.editor = None;
        info!(id = %id, "edited copy saved to gallery");
        Ok(id)
    }

    /// Open -> Discarded. The gallery is left untouched.
    pub fn close_editor(&mut self) -> MockupResult<()> {
        match self.editor.take() {
            Some(session) => {
                debug!(origin = %session.origin().id, edits = session.versions().len(), "edit session discarded");
                Ok(())
            }
            None => Err(MockupError::NoOpenSession),
        }
    }

    /// Writes the editor's current payload to `dir` and returns the file path.
    pub async fn download_current(&self, dir: &Path) -> MockupResult<PathBuf> {
        let session = self.editor.as_ref().ok_or(MockupError::NoOpenSession)?;
        let path = dir.join(session.download_file_name(now_epoch_millis()));
        write_payload(&path, session.current_payload()).await?;
        Ok(path)
    }

    pub async fn download_image(&self, id: Uuid, dir: &Path) -> MockupResult<PathBuf> {
        let image = self.gallery.get(id).ok_or(MockupError::ImageNotFound(id))?;
        let path = dir.join(mockup_file_name(image.product_type, now_epoch_millis()));
        write_payload(&path, &image.image_data).await?;
        Ok(path)
    }
}

async fn write_payload(path: &Path, payload: &str) -> MockupResult<()> {
    let bytes = decode_payload(payload)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;
    info!(path = %path.display(), size = bytes.len(), "mockup written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::StubModel;
    use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
    use std::sync::atomic::Ordering;

    fn studio_with(model: StubModel) -> (Studio, Arc<StubModel>) {
        let model = Arc::new(model);
        (Studio::new(model.clone()), model)
    }

    fn ready_studio(model: StubModel, products: &[ProductType]) -> (Studio, Arc<StubModel>) {
        let (mut studio, model) = studio_with(model);
        studio.upload_logo_bytes(b"logo-bytes", "image/png").unwrap();
        for p in products {
            studio.toggle_product(*p);
        }
        (studio, model)
    }

    #[tokio::test]
    async fn generate_prepends_successes_and_reports_failures() {
        let (mut studio, _) = ready_studio(
            StubModel::failing(&[ProductType::Hoodie]),
            &[ProductType::TShirt, ProductType::Hoodie, ProductType::Mug],
        );
        let report = studio.generate(None).await.unwrap();
        assert_eq!(report.requested, 3);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.has_shortfall());
        assert_eq!(studio.gallery().len(), 2);

        studio.clear_selection();
        studio.toggle_product(ProductType::Cap);
        let second = studio.generate(None).await.unwrap();
        assert_eq!(studio.gallery().len(), 3);
        assert_eq!(studio.gallery().at(0).map(|i| i.id), second.added.first().copied());
    }

    #[tokio::test]
    async fn fully_failed_batch_is_a_report_not_an_error() {
        let (mut studio, _) = ready_studio(
            StubModel::failing(&[ProductType::Cap, ProductType::ToteBag]),
            &[ProductType::Cap, ProductType::ToteBag],
        );
        let report = studio.generate(Some("on a shelf")).await.unwrap();
        assert_eq!(report.requested, 2);
        assert!(report.added.is_empty());
        assert_eq!(
            report.failures.iter().map(|f| f.product_type).collect::<Vec<_>>(),
            vec![ProductType::ToteBag, ProductType::Cap]
        );
        assert!(studio.gallery().is_empty());
    }

    #[tokio::test]
    async fn generate_requires_logo_and_selection() {
        let (mut studio, model) = studio_with(StubModel::default());
        studio.toggle_product(ProductType::Mug);
        assert!(matches!(studio.generate(None).await, Err(MockupError::NoLogo)));

        studio.upload_logo_bytes(b"x", "image/png").unwrap();
        studio.clear_selection();
        assert!(matches!(studio.generate(None).await, Err(MockupError::EmptySelection)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clearing_selection_keeps_generated_images() {
        let (mut studio, _) = ready_studio(StubModel::default(), &[ProductType::Notebook]);
        studio.generate(None).await.unwrap();
        studio.clear_selection();
        assert!(studio.selection().is_empty());
        assert_eq!(studio.gallery().len(), 1);
    }

    #[tokio::test]
    async fn rejected_upload_is_a_no_op() {
        let (mut studio, _) = ready_studio(StubModel::default(), &[ProductType::Mug]);
        studio.generate(None).await.unwrap();
        let logo_before = studio.logo().map(str::to_string);

        let err = studio.upload_logo_bytes(b"%PDF-1.4", "application/pdf").unwrap_err();
        assert!(matches!(err, MockupError::UnsupportedMediaKind(_)));
        assert_eq!(studio.logo().map(str::to_string), logo_before);
        assert_eq!(studio.gallery().len(), 1);
        assert_eq!(studio.selection().len(), 1);
        assert!(studio.editor().is_none());
    }

    #[tokio::test]
    async fn edit_then_save_adds_exactly_one_entry() {
        let (mut studio, _) = ready_studio(StubModel::default(), &[ProductType::Mug]);
        let report = studio.generate(None).await.unwrap();
        let a = studio.gallery().get(report.added[0]).cloned().unwrap();

        studio.open_editor(a.id).unwrap();
        studio.apply_edit("add sparkles").await.unwrap();
        let p1 = studio.editor().unwrap().current_payload().to_string();
        assert_ne!(p1, a.image_data);
        assert_eq!(studio.gallery().get(a.id), Some(&a));

        let before = studio.gallery().len();
        let saved = studio.save_copy().unwrap();
        assert_eq!(studio.gallery().len(), before + 1);
        assert!(studio.editor().is_none());

        let newest = studio.gallery().at(0).unwrap();
        assert_eq!(newest.id, saved);
        assert_ne!(newest.id, a.id);
        assert_eq!(newest.image_data, p1);
        assert_eq!(newest.source_prompt, "Edited: add sparkles");
        assert_eq!(newest.product_type, ProductType::Mug);
    }

    #[tokio::test]
    async fn discard_leaves_gallery_unchanged() {
        let (mut studio, _) = ready_studio(StubModel::default(), &[ProductType::Mug]);
        let report = studio.generate(None).await.unwrap();
        studio.open_editor(report.added[0]).unwrap();
        studio.apply_edit("add sparkles").await.unwrap();

        let before = studio.gallery().len();
        studio.close_editor().unwrap();
        assert_eq!(studio.gallery().len(), before);
        assert!(matches!(studio.close_editor(), Err(MockupError::NoOpenSession)));
    }

    #[tokio::test]
    async fn only_one_editor_at_a_time() {
        let (mut studio, _) = ready_studio(StubModel::default(), &[ProductType::Mug, ProductType::Cap]);
        let report = studio.generate(None).await.unwrap();
        studio.open_editor(report.added[0]).unwrap();
        assert!(matches!(
            studio.open_editor(report.added[1]),
            Err(MockupError::SessionAlreadyOpen)
        ));
        assert_eq!(studio.editor().unwrap().origin().id, report.added[0]);

        studio.close_editor().unwrap();
        studio.open_editor(report.added[1]).unwrap();
    }

    #[tokio::test]
    async fn failed_edit_keeps_editor_open_for_retry() {
        let (mut studio, _) = ready_studio(
            StubModel {
                fail_edits: true,
                ..StubModel::default()
            },
            &[ProductType::ToteBag],
        );
        let report = studio.generate(None).await.unwrap();
        studio.open_editor(report.added[0]).unwrap();
        assert!(studio.apply_edit("retro").await.unwrap_err().is_retryable());
        assert!(studio.editor().is_some());
        assert!(studio.editor().unwrap().versions().is_empty());
    }

    #[tokio::test]
    async fn editor_operations_need_an_open_session() {
        let (mut studio, _) = studio_with(StubModel::default());
        assert!(matches!(studio.apply_edit("x").await, Err(MockupError::NoOpenSession)));
        assert!(matches!(studio.save_copy(), Err(MockupError::NoOpenSession)));
        assert!(matches!(studio.undo_edit(), Err(MockupError::NoOpenSession)));
        assert!(matches!(
            studio.open_editor(Uuid::new_v4()),
            Err(MockupError::ImageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn download_writes_current_payload_bytes() {
        let (mut studio, _) = studio_with(StubModel::default());
        let payload = format!("data:image/png;base64,{}", B64.encode(b"edited-bytes"));
        let origin = GeneratedImage::new(payload, "from disk".into(), ProductType::Hoodie);
        studio.open_editor_with(origin).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = studio.download_current(dir.path()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("mockup-Hoodie-"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"edited-bytes");
    }

    #[tokio::test]
    async fn gallery_image_can_be_downloaded() {
        let (mut studio, _) = studio_with(StubModel::default());
        studio.upload_logo_bytes(b"logo", "image/png").unwrap();
        studio.toggle_product(ProductType::Cap);
        let report = studio.generate(None).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = studio.download_image(report.added[0], dir.path()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"cap");
    }
}
