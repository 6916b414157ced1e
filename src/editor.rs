use tracing::{debug, info, instrument, warn};

use crate::error::{MockupError, MockupResult};
use crate::gallery::{mockup_file_name, GeneratedImage};
use crate::gemini::MockupModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Open,
    Editing,
}

/// One applied edit in the session's version chain.
#[derive(Debug, Clone, PartialEq)]
pub struct EditVersion {
    pub instruction: String,
    pub payload: String,
}

/// Work handed out by [`EditSession::begin_edit`]; finished with
/// [`EditSession::finish_edit`]. Only the session can mint one.
#[derive(Debug)]
pub struct EditTicket {
    payload: String,
    instruction: String,
}

impl EditTicket {
    /// Payload the edit should be applied to.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// State of the single open editor. The origin image is never touched;
/// [`EditSession::save_copy`] produces a new gallery image instead.
#[derive(Debug, Clone)]
pub struct EditSession {
    origin: GeneratedImage,
    versions: Vec<EditVersion>,
    phase: EditPhase,
}

impl EditSession {
    pub fn open(origin: GeneratedImage) -> Self {
        debug!(origin = %origin.id, "edit session opened");
        Self {
            origin,
            versions: Vec::new(),
            phase: EditPhase::Open,
        }
    }

    pub fn origin(&self) -> &GeneratedImage {
        &self.origin
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn versions(&self) -> &[EditVersion] {
        &self.versions
    }

    pub fn current_payload(&self) -> &str {
        self.versions
            .last()
            .map(|v| v.payload.as_str())
            .unwrap_or(&self.origin.image_data)
    }

    pub fn last_instruction(&self) -> Option<&str> {
        self.versions.last().map(|v| v.instruction.as_str())
    }

    /// Open -> Editing.
    pub fn begin_edit(&mut self, instruction: &str) -> MockupResult<EditTicket> {
        if self.phase == EditPhase::Editing {
            return Err(MockupError::EditInProgress);
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(MockupError::EmptyInstruction);
        }
        self.phase = EditPhase::Editing;
        Ok(EditTicket {
            payload: self.current_payload().to_string(),
            instruction: instruction.to_string(),
        })
    }

    /// Editing -> Open. A failure keeps the current payload and is handed back
    /// to the caller so the user can retry.
    pub fn finish_edit(
        &mut self,
        ticket: EditTicket,
        result: MockupResult<String>,
    ) -> MockupResult<()> {
        if self.phase != EditPhase::Editing {
            return Err(MockupError::NoEditInProgress);
        }
        self.phase = EditPhase::Open;
        match result {
            Ok(payload) => {
                self.versions.push(EditVersion {
                    instruction: ticket.instruction,
                    payload,
                });
                info!(origin = %self.origin.id, version = self.versions.len(), "edit applied");
                Ok(())
            }
            Err(e) => {
                warn!(origin = %self.origin.id, error = %e, "edit failed, session kept open");
                Err(e)
            }
        }
    }

    #[instrument(skip(self, model), fields(origin = %self.origin.id))]
    pub async fn apply_edit<M: MockupModel + ?Sized>(
        &mut self,
        model: &M,
        instruction: &str,
    ) -> MockupResult<()> {
        let ticket = self.begin_edit(instruction)?;
        let result = model.edit(ticket.payload(), ticket.instruction()).await;
        self.finish_edit(ticket, result)
    }

    pub fn undo(&mut self) -> MockupResult<()> {
        if self.phase == EditPhase::Editing {
            return Err(MockupError::EditInProgress);
        }
        self.versions.pop().map(|_| ()).ok_or(MockupError::NothingToUndo)
    }

    /// New gallery image carrying the current payload. The prompt records the
    /// last applied instruction.
    pub fn save_copy(&self) -> MockupResult<GeneratedImage> {
        if self.phase == EditPhase::Editing {
            return Err(MockupError::EditInProgress);
        }
        Ok(GeneratedImage::new(
            self.current_payload().to_string(),
            format!("Edited: {}", self.last_instruction().unwrap_or_default()),
            self.origin.product_type,
        ))
    }

    /// Name for the client-side download of the current payload.
    pub fn download_file_name(&self, epoch_millis: i64) -> String {
        mockup_file_name(self.origin.product_type, epoch_millis)
    }
}
