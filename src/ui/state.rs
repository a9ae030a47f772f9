use std::sync::Arc;

use burn::prelude::Backend;

use crate::inference::{Classifier, Prediction};

// ---------------------------------------------------------------------------
// Upload state machine
// ---------------------------------------------------------------------------

pub const IDLE_MESSAGE: &str = "Awaiting MRI image upload...";

/// A classified upload kept for display until the next one arrives.
#[derive(Debug, Clone)]
pub struct ClassifiedUpload {
    pub name: String,
    /// Unique per upload so the image cache never shows a stale preview.
    pub preview_uri: String,
    pub bytes: Arc<[u8]>,
    pub prediction: Prediction,
}

/// What the page shows. Processing happens synchronously inside
/// [`AppState::handle_upload`], so it never appears here.
#[derive(Debug, Clone, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Result(ClassifiedUpload),
    Error(String),
}

#[derive(Debug, Default)]
pub struct AppState {
    pub upload: UploadState,
    uploads: u64,
    /// Preview URIs no longer on screen; their cached bytes and textures
    /// must be released by whoever owns the egui context.
    stale_previews: Vec<String>,
}

impl AppState {
    /// Runs one upload through validation, preprocessing and the model.
    /// Every failure lands in [`UploadState::Error`]; nothing here panics.
    pub fn handle_upload<B: Backend>(
        &mut self,
        classifier: &Classifier<B>,
        name: Option<&str>,
        bytes: Vec<u8>,
    ) {
        self.uploads += 1;
        let display_name = name.unwrap_or("upload").to_string();
        log::info!("classifying {display_name} ({} bytes)", bytes.len());

        let next = match classifier.classify_upload(name, &bytes) {
            Ok(prediction) => {
                log::info!(
                    "{display_name}: {} ({:.2}%)",
                    prediction.label,
                    prediction.confidence
                );
                UploadState::Result(ClassifiedUpload {
                    preview_uri: format!("bytes://upload-{}-{display_name}", self.uploads),
                    name: display_name,
                    bytes: bytes.into(),
                    prediction,
                })
            }
            Err(err) => {
                log::warn!("{display_name}: {err}");
                UploadState::Error(err.to_string())
            }
        };
        self.replace(next);
    }

    /// Reports a failure that happened before the bytes were available,
    /// e.g. an unreadable file on disk.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("upload failed: {message}");
        self.replace(UploadState::Error(message));
    }

    /// Clears the page back to the idle prompt.
    pub fn reset(&mut self) {
        self.replace(UploadState::Idle);
    }

    /// Drains the preview URIs that were replaced since the last call.
    pub fn take_stale_previews(&mut self) -> Vec<String> {
        std::mem::take(&mut self.stale_previews)
    }

    fn replace(&mut self, next: UploadState) {
        if let UploadState::Result(previous) = std::mem::replace(&mut self.upload, next) {
            self.stale_previews.push(previous.preview_uri);
        }
    }
}
