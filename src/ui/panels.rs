use std::path::Path;

use eframe::egui::{self, Color32, ProgressBar, RichText, Ui};

use crate::preprocess::UPLOAD_EXTENSIONS;

use super::state::{AppState, ClassifiedUpload, UploadState, IDLE_MESSAGE};

const ACCENT: Color32 = Color32::from_rgb(0x6c, 0x63, 0xff);

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

pub fn header(ui: &mut Ui) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(RichText::new("Brain Tumor Classifier").size(30.0).strong());
        ui.label("Upload an MRI image to detect the type of brain tumor with AI.");
    });
    ui.add_space(12.0);
}

// ---------------------------------------------------------------------------
// Upload control
// ---------------------------------------------------------------------------

/// A file picked by the user: its name and raw bytes.
pub type PickedFile = (String, Vec<u8>);

/// Renders the upload button; returns the chosen file once one is picked.
pub fn upload_button(ui: &mut Ui, state: &mut AppState) -> Option<PickedFile> {
    let mut picked = None;
    ui.vertical_centered(|ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Choose an MRI image...").clicked() {
                picked = open_file_dialog(state);
            }
            let has_output = !matches!(state.upload, UploadState::Idle);
            if ui.add_enabled(has_output, egui::Button::new("Clear")).clicked() {
                state.reset();
            }
        });
        ui.small(format!(
            "{} files, or drop one onto the window",
            UPLOAD_EXTENSIONS.join(" / ")
        ));
    });
    ui.separator();
    picked
}

fn open_file_dialog(state: &mut AppState) -> Option<PickedFile> {
    let path = rfd::FileDialog::new()
        .set_title("Choose an MRI image")
        .add_filter("MRI image", &UPLOAD_EXTENSIONS)
        .pick_file()?;
    read_picked(&path, state)
}

/// Reads a file from disk, recording a failure in `state`.
pub fn read_picked(path: &Path, state: &mut AppState) -> Option<PickedFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    match std::fs::read(path) {
        Ok(bytes) => Some((name, bytes)),
        Err(err) => {
            state.fail(format!("could not read {name}: {err}"));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Result area
// ---------------------------------------------------------------------------

pub fn result_view(ui: &mut Ui, state: &AppState) {
    match &state.upload {
        UploadState::Idle => {
            ui.add_space(8.0);
            ui.label(RichText::new(IDLE_MESSAGE).italics());
        }
        UploadState::Error(message) => {
            ui.label(
                RichText::new(format!("Error: {message}"))
                    .color(Color32::RED)
                    .strong(),
            );
        }
        UploadState::Result(upload) => prediction_card(ui, upload),
    }
}

fn prediction_card(ui: &mut Ui, upload: &ClassifiedUpload) {
    let prediction = &upload.prediction;

    ui.vertical_centered(|ui: &mut Ui| {
        ui.add(
            egui::Image::from_bytes(upload.preview_uri.clone(), upload.bytes.clone())
                .max_width(ui.available_width())
                .max_height(360.0),
        );
        ui.small(format!("Uploaded MRI image: {}", upload.name));
    });
    ui.add_space(12.0);

    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.label(
                RichText::new(format!("Predicted: {}", prediction.label.to_uppercase()))
                    .size(26.0)
                    .strong()
                    .color(ACCENT),
            );
            ui.label("Confidence Score:");
            ui.add(
                ProgressBar::new((prediction.confidence / 100.0) as f32)
                    .desired_width(ui.available_width() * 0.8)
                    .fill(ACCENT),
            );
            ui.label(RichText::new(format!("{:.2}%", prediction.confidence)).strong());
        });
    });

    ui.add_space(12.0);
    ui.label(format!("About the prediction: {}", prediction.description()));
}
