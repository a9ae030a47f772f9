use burn::prelude::Backend;
use eframe::egui;

use crate::inference::Classifier;

use super::{panels, state::AppState};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct BrainTumorApp<B: Backend> {
    classifier: Classifier<B>,
    pub state: AppState,
}

impl<B: Backend> BrainTumorApp<B> {
    pub fn new(classifier: Classifier<B>) -> Self {
        Self {
            classifier,
            state: AppState::default(),
        }
    }

    fn take_dropped_file(&mut self, ctx: &egui::Context) -> Option<panels::PickedFile> {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        // one image at a time: the last dropped file wins
        let file = dropped.into_iter().last()?;

        if let Some(bytes) = file.bytes {
            return Some((file.name, bytes.to_vec()));
        }
        let path = file.path?;
        panels::read_picked(&path, &mut self.state)
    }
}

impl<B: Backend> eframe::App for BrainTumorApp<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dropped = self.take_dropped_file(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    panels::header(ui);

                    let picked = panels::upload_button(ui, &mut self.state).or(dropped);
                    if let Some((name, bytes)) = picked {
                        self.state
                            .handle_upload(&self.classifier, Some(&name), bytes);
                    }

                    panels::result_view(ui, &self.state);
                });
        });

        for uri in self.state.take_stale_previews() {
            ctx.forget_image(&uri);
        }
    }
}
