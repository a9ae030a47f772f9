use anyhow::Context;
use brain_tumor::{config::Settings, ui::BrainTumorApp, Classifier};
use burn::backend::wgpu::WgpuDevice;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    type MyBackend = burn::backend::Wgpu<f32, i32>;

    let settings = Settings::from_env();
    let classifier = Classifier::<MyBackend>::load(&settings.artifact_dir, WgpuDevice::default())
        .with_context(|| {
            format!(
                "could not load the trained model from {}",
                settings.artifact_dir.display()
            )
        })?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 900.0])
            .with_min_inner_size([420.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Brain Tumor Classifier",
        options,
        Box::new(move |cc| {
            // png/jpeg previews
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(BrainTumorApp::new(classifier)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("the classifier window failed: {err}"))
}
