use anyhow::Context;
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff},
    optim::AdamConfig,
};
use brain_tumor::{config::Settings, ModelConfig, TrainingConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    type MyBackend = burn::backend::Wgpu<f32, i32>;
    type MyAutodiffBackend = Autodiff<MyBackend>;

    let device = WgpuDevice::default();
    let settings = Settings::from_env();

    let report = brain_tumor::train::<MyAutodiffBackend>(
        &settings.artifact_dir,
        &settings.training_dir(),
        &settings.testing_dir(),
        TrainingConfig::new(ModelConfig::default(), AdamConfig::new()),
        device,
    )
    .with_context(|| format!("training from {} failed", settings.data_dir.display()))?;

    if let Some(last) = report.epochs.last() {
        println!("Final {last}");
    }
    println!(
        "Saved model for classes {} to {}",
        report.labels,
        report.artifact_dir.display()
    );
    Ok(())
}
