use std::env;

use anyhow::{anyhow, Context, Result};
use log::debug;

use lightcam_export::{export_to_path, ExportOptions, Scene};

const USAGE: &str = "Usage: lightcam-export <scene.xml|scene.json> [output.json] [--summary-only] [--no-extension-check]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let scene = Scene::load(&options.scene_path)
        .with_context(|| format!("failed to load scene {}", options.scene_path))?;
    let lights = scene.lights();
    let cameras = scene.cameras();

    println!(
        "Loaded scene with {} objects ({} lights, {} cameras)",
        scene.objects.len(),
        lights.len(),
        cameras.len()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.data.type_tag());
    }

    if options.summary_only {
        debug!("summary only, skipping export");
        return Ok(());
    }

    let output = options
        .output_path
        .ok_or_else(|| anyhow!("missing output path\n{USAGE}"))?;
    let export_options = ExportOptions {
        check_extension: options.check_extension,
    };
    let summary = export_to_path(&output, &lights, &cameras, &export_options)
        .with_context(|| format!("failed to export to {output}"))?;
    println!(
        "Exported {} light(s) and {} camera(s) to {}",
        summary.lights,
        summary.cameras,
        summary.path.display()
    );
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct CliOptions {
    scene_path: String,
    output_path: Option<String>,
    summary_only: bool,
    check_extension: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut summary_only = false;
        let mut check_extension = true;
        for arg in args {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--no-extension-check" => check_extension = false,
                other if other.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --no-extension-check"
                    ));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let Some(scene_path) = positional.next() else {
            return Err(anyhow!(USAGE));
        };
        let output_path = positional.next();
        if let Some(extra) = positional.next() {
            return Err(anyhow!("Unexpected argument: {extra}\n{USAGE}"));
        }

        Ok(Self {
            scene_path,
            output_path,
            summary_only,
            check_extension,
        })
    }
}
