mod batch;
mod cli;
mod codec;
mod editor;
mod error;
mod gallery;
mod gemini;
mod logging;
mod product;
mod settings;
mod shell;
mod studio;
mod utils;

pub use crate::batch::{generate_batch, BatchFailure, BatchOutcome};
pub use crate::codec::{decode_payload, encode_to_data_payload, load_image_file, strip_envelope};
pub use crate::editor::{EditPhase, EditSession, EditVersion};
pub use crate::error::{MockupError, MockupResult};
pub use crate::gallery::{Gallery, GeneratedImage};
pub use crate::gemini::{GeminiClient, MockupModel};
pub use crate::product::{ProductType, SelectionSet};
pub use crate::settings::Settings;
pub use crate::studio::{GenerateReport, Studio};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use crate::cli::{CliArgs, Command};
use crate::settings::{load_settings_from_dir, save_settings_to_dir, settings_path};
use crate::shell::{format_report, products_table, run_session};
use crate::utils::{ensure_data_dir, log_dir, resolve_output_dir};

struct AppState {
    settings: Settings,
    data_dir: Option<PathBuf>,
}

fn startup(args: &CliArgs) -> AppState {
    // a missing data dir only costs us settings.json and the log file
    let data_dir = ensure_data_dir().ok();
    let mut settings = data_dir
        .as_deref()
        .map(load_settings_from_dir)
        .unwrap_or_default();
    if let Some(model) = &args.model {
        settings.gemini_model = Some(model.clone());
    }
    if args.timeout.is_some() {
        settings.request_timeout_secs = args.timeout;
    }
    AppState { settings, data_dir }
}

fn build_studio(state: &AppState) -> Result<Studio> {
    let client = GeminiClient::from_settings(&state.settings)?;
    info!(model = client.model(), "image model ready");
    Ok(Studio::new(Arc::new(client)))
}

async fn generate_command(
    state: &AppState,
    logo: &Path,
    products: &[ProductType],
    instruction: Option<&str>,
    out: &Path,
) -> Result<bool> {
    let mut studio = build_studio(state)?;
    studio
        .upload_logo_file(logo)
        .await
        .with_context(|| format!("load logo {}", logo.display()))?;
    for p in products {
        if !studio.selection().contains(*p) {
            studio.toggle_product(*p);
        }
    }
    let report = studio.generate(instruction).await?;
    println!("{}", format_report(&report));
    for id in &report.added {
        let path = studio.download_image(*id, out).await?;
        println!("wrote {}", path.display());
    }
    Ok(!report.added.is_empty())
}

async fn edit_command(
    state: &AppState,
    image: &Path,
    product: ProductType,
    instructions: &[String],
    out: &Path,
) -> Result<bool> {
    let mut studio = build_studio(state)?;
    let payload = load_image_file(image)
        .await
        .with_context(|| format!("load image {}", image.display()))?;
    let origin = GeneratedImage::new(payload, format!("Loaded from {}", image.display()), product);
    studio.open_editor_with(origin)?;

    let mut applied = 0usize;
    for instruction in instructions {
        match studio.apply_edit(instruction).await {
            Ok(()) => {
                applied += 1;
                println!("applied: {instruction}");
            }
            Err(e) => {
                // later edits build on whatever succeeded so far
                eprintln!("edit '{instruction}' failed: {e}");
            }
        }
    }
    let path = studio.download_current(out).await?;
    println!("wrote {} ({applied}/{} edits applied)", path.display(), instructions.len());
    studio.close_editor()?;
    Ok(applied > 0)
}

async fn dispatch(state: &AppState, command: &Command) -> Result<bool> {
    let configured = state.settings.output_dir.as_deref();
    match command {
        Command::Products => {
            print!("{}", products_table());
            Ok(true)
        }
        Command::Generate {
            logo,
            products,
            instruction,
            out,
        } => {
            let out = resolve_output_dir(out.as_deref(), configured);
            generate_command(state, logo, products, instruction.as_deref(), &out).await
        }
        Command::Edit {
            image,
            product,
            instructions,
            out,
        } => {
            let out = resolve_output_dir(out.as_deref(), configured);
            edit_command(state, image, *product, instructions, &out).await
        }
        Command::Config {
            api_key,
            output_dir,
        } => {
            let dir = state
                .data_dir
                .as_deref()
                .context("no data directory available for settings")?;
            let mut settings = state.settings.clone();
            if let Some(key) = api_key {
                settings.gemini_api_key = Some(key.clone());
            }
            if let Some(out_dir) = output_dir {
                settings.output_dir = Some(out_dir.clone());
            }
            save_settings_to_dir(dir, &settings)?;
            println!("saved {}", settings_path(dir).display());
            Ok(true)
        }
        Command::Session { out } => {
            let out = resolve_output_dir(out.as_deref(), configured);
            let mut studio = build_studio(state)?;
            run_session(&mut studio, &out).await?;
            Ok(true)
        }
    }
}

pub fn run() -> ExitCode {
    let args = CliArgs::parse();
    let state = startup(&args);
    let _guard = logging::init_tracing(state.data_dir.as_deref().map(log_dir).as_deref());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(dispatch(&state, &args.command)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
