//! Command implementations
//!
//! Each panel command checks its endpoint first, builds the request, hands
//! it to the orchestrator and lets the presenter follow it to the end. The
//! return value is the process exit code.

use crate::cli::{Cli, Commands};
use crate::errors;
use crate::presenter::ResultPresenter;
use anyhow::Result;
use medai_common::{AnalysisTransport, HttpTransport, ImagePreprocessor, MedaiConfig, RequestOrchestrator};
use medai_shared::{AnalysisRequest, DiabetesForm, Panel, RequestState, ScreeningError};
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Masked in `medaictl config` output
const HIDDEN_KEY: &str = "********";

pub struct CommandContext {
    pub config: MedaiConfig,
    pub json: bool,
}

/// Print a pre-submit error and map it to an exit code
fn report(error: &ScreeningError) -> i32 {
    warn!(code = error.code(), error = %error, "command rejected");
    eprintln!("{} {}", "error:".bright_red(), error.user_message());
    errors::for_error(error)
}

/// Load config, then dispatch the subcommand
pub async fn dispatch(cli: Cli) -> Result<i32> {
    let config = match MedaiConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "configuration rejected");
            eprintln!("{} {:#}", "error:".bright_red(), e);
            return Ok(errors::EXIT_CONFIG);
        }
    };
    let ctx = CommandContext {
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::Lesion {
            image,
            width,
            height,
        } => lesion(&ctx, &image, width, height).await,
        Commands::Diabetes { form, assignments } => {
            diabetes(&ctx, form.as_deref(), &assignments).await
        }
        Commands::Triage { symptoms } => triage(&ctx, &symptoms.join(" ")).await,
        Commands::Config => show_config(&ctx),
    }
}

pub async fn lesion(
    ctx: &CommandContext,
    image: &Path,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<i32> {
    if let Err(e) = ctx.config.require(Panel::Lesion) {
        return Ok(report(&e));
    }

    let source = match tokio::fs::read(image).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(report(&ScreeningError::InvalidInput(format!(
                "cannot read {}: {}",
                image.display(),
                e
            ))))
        }
    };

    let mut preprocessor = ImagePreprocessor::from(&ctx.config.preprocess);
    if let Some(width) = width {
        preprocessor.width = width;
    }
    if let Some(height) = height {
        preprocessor.height = height;
    }

    // A local encode failure is shown like any other failed analysis
    let encoded = match preprocessor.process_blocking(source).await {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(error = %e, "image preprocessing failed");
            let state = RequestState::failed_with(&e);
            ResultPresenter::new(Panel::Lesion, ctx.json).print(&state)?;
            return Ok(errors::for_state(&state));
        }
    };

    match AnalysisRequest::lesion(encoded) {
        Ok(request) => analyze(ctx, request).await,
        Err(e) => Ok(report(&e)),
    }
}

/// Read a partial questionnaire (.json or .toml) over the defaults
pub fn load_form(path: &Path) -> Result<DiabetesForm, ScreeningError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ScreeningError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;

    let overrides: Value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let table: toml::Value = toml::from_str(&contents).map_err(|e| {
                ScreeningError::InvalidInput(format!("{}: {}", path.display(), e))
            })?;
            serde_json::to_value(table)
                .map_err(|e| ScreeningError::InvalidInput(format!("{}: {}", path.display(), e)))?
        }
        _ => serde_json::from_str(&contents)
            .map_err(|e| ScreeningError::InvalidInput(format!("{}: {}", path.display(), e)))?,
    };

    let Value::Object(overrides) = overrides else {
        return Err(ScreeningError::InvalidInput(format!(
            "{}: expected a table of form fields",
            path.display()
        )));
    };

    let mut merged = serde_json::to_value(DiabetesForm::default())
        .map_err(|e| ScreeningError::InvalidInput(e.to_string()))?;
    if let Value::Object(fields) = &mut merged {
        for (key, value) in overrides {
            if !fields.contains_key(&key) {
                return Err(ScreeningError::InvalidInput(format!(
                    "{}: unknown form field '{}'",
                    path.display(),
                    key
                )));
            }
            fields.insert(key, value);
        }
    }

    serde_json::from_value(merged)
        .map_err(|e| ScreeningError::InvalidInput(format!("{}: {}", path.display(), e)))
}

/// Defaults, then the form file, then each `--set` in order
pub fn build_form(form: Option<&Path>, assignments: &[String]) -> Result<DiabetesForm, ScreeningError> {
    let mut base = match form {
        Some(path) => load_form(path)?,
        None => DiabetesForm::default(),
    };
    for assignment in assignments {
        base.apply_assignment(assignment)?;
    }
    Ok(base)
}

pub async fn diabetes(
    ctx: &CommandContext,
    form: Option<&Path>,
    assignments: &[String],
) -> Result<i32> {
    if let Err(e) = ctx.config.require(Panel::Diabetes) {
        return Ok(report(&e));
    }
    let request = build_form(form, assignments).and_then(AnalysisRequest::diabetes);
    match request {
        Ok(request) => analyze(ctx, request).await,
        Err(e) => Ok(report(&e)),
    }
}

pub async fn triage(ctx: &CommandContext, symptoms: &str) -> Result<i32> {
    if let Err(e) = ctx.config.require(Panel::Triage) {
        return Ok(report(&e));
    }
    match AnalysisRequest::triage(symptoms) {
        Ok(request) => analyze(ctx, request).await,
        Err(e) => Ok(report(&e)),
    }
}

/// Submit one request and follow it to a terminal state
async fn analyze(ctx: &CommandContext, request: AnalysisRequest) -> Result<i32> {
    let panel = request.panel();
    let transport: Arc<dyn AnalysisTransport> = match HttpTransport::new() {
        Ok(transport) => Arc::new(transport),
        Err(e) => return Ok(report(&e)),
    };
    let orchestrator = match RequestOrchestrator::from_config(panel, &ctx.config, transport) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return Ok(report(&e)),
    };

    let presenter = ResultPresenter::new(panel, ctx.json);
    let events = orchestrator.subscribe();
    let pending = match orchestrator.submit(request) {
        Ok(pending) => pending,
        Err(e) => return Ok(report(&e)),
    };

    let terminal = presenter.follow(events, pending).await;
    presenter.print(&terminal)?;
    Ok(errors::for_state(&terminal))
}

/// Resolved configuration with API keys masked
pub fn redacted(config: &MedaiConfig) -> MedaiConfig {
    let mut shown = config.clone();
    for panel in Panel::ALL {
        if let Some(endpoint) = shown.endpoints.slot(panel).as_mut() {
            if endpoint.api_key.is_some() {
                endpoint.api_key = Some(HIDDEN_KEY.to_string());
            }
        }
    }
    shown
}

fn show_config(ctx: &CommandContext) -> Result<i32> {
    let shown = redacted(&ctx.config);
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        let source = std::env::var(medai_common::config::CONFIG_ENV)
            .map(PathBuf::from)
            .ok()
            .or_else(MedaiConfig::user_config_path);
        if let Some(path) = source {
            println!("# {}", path.display());
        }
        for panel in Panel::ALL {
            if shown.endpoints.get(panel).is_none() {
                println!("# {}: not configured", panel.title());
            }
        }
        print!("{}", toml::to_string_pretty(&shown)?);
    }
    Ok(errors::EXIT_SUCCESS)
}
