//! services/studio/src/bin/studio.rs

use std::io::{BufRead, Write};
use std::sync::Arc;

use studio_lib::{
    adapters::{backend::HttpBackendAdapter, local_store::LocalStore},
    config::Config,
    error::StudioError,
};

use lesson_studio_core::{
    domain::{clamp_num_slides, FormState},
    ports::DocumentFormat,
    workflow::{Workflow, WorkflowError},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), StudioError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting Lesson Studio...");

    // --- 2. Initialize Service Adapters ---
    let backend = Arc::new(HttpBackendAdapter::new(
        config.backend_base_url.clone(),
        config.generation_timeout,
        config.request_timeout,
    ));
    let store = Arc::new(LocalStore::new(config.local_store_path.clone()));

    // --- 3. Build the Workflow ---
    let mut workflow = Workflow::new(backend.clone(), backend, store.clone());

    // --- 4. Pick the Form: example mode, or parameters from the environment ---
    if std::env::args().any(|arg| arg == "--example") {
        workflow.load_example();
    } else {
        workflow.update_form(form_from_env(&store));
    }

    // --- 5. Generate and Confirm ---
    workflow.generate().await?;
    println!("\n{}\n", workflow.content.outline_to_confirm);

    let stdin = std::io::stdin();
    loop {
        print!("Confirm outline? [y = confirm, q = quit, or type a change request]: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        let input = line.trim();

        match input {
            "y" | "yes" => {
                workflow.finalize()?;
                break;
            }
            "q" | "quit" => {
                info!("Outline discarded.");
                return Ok(());
            }
            "" => continue,
            modification => {
                match workflow
                    .regenerate(modification, CancellationToken::new())
                    .await
                {
                    Ok(()) => println!("\n{}\n", workflow.content.outline_to_confirm),
                    Err(WorkflowError::LimitExceeded(message)) => {
                        warn!("{}", message);
                        println!("{}. Confirm or quit.", message);
                    }
                    Err(error) => {
                        warn!("Regeneration failed: {}", error);
                        println!("Regeneration failed ({}). The previous outline is still shown above.", error);
                    }
                }
            }
        }
    }

    // --- 6. Convert the Finalized Outline into a Document ---
    match workflow.generate_document().await {
        Ok(document) => {
            let file_name = format!("lesson_resource.{}", extension(document.format));
            std::fs::write(&file_name, &document.bytes)?;
            info!(
                "Wrote {} ({} bytes). Downloads remaining: {}",
                file_name,
                document.bytes.len(),
                workflow.subscription.downloads_remaining
            );
        }
        Err(error) => {
            warn!("Document generation failed: {}", error);
        }
    }

    Ok(())
}

/// Builds the form from environment variables, falling back to stored
/// default settings where present.
fn form_from_env(store: &LocalStore) -> FormState {
    let defaults = store.load().default_settings.unwrap_or_default();

    let resource_types = std::env::var("RESOURCE_TYPES")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|_| {
            if defaults.resource_types.is_empty() {
                vec!["presentation".to_string()]
            } else {
                defaults.resource_types.clone()
            }
        });

    let num_slides = std::env::var("NUM_SLIDES")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(5);
    let primary_type = resource_types.first().cloned().unwrap_or_default();

    let mut form = FormState {
        resource_types,
        grade_level: env_or("GRADE_LEVEL", &defaults.grade_level),
        subject: env_or("SUBJECT", &defaults.subject),
        other_subject: env_or("OTHER_SUBJECT", ""),
        language: env_or("LANGUAGE", "English"),
        lesson_topic: env_or("LESSON_TOPIC", &defaults.lesson_topic),
        district: env_or("DISTRICT", &defaults.district),
        custom_prompt: env_or("CUSTOM_PROMPT", ""),
        num_slides: clamp_num_slides(num_slides, &primary_type),
        include_images: std::env::var("INCLUDE_IMAGES").is_ok(),
        ..FormState::default()
    };
    if let Ok(standards) = std::env::var("STANDARDS") {
        form.set_standards(
            standards
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        );
    }
    form
}

fn env_or(var: &str, fallback: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| fallback.to_string())
}

fn extension(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Presentation => "pptx",
        DocumentFormat::WordProcessing => "docx",
        DocumentFormat::Pdf => "pdf",
    }
}
