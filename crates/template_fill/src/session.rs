//! Upload-and-fill session
//!
//! [`FillSession`] tracks one template through upload, data entry, and
//! generation. Each operation is legal only in certain states:
//!
//! ```text
//! Idle --load--> Parsing --> Ready --generate--> Generating --> Success
//!                   |          ^                     |            |
//!                   v          |                     v            |
//!                 Error <------+---------------------+            |
//!                              +-------- tick (after delay) <-----+
//! ```
//!
//! `retry` leaves `Error` for `Ready` when the failure happened while
//! generating from a loaded template, and for `Idle` otherwise.

use crate::config::GeneratorConfig;
use crate::error::{Phase, PhaseError, TemplateError};
use crate::generator::{filled_file_name, generate_filled_document, require_template_variables};
use crate::sink::DocumentSink;
use crate::value::{RawData, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Where a session is in the fill workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Idle,
    Parsing,
    Ready,
    Generating,
    Success,
    Error,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Parsing => "parsing",
            GenerationStatus::Ready => "ready",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Success => "success",
            GenerationStatus::Error => "error",
        }
    }

    /// Whether an operation is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, GenerationStatus::Parsing | GenerationStatus::Generating)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation is not allowed in the current status
    #[error("cannot {operation} while the session is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: GenerationStatus,
    },

    /// The workflow failed; the session is now in `Error`
    #[error(transparent)]
    Template(#[from] PhaseError),
}

#[derive(Debug, Clone)]
struct LoadedTemplate {
    file_name: String,
    bytes: Vec<u8>,
    variables: Vec<String>,
}

/// State of one template fill
#[derive(Debug)]
pub struct FillSession {
    config: GeneratorConfig,
    status: GenerationStatus,
    template: Option<LoadedTemplate>,
    data: RawData,
    error_message: Option<String>,
    failed_phase: Option<Phase>,
    succeeded_at: Option<Instant>,
    last_output: Option<String>,
}

impl Default for FillSession {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl FillSession {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            status: GenerationStatus::Idle,
            template: None,
            data: RawData::new(),
            error_message: None,
            failed_phase: None,
            succeeded_at: None,
            last_output: None,
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Placeholder names of the loaded template
    pub fn variables(&self) -> &[String] {
        self.template.as_ref().map_or(&[], |t| t.variables.as_slice())
    }

    /// Values entered so far
    pub fn data(&self) -> &RawData {
        &self.data
    }

    /// File name of the loaded template
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.file_name.as_str())
    }

    /// Message of the failure that put the session in `Error`
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Name the last generated document was saved under
    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    fn guard(&self, operation: &'static str, allowed: &[GenerationStatus]) -> Result<(), SessionError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                operation,
                status: self.status,
            })
        }
    }

    fn fail(&mut self, err: PhaseError) -> SessionError {
        self.status = GenerationStatus::Error;
        self.error_message = Some(err.to_string());
        self.failed_phase = Some(err.phase);
        SessionError::Template(err)
    }

    fn clear(&mut self) {
        self.template = None;
        self.data.clear();
        self.error_message = None;
        self.failed_phase = None;
        self.succeeded_at = None;
    }

    /// Accept an uploaded template and discover its placeholders.
    ///
    /// Every discovered name starts out with an empty value.
    pub fn load(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<&[String], SessionError> {
        self.guard("load a template", &[GenerationStatus::Idle, GenerationStatus::Error])?;
        self.clear();

        if !file_name.ends_with(".docx") {
            tracing::warn!(file_name, "Rejected upload without .docx extension");
            return Err(self.fail(PhaseError::new(
                Phase::Parse,
                TemplateError::NotDocx(file_name.to_string()),
            )));
        }

        self.status = GenerationStatus::Parsing;
        let variables = match require_template_variables(&bytes, &self.config) {
            Ok(variables) => variables,
            Err(e) => return Err(self.fail(e)),
        };

        self.data = variables
            .iter()
            .map(|name| (name.clone(), Value::Text(String::new())))
            .collect();
        tracing::info!(file_name, variables = variables.len(), "Template ready");

        self.status = GenerationStatus::Ready;
        let template = self.template.insert(LoadedTemplate {
            file_name: file_name.to_string(),
            bytes,
            variables,
        });
        Ok(&template.variables)
    }

    /// Set the value of one placeholder
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SessionError> {
        self.guard("set a value", &[GenerationStatus::Ready])?;
        self.data.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Fill the loaded template and save it as `<name>_filled.docx`.
    ///
    /// Returns the saved file name.
    pub fn generate<S: DocumentSink + ?Sized>(&mut self, sink: &S) -> Result<String, SessionError> {
        self.guard("generate", &[GenerationStatus::Ready])?;
        let Some(template) = self.template.as_ref() else {
            return Err(SessionError::InvalidTransition {
                operation: "generate",
                status: self.status,
            });
        };

        self.status = GenerationStatus::Generating;
        let file_name = filled_file_name(&template.file_name);
        let result = generate_filled_document(
            &template.bytes,
            &self.data,
            &template.variables,
            &file_name,
            &self.config,
            sink,
        );

        match result {
            Ok(()) => {
                self.status = GenerationStatus::Success;
                self.succeeded_at = Some(Instant::now());
                self.last_output = Some(file_name.clone());
                Ok(file_name)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Advance timed transitions. `Success` returns to `Ready` once the
    /// configured display time has passed.
    pub fn tick(&mut self, now: Instant) -> GenerationStatus {
        if let (GenerationStatus::Success, Some(since)) = (self.status, self.succeeded_at) {
            if now.saturating_duration_since(since) >= self.config.success_display() {
                self.status = GenerationStatus::Ready;
                self.succeeded_at = None;
            }
        }
        self.status
    }

    /// Leave `Error`
    pub fn retry(&mut self) -> Result<GenerationStatus, SessionError> {
        self.guard("retry", &[GenerationStatus::Error])?;

        if self.template.is_some() && self.failed_phase == Some(Phase::Generate) {
            self.status = GenerationStatus::Ready;
            self.error_message = None;
            self.failed_phase = None;
        } else {
            self.clear();
            self.status = GenerationStatus::Idle;
        }
        Ok(self.status)
    }

    /// Drop the template and entered data
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::InvalidTransition {
                operation: "reset",
                status: self.status,
            });
        }
        self.clear();
        self.status = GenerationStatus::Idle;
        Ok(())
    }
}
