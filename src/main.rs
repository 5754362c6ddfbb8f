use anyhow::Context;
use chrono::NaiveDate;
use fhir::{AddressRole, GeoCoding, GeoLevel};
use phedit_core::{
    Clock, EditorConfig, FieldValue, FixedClock, FormRenderer, FormState, StaticTerminology,
    SyncController, SyncOutcome, SystemClock, TerminologyLookup,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One line of a recorded editing session.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SessionEvent {
    /// Form fields changed; unnamed fields keep their current values.
    Form { fields: BTreeMap<String, FieldValue> },
    /// The JSON surface was edited to `text`.
    Json { text: String },
    /// A region select was opened.
    OpenRegions { role: AddressRole },
    /// A geographic select changed.
    SelectGeo {
        role: AddressRole,
        level: GeoLevel,
        #[serde(default)]
        code: String,
        #[serde(default)]
        display: String,
    },
    /// Start over from the sample patient.
    Reset,
}

/// Renderer for a headless session: widget updates are logged.
#[derive(Debug, Default)]
struct LogRenderer;

impl FormRenderer for LogRenderer {
    fn render(&mut self, form: &FormState) {
        tracing::info!(
            family = %form.name.family,
            birth_date = %form.birth_date,
            temp_mode = ?form.temp_mode(),
            "form rendered"
        );
    }

    fn write_birth_date(&mut self, value: &str) {
        tracing::info!(birth_date = value, "birth date written back");
    }

    fn populate_select(&mut self, role: AddressRole, level: GeoLevel, options: &[GeoCoding]) {
        tracing::info!(?role, ?level, count = options.len(), "select populated");
    }
}

/// Headless editing session.
///
/// Builds the editor at startup, then replays newline-delimited JSON session events from stdin.
/// After each event one JSON line is written to stdout with the outcome, the error message, the
/// age preview and the JSON surface.
///
/// # Environment Variables
/// - `PHEDIT_CONFIG`: editor configuration file (YAML)
/// - `PHEDIT_TERMINOLOGY_FILE`: recorded terminology responses (JSON); without it the
///   geographic selects stay unpopulated
/// - `PHEDIT_TODAY`: pin "today" (YYYY-MM-DD) instead of using the system date
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("phedit=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Arc::new(match std::env::var("PHEDIT_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading editor config {path}"))?;
            EditorConfig::from_yaml_str(&text)?
        }
        Err(_) => EditorConfig::default(),
    });

    let clock: Arc<dyn Clock> = match std::env::var("PHEDIT_TODAY") {
        Ok(today) => Arc::new(FixedClock(
            today
                .parse::<NaiveDate>()
                .with_context(|| format!("PHEDIT_TODAY is not a date: {today}"))?,
        )),
        Err(_) => Arc::new(SystemClock),
    };

    let terminology: Option<Arc<dyn TerminologyLookup>> =
        match std::env::var("PHEDIT_TERMINOLOGY_FILE") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading terminology fixture {path}"))?;
                tracing::info!("++ Terminology fixture {}", path);
                let lookup: Arc<dyn TerminologyLookup> =
                    Arc::new(StaticTerminology::from_fixture_str(&text)?);
                Some(lookup)
            }
            Err(_) => None,
        };

    let mut editor = SyncController::new(cfg, clock, LogRenderer, terminology)?;
    tracing::info!("++ Starting phedit session");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: SessionEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("skipping unreadable session event: {}", e);
                continue;
            }
        };

        let outcome = match apply_event(&mut editor, event).await? {
            Some(SyncOutcome::Rejected { .. }) => "rejected",
            Some(SyncOutcome::Applied { .. }) | None => "applied",
        };
        let report = serde_json::json!({
            "outcome": outcome,
            "error": editor.error_message(),
            "agePreview": editor.age_preview(),
            "json": editor.json_text(),
        });
        println!("{report}");
    }

    Ok(())
}

async fn apply_event(
    editor: &mut SyncController<LogRenderer>,
    event: SessionEvent,
) -> anyhow::Result<Option<SyncOutcome>> {
    let outcome = match event {
        SessionEvent::Form { fields } => {
            let mut snapshot = editor.form().to_snapshot();
            snapshot.extend(fields);
            Some(editor.on_form_input(&snapshot)?)
        }
        SessionEvent::Json { text } => Some(editor.on_json_input(&text)),
        SessionEvent::OpenRegions { role } => {
            editor.open_region_select(role).await;
            None
        }
        SessionEvent::SelectGeo {
            role,
            level,
            code,
            display,
        } => Some(
            editor
                .select_geo(role, level, GeoCoding::new(code, display))
                .await?,
        ),
        SessionEvent::Reset => {
            editor.reset()?;
            None
        }
    };
    Ok(outcome)
}
