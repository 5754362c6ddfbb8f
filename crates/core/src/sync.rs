//! Synchronisation between the form surface, the JSON surface and the store.
//!
//! The controller owns the canonical document and keeps both surfaces consistent with it:
//!
//! - **Form edit**: the form snapshot is derived into a new document, the store is replaced and
//!   the JSON text is re-serialised. The form itself is not re-rendered, apart from writing a
//!   derived birth date back into its birth-date input.
//! - **JSON edit**: the text is parsed. On success the store is replaced and the form is fully
//!   re-rendered from the document; the text is kept exactly as typed. On failure the store and
//!   both surfaces are left untouched and an `Invalid JSON: ...` message is shown.
//!
//! Collaborators are composed at construction time: the renderer always, the terminology source
//! optionally. Without a terminology source the geographic selects simply stay unpopulated.

use crate::clock::Clock;
use crate::config::EditorConfig;
use crate::constants::INVALID_JSON_PREFIX;
use crate::form::{FormSnapshot, FormState};
use crate::mapper::derive_document;
use crate::preview::age_preview;
use crate::store::PatientStore;
use crate::terminology::{resolve, GeoCascade, PendingLookup, TerminologyLookup};
use crate::EditorResult;
use fhir::{AddressRole, GeoCoding, GeoLevel, Patient, PatientResource};
use std::sync::Arc;

/// The rendering collaborator.
pub trait FormRenderer {
    /// Rebuild every form widget from `form`.
    fn render(&mut self, form: &FormState);

    /// Overwrite only the birth-date input.
    fn write_birth_date(&mut self, value: &str);

    /// Replace the options of one geographic select.
    fn populate_select(&mut self, _role: AddressRole, _level: GeoLevel, _options: &[GeoCoding]) {}
}

/// Surface an edit came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOrigin {
    Form,
    Json,
}

/// What an edit cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The store was replaced.
    Applied {
        origin: EditOrigin,
        /// The JSON surface was re-serialised from the new document.
        json_refreshed: bool,
        /// The form surface was re-rendered from the new document.
        form_rendered: bool,
    },
    /// The edit was rejected; the store and both surfaces are unchanged.
    Rejected { message: String },
}

/// Owns the canonical document and both editing surfaces.
pub struct SyncController<R> {
    cfg: Arc<EditorConfig>,
    clock: Arc<dyn Clock>,
    terminology: Option<Arc<dyn TerminologyLookup>>,
    store: PatientStore,
    form: FormState,
    json_text: String,
    error_message: String,
    permanent_geo: GeoCascade,
    temporary_geo: GeoCascade,
    renderer: R,
}

impl<R: FormRenderer> SyncController<R> {
    /// Create a controller holding the built-in sample document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialised.
    pub fn new(
        cfg: Arc<EditorConfig>,
        clock: Arc<dyn Clock>,
        renderer: R,
        terminology: Option<Arc<dyn TerminologyLookup>>,
    ) -> EditorResult<Self> {
        Self::with_document(cfg, clock, renderer, terminology, Patient::sample())
    }

    /// Create a controller holding `document`; both surfaces are rendered from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialised.
    pub fn with_document(
        cfg: Arc<EditorConfig>,
        clock: Arc<dyn Clock>,
        renderer: R,
        terminology: Option<Arc<dyn TerminologyLookup>>,
        document: PatientResource,
    ) -> EditorResult<Self> {
        let json_text = Patient::render(&document)?;
        let mut controller = Self {
            form: FormState::default(),
            store: PatientStore::with_document(document),
            json_text,
            error_message: String::new(),
            permanent_geo: GeoCascade::new(AddressRole::Permanent),
            temporary_geo: GeoCascade::new(AddressRole::Temporary),
            cfg,
            clock,
            terminology,
            renderer,
        };
        controller.render_form_from_store();
        Ok(controller)
    }

    // ------------------------------------------------------------------------
    // Edit entry points
    // ------------------------------------------------------------------------

    /// Handle an edit on the form surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is missing a required field or holds the wrong kind of
    /// value for one. Those are renderer bugs; the store is left untouched.
    pub fn on_form_input(&mut self, snapshot: &FormSnapshot) -> EditorResult<SyncOutcome> {
        let form = FormState::from_snapshot(snapshot)?;
        self.apply_form_state(form)
    }

    /// Derive a new document from `form` and refresh the JSON surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the derived document cannot be serialised.
    pub fn apply_form_state(&mut self, mut form: FormState) -> EditorResult<SyncOutcome> {
        let derived = derive_document(&form, self.store.current(), &self.cfg, self.clock.today());
        let json_text = Patient::render(&derived.document)?;

        tracing::debug!(source = ?derived.age_source, "derived document from form");
        self.store.replace(derived.document);
        self.json_text = json_text;
        self.error_message.clear();

        if let Some(birth_date) = derived.birth_date_writeback {
            self.renderer.write_birth_date(&birth_date);
            form.birth_date = birth_date;
        }
        self.permanent_geo.set_selected(&form.permanent.geo);
        self.temporary_geo.set_selected(&form.temporary.geo);
        self.form = form;

        tracing::info!("json surface refreshed");
        Ok(SyncOutcome::Applied {
            origin: EditOrigin::Form,
            json_refreshed: true,
            form_rendered: false,
        })
    }

    /// Handle an edit on the JSON surface.
    ///
    /// Never fails: unparseable text is reported through [`SyncOutcome::Rejected`] and
    /// [`error_message`](Self::error_message).
    pub fn on_json_input(&mut self, json_text: &str) -> SyncOutcome {
        self.json_text = json_text.to_string();

        match Patient::parse(json_text) {
            Ok(document) => {
                self.store.replace(document);
                self.error_message.clear();
                self.render_form_from_store();
                tracing::info!("form surface re-rendered from json");
                SyncOutcome::Applied {
                    origin: EditOrigin::Json,
                    json_refreshed: false,
                    form_rendered: true,
                }
            }
            Err(err) => {
                let message = format!("{INVALID_JSON_PREFIX}{err}");
                tracing::warn!(%message, "json edit rejected");
                self.error_message = message.clone();
                SyncOutcome::Rejected { message }
            }
        }
    }

    /// Go back to the built-in sample and re-render both surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be serialised.
    pub fn reset(&mut self) -> EditorResult<()> {
        self.store.reset();
        self.json_text = Patient::render(self.store.current())?;
        self.error_message.clear();
        self.render_form_from_store();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Geographic selects
    // ------------------------------------------------------------------------

    /// The region select of `role` was opened; load regions if not loaded yet.
    ///
    /// Only the select's options change. The document and the current selections are left as
    /// they are, also when the lookup fails.
    pub async fn open_region_select(&mut self, role: AddressRole) {
        if let Some(pending) = self.cascade(role).request_regions() {
            self.complete_lookup(pending).await;
        }
    }

    /// Select `coding` at `level` of the `role` address, then load the next level's options.
    ///
    /// # Errors
    ///
    /// Returns an error if a re-derived document cannot be serialised.
    pub async fn select_geo(
        &mut self,
        role: AddressRole,
        level: GeoLevel,
        coding: GeoCoding,
    ) -> EditorResult<SyncOutcome> {
        let pending = self.cascade_mut(role).select(level, coding);
        let outcome = self.derive_with_cascade_selection(role)?;
        if let Some(pending) = pending {
            self.complete_lookup(pending).await;
        }
        Ok(outcome)
    }

    async fn complete_lookup(&mut self, pending: PendingLookup) {
        let Some(terminology) = self.terminology.clone() else {
            tracing::debug!(?pending, "no terminology source, select left unpopulated");
            return;
        };

        let options = resolve(terminology.as_ref(), &pending).await;
        self.renderer
            .populate_select(pending.role, pending.target, &options);
        self.cascade_mut(pending.role).apply(&pending, options);
    }

    fn derive_with_cascade_selection(&mut self, role: AddressRole) -> EditorResult<SyncOutcome> {
        let mut form = self.form.clone();
        form.address_mut(role).geo = self.cascade(role).selected().clone();
        self.apply_form_state(form)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn document(&self) -> &PatientResource {
        self.store.current()
    }

    /// Literal contents of the JSON surface.
    pub fn json_text(&self) -> &str {
        &self.json_text
    }

    /// The user-visible error message; empty when there is none.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Form state as of the last edit or render.
    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn cascade(&self, role: AddressRole) -> &GeoCascade {
        match role {
            AddressRole::Permanent => &self.permanent_geo,
            AddressRole::Temporary => &self.temporary_geo,
        }
    }

    /// The "Rendered Age" narrative for the current form.
    pub fn age_preview(&self) -> String {
        age_preview(
            &self.form,
            self.store.current().birth_date.as_deref(),
            self.clock.today(),
        )
    }

    fn cascade_mut(&mut self, role: AddressRole) -> &mut GeoCascade {
        match role {
            AddressRole::Permanent => &mut self.permanent_geo,
            AddressRole::Temporary => &mut self.temporary_geo,
        }
    }

    fn render_form_from_store(&mut self) {
        self.form = FormState::from_document(self.store.current(), &self.cfg);
        self.permanent_geo.seed(&self.form.permanent.geo);
        self.temporary_geo.seed(&self.form.temporary.geo);
        self.renderer.render(&self.form);
    }
}
