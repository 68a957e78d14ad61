use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::PredictionBackend;
use crate::chat::{self, Sequencer, SharedPanel, Stage};
use crate::config::Config;
use crate::history::{self, HistoryStore};
use crate::logging::log_error;
use crate::selection::Selection;
use crate::store::Store;
use crate::submit::{self, InFlight, Outcome, Submission};
use crate::theme::{self, Theme};
use crate::types::*;
use crate::validate::FormState;
use crate::view::{Screen, ViewPort};

pub struct App {
    pub theme: Theme,
    pub store: Store,
    pub form: FormState,
    pub selection: Selection,
    pub history: HistoryStore,
    pub sequencer: Sequencer,
    pub screen: Screen,
    pub focus: Focus,
    pub submitting: bool,
    in_flight: Option<InFlight>,
    /// Set by the stage observer while a recommendation sequence is mid-run.
    animating: Arc<AtomicBool>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub quit: bool,
}

impl App {
    pub fn new(config: &Config, store: Store) -> Self {
        let theme_name = store.theme().unwrap_or_else(|| config.theme.clone());
        let selection = Selection::load(&store);
        let sequencer = Sequencer::new(chat::shared_panel(), config.pacing());
        Self {
            theme: theme::by_name(&theme_name),
            store,
            form: FormState::default(),
            selection,
            history: HistoryStore::default(),
            sequencer,
            screen: Screen::default(),
            focus: Focus::Purpose,
            submitting: false,
            in_flight: None,
            animating: Arc::new(AtomicBool::new(false)),
            status: None,
            error: None,
            quit: false,
        }
    }

    pub fn purpose(&self) -> Purpose {
        self.selection.purpose()
    }

    pub fn chat(&self) -> &SharedPanel {
        self.sequencer.panel()
    }

    pub fn choose_purpose(&mut self, purpose: Purpose) {
        if let Err(e) = self.selection.set_purpose(purpose, &self.store, &mut self.form) {
            self.set_error(format!("Store: {}", e));
        }
    }

    pub fn focus_next(&mut self) {
        self.move_focus(self.focus.next());
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(self.focus.prev());
    }

    fn move_focus(&mut self, target: Focus) {
        self.focus = self.selection.gate_focus(target, &mut self.form);
    }

    pub fn type_char(&mut self, c: char) {
        if let Focus::Field(field) = self.focus {
            self.form.push_char(field, c, self.purpose());
        }
    }

    pub fn backspace(&mut self) {
        if let Focus::Field(field) = self.focus {
            self.form.pop_char(field, self.purpose());
        }
    }

    /// Gates the form and hands the request to a background task. Returns
    /// the outcome right away only when the submission was rejected.
    pub fn start_submit(&mut self, backend: Arc<dyn PredictionBackend>) -> Option<Outcome> {
        if self.in_flight.is_some() {
            tracing::debug!("prediction already in flight, ignoring submit");
            return None;
        }
        match submit::prepare(self.purpose(), &mut self.form, &mut self.screen) {
            Ok(req) => {
                self.in_flight = Some(InFlight::spawn(backend, req));
                self.submitting = true;
                None
            }
            Err(outcome) => Some(outcome),
        }
    }

    /// Applies the reply once the background request has finished.
    pub async fn poll_submit(&mut self) -> Option<Outcome> {
        if !self.in_flight.as_ref().is_some_and(InFlight::is_finished) {
            return None;
        }
        let mut in_flight = self.in_flight.take()?;
        let result = in_flight.finish().await;
        self.submitting = false;

        let animating = self.animating.clone();
        let sub = Submission {
            store: &self.store,
            history: &mut self.history,
            sequencer: &mut self.sequencer,
        };
        let on_stage = move |stage: Stage| {
            tracing::debug!(?stage, "recommendation stage");
            animating.store(stage != Stage::Idle, Ordering::Relaxed);
        };
        let req = in_flight.request();
        Some(submit::apply(sub, req, result, &mut self.screen, on_stage))
    }

    /// Leaves the result view for a fresh, empty form.
    pub fn back_to_form(&mut self) {
        self.screen.show_section(Section::Form);
        self.form.clear();
        self.focus = Focus::Purpose;
    }

    pub fn dismiss_alert(&mut self) {
        self.screen.alert = None;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = theme::toggled(&self.theme);
        if let Err(e) = self.store.set_theme(self.theme.name) {
            self.set_error(format!("Store: {}", e));
        }
    }

    pub fn toggle_history(&mut self) {
        if self.history.can_toggle(&self.store) {
            self.history.toggle_mode();
        }
    }

    pub fn clear_history(&mut self) {
        match self.history.clear(&self.store) {
            Ok(()) => self.status = Some("History cleared".into()),
            Err(e) => self.set_error(format!("Store: {}", e)),
        }
    }

    pub fn export_history(&mut self, path: &Path) {
        match history::export_csv(&self.store, path) {
            Ok(n) => {
                self.status = Some(format!("Exported {} predictions to {}", n, path.display()))
            }
            Err(e) => self.set_error(format!("Export: {:#}", e)),
        }
    }

    pub fn history_rows(&self) -> Vec<PredictionRecord> {
        self.history.visible(&self.store)
    }

    /// True while recommendation text is still being written.
    pub fn chat_active(&self) -> bool {
        self.animating.load(Ordering::Relaxed) && self.sequencer.is_running()
    }

    pub fn set_error(&mut self, msg: String) {
        log_error(&msg);
        self.error = Some(msg);
    }
}
