use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::api::PredictionBackend;
use crate::chat::{Sequencer, Stage};
use crate::history::HistoryStore;
use crate::logging::log_error;
use crate::store::Store;
use crate::types::{
    Field, PredictionRecord, PredictionRequest, PredictionResponse, Purpose, Section,
};
use crate::validate::FormState;
use crate::view::{ResultView, ViewPort};

pub const ALERT_NO_PURPOSE: &str = "Please select a purpose (Buy/Sell) before submitting.";
pub const ALERT_INVALID_FORM: &str = "Please fix the errors in the form before submitting.";
pub const ALERT_FAILED: &str = "An error occurred while predicting. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stopped before any network call.
    Rejected,
    Failed,
    Predicted,
}

/// The pieces of app state a finished submission feeds.
pub struct Submission<'a> {
    pub store: &'a Store,
    pub history: &'a mut HistoryStore,
    pub sequencer: &'a mut Sequencer,
}

pub fn build_request(purpose: &str, form: &FormState) -> PredictionRequest {
    let v = |f: Field| form.value(f).to_string();
    PredictionRequest {
        purpose: purpose.to_string(),
        sqft_living: v(Field::SqftLiving),
        no_of_bedrooms: v(Field::Bedrooms),
        no_of_bathrooms: v(Field::Bathrooms),
        sqft_lot: v(Field::SqftLot),
        no_of_floors: v(Field::Floors),
        house_age: v(Field::HouseAge),
        zipcode: v(Field::Zipcode),
    }
}

/// Runs the purpose and form gates. `Err` carries the outcome of a
/// submission stopped before any network call.
pub fn prepare<V: ViewPort>(
    purpose: Purpose,
    form: &mut FormState,
    view: &mut V,
) -> Result<PredictionRequest, Outcome> {
    let Some(purpose) = purpose.as_str() else {
        tracing::warn!("no purpose selected, aborting submission");
        view.alert(ALERT_NO_PURPOSE);
        return Err(Outcome::Rejected);
    };

    if !form.validate_all() {
        tracing::warn!("form validation failed, aborting submission");
        view.alert(ALERT_INVALID_FORM);
        return Err(Outcome::Rejected);
    }

    Ok(build_request(purpose, form))
}

/// A prediction request running on its own task.
pub struct InFlight {
    request: PredictionRequest,
    task: JoinHandle<Result<PredictionResponse>>,
}

impl InFlight {
    pub fn spawn(backend: Arc<dyn PredictionBackend>, request: PredictionRequest) -> Self {
        tracing::info!(
            purpose = %request.purpose,
            zipcode = %request.zipcode,
            "requesting prediction"
        );
        let req = request.clone();
        let task = tokio::spawn(async move { backend.predict(&req).await });
        Self { request, task }
    }

    pub fn request(&self) -> &PredictionRequest {
        &self.request
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the reply. Only meant to be awaited once.
    pub async fn finish(&mut self) -> Result<PredictionResponse> {
        match (&mut self.task).await {
            Ok(r) => r,
            Err(e) => Err(anyhow::anyhow!("Prediction task failed: {}", e)),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fans a finished request out to the result view, history and the
/// recommendation panel. A failure leaves the form as it was.
pub fn apply<V, F>(
    sub: Submission<'_>,
    req: &PredictionRequest,
    result: Result<PredictionResponse>,
    view: &mut V,
    on_stage: F,
) -> Outcome
where
    V: ViewPort,
    F: FnMut(Stage) + Send + 'static,
{
    let resp = match result {
        Ok(resp) => resp,
        Err(e) => {
            log_error(&format!("Predict: {:#}", e));
            view.alert(ALERT_FAILED);
            return Outcome::Failed;
        }
    };

    view.show_result(ResultView::from_response(&resp));
    view.show_section(Section::Result);

    let record = PredictionRecord::from_request(req, resp.predicted_price);
    if let Err(e) = sub.history.append(sub.store, record) {
        log_error(&format!("History: {:#}", e));
    }

    match resp.recommendations {
        Some(recs) => {
            tracing::debug!(count = recs.len(), "starting recommendation sequence");
            sub.sequencer.start(recs, on_stage);
        }
        None => tracing::debug!("response carried no recommendations"),
    }

    Outcome::Predicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{self, shared_panel, ChatItem, Pacing};
    use crate::chat::sequencer::{CLOSING, TITLE};
    use crate::types::{HistoryMode, FIELDS};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeBackend {
        calls: AtomicUsize,
        reply: Option<PredictionResponse>,
        seen: Mutex<Option<PredictionRequest>>,
    }

    impl FakeBackend {
        fn replying(reply: Option<PredictionResponse>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PredictionBackend for FakeBackend {
        async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(req.clone());
            self.reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("HTTP Error 500"))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        alerts: Vec<String>,
        section: Option<Section>,
        result: Option<ResultView>,
    }

    impl ViewPort for RecordingView {
        fn alert(&mut self, msg: &str) {
            self.alerts.push(msg.to_string());
        }
        fn show_section(&mut self, section: Section) {
            self.section = Some(section);
        }
        fn show_result(&mut self, result: ResultView) {
            self.result = Some(result);
        }
    }

    struct Fixture {
        form: FormState,
        store: Store,
        history: HistoryStore,
        sequencer: Sequencer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                form: FormState::default(),
                store: Store::in_memory(),
                history: HistoryStore::default(),
                sequencer: Sequencer::new(shared_panel(), Pacing::default()),
            }
        }

        fn fill(&mut self, purpose: Purpose) {
            let values = ["1500", "3", "2", "5000", "1", "10", "98101"];
            for (field, v) in FIELDS.iter().zip(values) {
                self.form.set_value(*field, v, purpose);
            }
        }

        /// Gate, spawn the request, then fan out its reply.
        async fn submit<F>(
            &mut self,
            purpose: Purpose,
            backend: Arc<FakeBackend>,
            view: &mut RecordingView,
            on_stage: F,
        ) -> Outcome
        where
            F: FnMut(Stage) + Send + 'static,
        {
            let req = match prepare(purpose, &mut self.form, view) {
                Ok(req) => req,
                Err(outcome) => return outcome,
            };
            let mut in_flight = InFlight::spawn(backend, req);
            let result = in_flight.finish().await;
            let sub = Submission {
                store: &self.store,
                history: &mut self.history,
                sequencer: &mut self.sequencer,
            };
            apply(sub, in_flight.request(), result, view, on_stage)
        }
    }

    fn reply() -> PredictionResponse {
        PredictionResponse {
            predicted_price: Some(450000.0),
            confidence_interval: Some((420000.0, 480000.0)),
            realtor_url: Some("https://www.realtor.com/realestateandhomes-search/98101".into()),
            recommendations: Some(vec!["Consider a 4th bedroom".into()]),
        }
    }

    #[tokio::test]
    async fn unset_purpose_never_calls_backend() {
        let mut fx = Fixture::new();
        fx.fill(Purpose::Unset);
        let backend = Arc::new(FakeBackend::replying(Some(reply())));
        let mut view = RecordingView::default();

        let out = fx.submit(Purpose::Unset, backend.clone(), &mut view, |_| {}).await;
        assert_eq!(out, Outcome::Rejected);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.alerts, vec![ALERT_NO_PURPOSE.to_string()]);
    }

    #[tokio::test]
    async fn invalid_field_never_calls_backend() {
        let mut fx = Fixture::new();
        fx.fill(Purpose::Buy);
        fx.form.set_value(Field::Bedrooms, "40", Purpose::Buy);
        let backend = Arc::new(FakeBackend::replying(Some(reply())));
        let mut view = RecordingView::default();

        let out = fx.submit(Purpose::Buy, backend.clone(), &mut view, |_| {}).await;
        assert_eq!(out, Outcome::Rejected);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.alerts, vec![ALERT_INVALID_FORM.to_string()]);
        assert_eq!(fx.form.value(Field::Bedrooms), "40");
    }

    #[tokio::test]
    async fn backend_failure_alerts_once_and_keeps_form() {
        let mut fx = Fixture::new();
        fx.fill(Purpose::Sell);
        let backend = Arc::new(FakeBackend::replying(None));
        let mut view = RecordingView::default();

        let out = fx.submit(Purpose::Sell, backend.clone(), &mut view, |_| {}).await;
        assert_eq!(out, Outcome::Failed);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.alerts, vec![ALERT_FAILED.to_string()]);
        assert_eq!(view.section, None);
        assert_eq!(fx.form.value(Field::Zipcode), "98101");
        assert!(fx.store.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_buy_prediction() {
        let mut fx = Fixture::new();
        fx.fill(Purpose::Buy);
        let backend = Arc::new(FakeBackend::replying(Some(reply())));
        let mut view = RecordingView::default();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let out = fx.submit(Purpose::Buy, backend.clone(), &mut view, move |s| {
            sink.lock().unwrap().push(s)
        })
        .await;
        assert_eq!(out, Outcome::Predicted);

        let sent = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(sent.purpose, "buy");
        assert_eq!(sent.no_of_bathrooms, "2");

        assert_eq!(view.section, Some(Section::Result));
        let result = view.result.clone().unwrap();
        assert_eq!(result.price, "$450,000");
        assert_eq!(result.low, "$420,000");
        assert_eq!(result.high, "$480,000");

        let listed = fx.history.list(&fx.store, HistoryMode::Full);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].predicted_price, Some(450000.0));
        assert_eq!(listed[0].purpose, "buy");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!fx.sequencer.is_running());
        let panel = chat::lock(fx.sequencer.panel());
        assert_eq!(panel.title, TITLE);
        assert_eq!(
            panel.items,
            vec![
                ChatItem::Message("Consider a 4th bedroom".into()),
                ChatItem::Closing(CLOSING.into()),
            ]
        );
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                Stage::TitleTyping,
                Stage::LoadingShown(0),
                Stage::MessageTyping(0),
                Stage::ClosingTyping,
                Stage::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn absent_recommendations_skip_the_sequencer() {
        let mut fx = Fixture::new();
        fx.fill(Purpose::Buy);
        let mut resp = reply();
        resp.recommendations = None;
        let backend = Arc::new(FakeBackend::replying(Some(resp)));
        let mut view = RecordingView::default();

        let out = fx.submit(Purpose::Buy, backend.clone(), &mut view, |_| {}).await;
        assert_eq!(out, Outcome::Predicted);
        assert!(!fx.sequencer.is_running());
        assert_eq!(chat::lock(fx.sequencer.panel()).title, "");
    }
}
