use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::typing::type_text;
use super::{lock, Cancelled, ChatItem, SharedPanel, Stage, Target, DEFAULT_LOADING_WIDTH};

pub const TITLE: &str = "📈 Smart Moves: Market Insights Tailored for You!";
pub const NO_RECOMMENDATIONS: &str = "No specific recommendations available.";
pub const CLOSING: &str = "I hope these insights help! 😊 If you need more tailored advice, \
try tweaking one of the house features above and click ‘Predict’—I'll refine my recommendations \
for you!";

#[derive(Debug, Clone)]
pub struct Pacing {
    pub title_delay_ms: u64,
    pub message_delay_ms: u64,
    pub closing_delay_ms: u64,
    pub thinking: Duration,
    pub dot_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            title_delay_ms: 50,
            message_delay_ms: 50,
            closing_delay_ms: 0,
            thinking: Duration::from_millis(1000),
            dot_interval: Duration::from_millis(500),
        }
    }
}

/// Drives one recommendation sequence at a time. Starting a new sequence
/// halts the previous one before touching the panel.
pub struct Sequencer {
    panel: SharedPanel,
    pacing: Pacing,
    task: Option<JoinHandle<()>>,
}

impl Sequencer {
    pub fn new(panel: SharedPanel, pacing: Pacing) -> Self {
        Self {
            panel,
            pacing,
            task: None,
        }
    }

    pub fn panel(&self) -> &SharedPanel {
        &self.panel
    }

    pub fn start<F>(&mut self, recommendations: Vec<String>, observer: F)
    where
        F: FnMut(Stage) + Send + 'static,
    {
        self.start_with_rng(recommendations, StdRng::from_entropy(), observer);
    }

    pub fn start_with_rng<R, F>(&mut self, recommendations: Vec<String>, rng: R, observer: F)
    where
        R: Rng + Send + 'static,
        F: FnMut(Stage) + Send + 'static,
    {
        self.cancel();
        let generation = lock(&self.panel).reset();
        let panel = self.panel.clone();
        let pacing = self.pacing.clone();
        self.task = Some(tokio::spawn(async move {
            let _ = run(&panel, generation, &recommendations, &pacing, rng, observer).await;
        }));
    }

    /// Aborts the running sequence, if any. Content already shown stays.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs the whole sequence against a panel already reset to `generation`.
pub async fn run<R, F>(
    panel: &SharedPanel,
    generation: u64,
    recommendations: &[String],
    pacing: &Pacing,
    mut rng: R,
    mut observer: F,
) -> Result<(), Cancelled>
where
    R: Rng,
    F: FnMut(Stage),
{
    let mut enter = |stage: Stage| -> Result<(), Cancelled> {
        let mut p = lock(panel);
        if p.generation() != generation {
            return Err(Cancelled);
        }
        p.stage = stage;
        drop(p);
        observer(stage);
        Ok(())
    };

    enter(Stage::TitleTyping)?;
    let title_delay = pacing.title_delay_ms;
    type_text(panel, generation, Target::Title, TITLE, title_delay, &mut rng, || {}).await?;

    if recommendations.is_empty() {
        {
            let mut p = lock(panel);
            if p.generation() != generation {
                return Err(Cancelled);
            }
            p.items = vec![ChatItem::Notice(NO_RECOMMENDATIONS.to_string())];
        }
        return enter(Stage::Idle);
    }

    for (i, rec) in recommendations.iter().enumerate() {
        enter(Stage::LoadingShown(i))?;
        show_loading(panel, generation, pacing).await?;

        enter(Stage::MessageTyping(i))?;
        let slot = push_item(panel, generation, ChatItem::Message(String::new()))?;
        let target = Target::Item(slot);
        type_text(panel, generation, target, rec, pacing.message_delay_ms, &mut rng, || {
            tracing::trace!("recommendation {} shown", i + 1);
        })
        .await?;
    }

    time::sleep(pacing.thinking).await;
    enter(Stage::ClosingTyping)?;
    let slot = push_item(panel, generation, ChatItem::Closing(String::new()))?;
    let target = Target::Item(slot);
    type_text(panel, generation, target, CLOSING, pacing.closing_delay_ms, &mut rng, || {}).await?;

    enter(Stage::Idle)
}

fn push_item(panel: &SharedPanel, generation: u64, item: ChatItem) -> Result<usize, Cancelled> {
    let mut p = lock(panel);
    if p.generation() != generation {
        return Err(Cancelled);
    }
    p.items.push(item);
    Ok(p.items.len() - 1)
}

/// Shows the dot placeholder for the thinking pause, then removes it.
async fn show_loading(
    panel: &SharedPanel,
    generation: u64,
    pacing: &Pacing,
) -> Result<(), Cancelled> {
    let width = {
        let p = lock(panel);
        p.items
            .last()
            .map(ChatItem::width)
            .unwrap_or(DEFAULT_LOADING_WIDTH)
    };
    let slot = push_item(panel, generation, ChatItem::Loading { dots: 0, width })?;

    let pause = time::sleep(pacing.thinking);
    tokio::pin!(pause);
    let mut ticker = time::interval_at(Instant::now() + pacing.dot_interval, pacing.dot_interval);
    let mut dots = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut pause => break,
            _ = ticker.tick() => {
                dots = (dots + 1) % 4;
                let mut p = lock(panel);
                if p.generation() != generation {
                    return Err(Cancelled);
                }
                if let Some(ChatItem::Loading { dots: d, .. }) = p.items.get_mut(slot) {
                    *d = dots;
                }
            }
        }
    }

    let mut p = lock(panel);
    if p.generation() != generation {
        return Err(Cancelled);
    }
    if matches!(p.items.get(slot), Some(ChatItem::Loading { .. })) {
        p.items.remove(slot);
    }
    Ok(())
}
