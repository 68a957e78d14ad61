pub mod sequencer;
pub mod typing;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use sequencer::{Pacing, Sequencer};

/// Placeholder width when no message precedes the loading indicator.
pub const DEFAULT_LOADING_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    TitleTyping,
    LoadingShown(usize),
    MessageTyping(usize),
    ClosingTyping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatItem {
    Message(String),
    Closing(String),
    Loading { dots: usize, width: usize },
    Notice(String),
}

impl ChatItem {
    fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            ChatItem::Message(s) | ChatItem::Closing(s) | ChatItem::Notice(s) => Some(s),
            ChatItem::Loading { .. } => None,
        }
    }

    /// Rendered width in terminal cells, approximated by char count.
    pub fn width(&self) -> usize {
        match self {
            ChatItem::Message(s) | ChatItem::Closing(s) | ChatItem::Notice(s) => s.chars().count(),
            ChatItem::Loading { width, .. } => *width,
        }
    }
}

/// Where typed characters land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Title,
    Item(usize),
}

/// The recommendation panel's content. `generation` identifies the run
/// allowed to write; anything else is a stale run and must stop.
#[derive(Debug, Default)]
pub struct ChatPanel {
    pub title: String,
    pub items: Vec<ChatItem>,
    pub stage: Stage,
    generation: u64,
}

impl ChatPanel {
    pub fn text_mut(&mut self, target: Target) -> Option<&mut String> {
        match target {
            Target::Title => Some(&mut self.title),
            Target::Item(i) => self.items.get_mut(i).and_then(ChatItem::text_mut),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wipes content and hands write access to a new run.
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.title.clear();
        self.items.clear();
        self.stage = Stage::Idle;
        self.generation
    }
}

pub type SharedPanel = Arc<Mutex<ChatPanel>>;

pub fn shared_panel() -> SharedPanel {
    Arc::new(Mutex::new(ChatPanel::default()))
}

pub fn lock(panel: &SharedPanel) -> MutexGuard<'_, ChatPanel> {
    panel.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returned when a run has been superseded by a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;
