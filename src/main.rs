mod api;
mod app;
mod chat;
mod config;
mod history;
mod logging;
mod selection;
mod store;
mod submit;
mod theme;
mod types;
mod ui;
mod validate;
mod view;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use api::{PredictionBackend, PredictorClient};
use app::App;
use config::Config;
use history::HistoryStore;
use store::{SqliteKv, Store};
use types::*;
use view::format_usd;

#[derive(Parser)]
#[command(name = "homeval", version, about = "House price predictions in the terminal")]
struct Cli {
    /// Prediction backend URL, overriding the config file
    #[arg(long)]
    backend: Option<String>,

    /// Directory holding the database and log file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print saved predictions, newest first
    History {
        /// Show every record instead of the latest five
        #[arg(long)]
        all: bool,
    },
    /// Write the prediction history as CSV
    Export { path: PathBuf },
    /// Delete all saved predictions
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(store::default_data_dir);
    logging::init(&logging::log_path(&data_dir))?;

    let mut config = Config::load()?;
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }

    let store = Store::new(SqliteKv::open(&SqliteKv::path_in(&data_dir))?);

    if let Some(cmd) = cli.command {
        return run_command(cmd, &store);
    }

    let client = PredictorClient::new(&config.backend_url, config.request_timeout())?;
    tracing::info!(backend = client.url(), "starting");
    let client: Arc<dyn PredictionBackend> = Arc::new(client);

    let mut app = App::new(&config, store);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, client, &data_dir).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        let msg = format!("Fatal: {}", e);
        logging::log_error(&msg);
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn run_command(cmd: Command, store: &Store) -> Result<()> {
    let mut history = HistoryStore::default();
    match cmd {
        Command::History { all } => {
            let mode = if all { HistoryMode::Full } else { HistoryMode::Compact };
            let records = history.list(store, mode);
            if records.is_empty() {
                println!("No predictions yet.");
            }
            for r in records {
                let date = r
                    .recorded_at
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<16} {:<4} {:>6} sqft  {} bd  {} ba  lot {:>6}  {} fl  {:>3} yrs  {}  {}",
                    date,
                    r.purpose,
                    r.sqft_living,
                    r.no_of_bedrooms,
                    r.no_of_bathrooms,
                    r.sqft_lot,
                    r.no_of_floors,
                    r.house_age,
                    r.zipcode,
                    format_usd(r.predicted_price),
                );
            }
        }
        Command::Export { path } => {
            let n = history::export_csv(store, &path)?;
            println!("Exported {} predictions to {}", n, path.display());
        }
        Command::ClearHistory => {
            history.clear(store)?;
            println!("History cleared");
        }
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: Arc<dyn PredictionBackend>,
    data_dir: &Path,
) -> Result<()> {
    loop {
        if let Some(outcome) = app.poll_submit().await {
            tracing::debug!(?outcome, "submission finished");
        }

        terminal.draw(|f| ui::draw(f, app))?;

        // Animate smoothly while a recommendation sequence is writing
        let tick_rate = if app.chat_active() || app.submitting {
            Duration::from_millis(30)
        } else {
            Duration::from_millis(250)
        };

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                if ctrl && key.code == KeyCode::Char('c') {
                    app.quit = true;
                } else if app.screen.alert.is_some() {
                    if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                        app.dismiss_alert();
                    }
                } else if ctrl && key.code == KeyCode::Char('p') {
                    submit(app, &client);
                } else {
                    handle_key(app, &client, data_dir, key);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, client: &Arc<dyn PredictionBackend>, data_dir: &Path, key: KeyEvent) {
    if app.screen.section == Section::Form {
        match (app.focus, key.code) {
            (_, KeyCode::Tab | KeyCode::Down) => app.focus_next(),
            (_, KeyCode::BackTab | KeyCode::Up) => app.focus_prev(),
            (Focus::Purpose, KeyCode::Char('b')) => app.choose_purpose(Purpose::Buy),
            (Focus::Purpose, KeyCode::Char('s')) => app.choose_purpose(Purpose::Sell),
            (Focus::Field(_), KeyCode::Char(c)) if c.is_ascii_digit() || c == '.' || c == '-' => {
                app.type_char(c)
            }
            (Focus::Field(_), KeyCode::Backspace) => app.backspace(),
            (Focus::Field(_), KeyCode::Esc) => app.focus = Focus::Purpose,
            // a field owns the keyboard; commands only apply off the inputs
            (Focus::Field(_), _) => {}
            (Focus::Predict, KeyCode::Enter) => submit(app, client),
            _ => handle_command(app, data_dir, key.code),
        }
    } else {
        handle_command(app, data_dir, key.code);
    }
}

fn handle_command(app: &mut App, data_dir: &Path, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Esc if app.screen.section == Section::Result => app.back_to_form(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('v') => app.toggle_history(),
        KeyCode::Char('X') => app.clear_history(),
        KeyCode::Char('e') => {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            let path = data_dir.join(format!("history-{}.csv", stamp));
            app.export_history(&path);
        }
        _ => {}
    }
}

fn submit(app: &mut App, client: &Arc<dyn PredictionBackend>) {
    app.error = None;
    app.status = None;
    if let Some(outcome) = app.start_submit(client.clone()) {
        tracing::debug!(?outcome, "submission rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut App, code: KeyCode) {
        let client: Arc<dyn PredictionBackend> =
            Arc::new(PredictorClient::new("http://127.0.0.1:9/", None).unwrap());
        let dir = tempfile::tempdir().unwrap();
        handle_key(app, &client, dir.path(), KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn app_on_first_field() -> App {
        let mut app = App::new(&Config::default(), Store::in_memory());
        app.choose_purpose(Purpose::Buy);
        app.focus_next();
        assert_eq!(app.focus, Focus::Field(Field::SqftLiving));
        app
    }

    #[test]
    fn command_keys_are_inert_while_a_field_has_focus() {
        let mut app = app_on_first_field();
        for c in ['q', 'X', 't', 'v', 'e'] {
            press(&mut app, KeyCode::Char(c));
        }
        assert!(!app.quit);
        assert_eq!(app.theme.name, "dark");
        assert_eq!(app.status, None);

        press(&mut app, KeyCode::Char('7'));
        assert_eq!(app.form.value(Field::SqftLiving), "7");
    }

    #[test]
    fn command_keys_work_off_the_inputs() {
        let mut app = app_on_first_field();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::Purpose);

        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.theme.name, "light");
        press(&mut app, KeyCode::Char('q'));
        assert!(app.quit);
    }
}
