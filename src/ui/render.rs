use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::App;
use crate::chat::{self, ChatItem, Stage};
use crate::history::COMPACT_LEN;
use crate::theme::Theme;
use crate::types::*;
use crate::view::format_usd;

pub fn draw(f: &mut Frame, app: &App) {
    // Fill background
    let bg_block = Block::default().style(Style::default().bg(app.theme.bg));
    f.render_widget(bg_block, f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // top bar
            Constraint::Min(10),   // main
            Constraint::Length(9), // history
            Constraint::Length(1), // bottom bar
        ])
        .split(f.area());

    draw_top_bar(f, app, chunks[0]);
    match app.screen.section {
        Section::Form => draw_form(f, app, chunks[1]),
        Section::Result => draw_result(f, app, chunks[1]),
    }
    draw_history(f, app, chunks[2]);
    draw_bottom_bar(f, app, chunks[3]);

    if let Some(ref msg) = app.screen.alert {
        draw_alert(f, &app.theme, msg);
    }
}

// -- Top bar --

fn draw_top_bar(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let mut spans = vec![
        Span::styled(
            " homeval ",
            Style::default().fg(t.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled("\u{2302} ", Style::default().fg(t.dim)),
        Span::styled("House price prediction", Style::default().fg(t.dim)),
    ];

    let right = if app.submitting {
        "predicting...".to_string()
    } else {
        format!("{} \u{b7} {}", app.purpose().label(), app.theme.name)
    };
    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let pad = (area.width as usize).saturating_sub(used + right.chars().count() + 1);
    if pad > 0 {
        spans.push(Span::raw(" ".repeat(pad)));
    }
    spans.push(Span::styled(right, Style::default().fg(t.dim)));

    let bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(t.border)),
        );
    f.render_widget(bar, area);
}

// -- Form section --

fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let block = Block::default()
        .title(" Property details ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();

    // Purpose row: exactly one option highlighted once chosen
    let purpose_focused = app.focus == Focus::Purpose;
    let marker = if purpose_focused { "\u{25b8} " } else { "  " };
    let option = |label: &'static str, selected: bool| {
        if selected {
            Span::styled(
                format!("[x] {}", label),
                Style::default().fg(t.highlight_fg).bg(t.highlight_bg).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!("[ ] {}", label), Style::default().fg(t.dim))
        }
    };
    lines.push(Line::from(vec![
        Span::styled(marker, Style::default().fg(t.input_accent)),
        Span::styled("I am ", Style::default().fg(t.fg)),
        option("Buying (b)", app.purpose() == Purpose::Buy),
        Span::raw("  "),
        option("Selling (s)", app.purpose() == Purpose::Sell),
    ]));
    lines.push(Line::raw(""));

    for field in FIELDS {
        let focused = app.focus == Focus::Field(field);
        let invalid = app.form.error(field).is_some();
        let marker = if focused { "\u{25b8} " } else { "  " };
        let value = app.form.value(field);
        let shown = if focused { format!("{}_", value) } else { value.to_string() };
        let value_style = if focused {
            Style::default().fg(t.input_accent)
        } else if invalid {
            Style::default().fg(t.error)
        } else {
            Style::default().fg(t.fg)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(t.input_accent)),
            Span::styled(format!("{:<20}", field.label()), Style::default().fg(t.dim)),
            Span::styled(shown, value_style),
        ]));
        if let Some(msg) = app.form.error(field) {
            lines.push(Line::styled(format!("      {}", msg), Style::default().fg(t.error)));
        }
        if let Some(msg) = app.form.guidance(field) {
            lines.push(Line::styled(format!("      {}", msg), Style::default().fg(t.error)));
        }
    }

    lines.push(Line::raw(""));
    let predict_style = if !app.form.submit_enabled {
        Style::default().fg(t.dim)
    } else if app.focus == Focus::Predict {
        Style::default().fg(t.highlight_fg).bg(t.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(t.accent).add_modifier(Modifier::BOLD)
    };
    let marker = if app.focus == Focus::Predict { "\u{25b8} " } else { "  " };
    lines.push(Line::from(vec![
        Span::styled(marker, Style::default().fg(t.input_accent)),
        Span::styled("[ Predict ]", predict_style),
    ]));

    f.render_widget(Paragraph::new(lines), inner);
}

// -- Result section --

fn draw_result(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let block = Block::default()
        .title(" Estimate ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));
    let inner = block.inner(chunks[0]);
    f.render_widget(block, chunks[0]);

    let bold = |c: Color| Style::default().fg(c).add_modifier(Modifier::BOLD);
    let lines = match app.screen.result {
        Some(ref r) => vec![
            Line::raw("Based on the data provided, your home is estimated"),
            Line::from(vec![
                Span::raw("to be valued at "),
                Span::styled(r.price.clone(), bold(t.positive)),
                Span::raw("."),
            ]),
            Line::raw(""),
            Line::raw("The confidence interval for this prediction ranges"),
            Line::from(vec![
                Span::raw("between "),
                Span::styled(r.low.clone(), bold(t.accent)),
                Span::raw(" and "),
                Span::styled(r.high.clone(), bold(t.accent)),
                Span::raw("."),
            ]),
            Line::raw(""),
            Line::styled(
                "View properties in your area on Realtor.com:",
                Style::default().fg(t.dim),
            ),
            Line::styled(
                r.realtor_url.clone(),
                Style::default().fg(t.accent).add_modifier(Modifier::UNDERLINED),
            ),
        ],
        None => vec![Line::styled("No prediction yet.", Style::default().fg(t.dim))],
    };
    let p = Paragraph::new(lines)
        .style(Style::default().fg(t.fg))
        .wrap(Wrap { trim: false });
    f.render_widget(p, inner);

    draw_chat(f, app, chunks[1]);
}

fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let panel = chat::lock(app.chat());

    let busy = if panel.stage == Stage::Idle { "" } else { " \u{2026}" };
    let block = Block::default()
        .title(format!(" {}{} ", panel.title, busy))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.accent));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let max_w = inner.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for item in panel.items.iter() {
        match item {
            ChatItem::Message(s) | ChatItem::Notice(s) => {
                lines.push(Line::styled(format!("\u{25b8} {}", s), Style::default().fg(t.fg)));
            }
            ChatItem::Closing(s) => {
                lines.push(Line::styled(
                    format!("  {}", s),
                    Style::default().fg(t.dim).add_modifier(Modifier::ITALIC),
                ));
            }
            ChatItem::Loading { dots, width } => {
                let w = (*width).min(max_w).max(*dots);
                let text = format!("{:<w$}", ".".repeat(*dots), w = w);
                lines.push(Line::styled(
                    format!("  {}", text),
                    Style::default().fg(t.dim).bg(t.highlight_bg),
                ));
            }
        }
        lines.push(Line::raw(""));
    }

    // keep the newest message in view
    let total: usize = lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(inner.width.max(1) as usize))
        .sum();
    let scroll = total.saturating_sub(inner.height as usize) as u16;
    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0));
    f.render_widget(p, inner);
}

// -- History --

fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let rows_data = app.history_rows();

    let title = match (app.history.can_toggle(&app.store), app.history.mode()) {
        (false, _) => " History ".to_string(),
        (true, HistoryMode::Compact) => {
            format!(" History (latest {}) \u{25bc} v show all ", COMPACT_LEN)
        }
        (true, HistoryMode::Full) => " History (all) \u{25b2} v show less ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));

    if rows_data.is_empty() {
        let p = Paragraph::new("  No predictions yet.")
            .style(Style::default().fg(t.dim))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(
        ["Sqft", "Beds", "Baths", "Lot", "Floors", "Age", "ZIP", "Purpose", "Price"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(t.dim))),
    );

    let rows: Vec<Row> = rows_data
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.sqft_living.clone()),
                Cell::from(r.no_of_bedrooms.clone()),
                Cell::from(r.no_of_bathrooms.clone()),
                Cell::from(r.sqft_lot.clone()),
                Cell::from(r.no_of_floors.clone()),
                Cell::from(r.house_age.clone()),
                Cell::from(r.zipcode.clone()),
                Cell::from(r.purpose.clone()).style(Style::default().fg(t.accent)),
                Cell::from(format_usd(r.predicted_price)).style(Style::default().fg(t.positive)),
            ])
            .style(Style::default().fg(t.fg))
        })
        .collect();

    let widths = [
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Min(10),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

// -- Bottom bar --

fn draw_bottom_bar(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let hints = match (app.screen.section, app.focus) {
        (Section::Result, _) => {
            " Esc back to form | v history | e export | X clear | t theme | q quit "
        }
        (Section::Form, Focus::Purpose) => {
            " b buy | s sell | Tab/\u{2195} move | ^P predict | t theme | v history | q quit "
        }
        (Section::Form, Focus::Field(_)) => {
            " type value | Tab/\u{2195} move | Esc purpose | ^P predict "
        }
        (Section::Form, Focus::Predict) => {
            " Enter predict | Tab/\u{2195} move | e export | X clear | q quit "
        }
    };

    let mut spans = vec![Span::styled(hints, Style::default().fg(t.dim))];

    if let Some(ref err) = app.error {
        spans.push(Span::styled(
            format!(" \u{2502} {}", err),
            Style::default().fg(t.error),
        ));
    } else if let Some(ref status) = app.status {
        spans.push(Span::styled(
            format!(" \u{2502} {}", status),
            Style::default().fg(t.accent),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// -- Alert popup --

fn draw_alert(f: &mut Frame, t: &Theme, msg: &str) {
    let area = f.area();
    let box_w = 60_u16.min(area.width.saturating_sub(4));
    let box_h = 6_u16.min(area.height);
    let x = (area.width.saturating_sub(box_w)) / 2;
    let y = (area.height.saturating_sub(box_h)) / 2;
    let popup = Rect::new(x, y, box_w, box_h);

    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(" Notice ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.error));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let lines = vec![
        Line::styled(msg.to_string(), Style::default().fg(t.fg)),
        Line::raw(""),
        Line::styled("Enter/Esc to dismiss", Style::default().fg(t.dim)),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}
