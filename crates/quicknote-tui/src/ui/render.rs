use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use quicknote_core::auth::AuthMode;
use quicknote_core::models::MAX_MESSAGE_LENGTH;

use crate::app::{App, AppState, LoginFocus};
use crate::utils::{format_created_at, swipe_gutter, truncate_string};

use super::styles;

/// Width of the visible part of sign-in form fields.
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Compose box
            Constraint::Min(5),    // Messages
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_compose(frame, app, chunks[1]);
    render_messages(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::SigningIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  quicknote";
    let user = app.user_email.as_deref().unwrap_or("not signed in");
    let right = format!("{}  [?] Help", user);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + right.chars().count() + 2),
        )),
        Span::styled(user.to_string(), styles::success_style()),
        Span::styled("  [?] Help", styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_compose(frame: &mut Frame, app: &App, area: Rect) {
    let composing = app.state == AppState::Composing;
    let count = app.compose.chars().count();
    let title = format!(" New message ({}/{}) ", count, MAX_MESSAGE_LENGTH);

    // Show the tail so the cursor stays visible
    let visible = (area.width as usize).saturating_sub(4);
    let skip = count.saturating_sub(visible);
    let text: String = app.compose.chars().skip(skip).collect();

    let line = if composing {
        Line::from(vec![
            Span::styled(text, styles::list_item_style()),
            Span::styled("▌", styles::highlight_style()),
        ])
    } else if app.compose.is_empty() {
        Line::from(Span::styled("Press n to write a message", styles::muted_style()))
    } else {
        Line::from(Span::styled(text, styles::muted_style()))
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(composing));

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_messages(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.state == AppState::Normal;
    let text_width = (area.width as usize).saturating_sub(20);

    let rows: Vec<Row> = app
        .feed
        .iter()
        .map(|message| {
            let offset = app.swipe_offset(message.id);
            let gutter = swipe_gutter(offset);
            let text = truncate_string(
                &message.message,
                text_width.saturating_sub(gutter.chars().count() + 1),
            );

            let row = Row::new(vec![
                Cell::from(format_created_at(message)),
                Cell::from(Line::from(vec![
                    Span::styled(gutter, styles::error_style()),
                    Span::raw(if offset < 0 { " " } else { "" }),
                    Span::raw(text),
                ])),
            ]);
            if offset < 0 {
                row.style(styles::swipe_style())
            } else {
                row.style(styles::list_item_style())
            }
        })
        .collect();

    let title = if app.feed.is_empty() {
        " Messages - none yet ".to_string()
    } else {
        format!(" Messages ({}) - [d]elete, ← swipe ", app.feed.len())
    };

    let widths = [Constraint::Length(13), Constraint::Fill(1)];
    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !app.feed.is_empty() {
        state.select(Some(app.selection));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[n]ew | [r]efresh | [o] sign out | [q]uit";

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => String::new(),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::highlight_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(50, 21, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(
            format!("  quicknote {}", version),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Messages", styles::highlight_style())),
        help_line("↑/↓", "Select message"),
        help_line("n", "Write a new message"),
        help_line("Enter", "Send (while writing)"),
        help_line("d", "Delete selected"),
        help_line("←", "Swipe left; four swipes delete"),
        help_line("→", "Cancel swipe"),
        help_line("r", "Refresh from server"),
        Line::from(""),
        Line::from(Span::styled(" Account", styles::highlight_style())),
        help_line("Ctrl+S", "Sign in / sign up (on form)"),
        help_line("o", "Sign out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// One labelled form field. `masked` hides the value.
fn form_field(label: &str, value: &str, focused: bool, masked: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let shown: String = if masked {
        "*".repeat(value.chars().count().min(FIELD_WIDTH))
    } else {
        let count = value.chars().count();
        value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect()
    };
    let cursor = if focused { "▌" } else { "" };

    Line::from(vec![
        Span::styled(format!("  {:>9}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let form = &app.auth_form;
    let height = if app.login_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  quicknote - {}", form.mode.title()),
            styles::title_style(),
        )),
        Line::from(""),
        form_field("Email", &form.email, app.login_focus == LoginFocus::Email, false),
    ];

    match form.mode {
        AuthMode::SignIn | AuthMode::SignUp => lines.push(form_field(
            "Password",
            &form.password,
            app.login_focus == LoginFocus::Password,
            true,
        )),
        AuthMode::Confirm => lines.push(form_field(
            "Code",
            &form.code,
            app.login_focus == LoginFocus::Code,
            false,
        )),
    }

    let button_label = match form.mode {
        AuthMode::SignIn => "Sign In",
        AuthMode::SignUp => "Sign Up",
        AuthMode::Confirm => "Confirm",
    };
    lines.push(Line::from(""));
    if app.login_focus == LoginFocus::Button {
        lines.push(Line::from(vec![
            Span::raw("            ["),
            Span::styled(format!(" ▶ {:^9} ◀ ", button_label), styles::selected_style()),
            Span::raw("]"),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::raw("            ["),
            Span::styled(format!("   {:^9}   ", button_label), styles::list_item_style()),
            Span::raw("]"),
        ]));
    }

    let toggle_hint = match form.mode {
        AuthMode::SignIn => "  Ctrl+S: create an account",
        AuthMode::SignUp | AuthMode::Confirm => "  Ctrl+S: back to sign in",
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(toggle_hint, styles::muted_style())));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", truncate_string(error, 42)),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
