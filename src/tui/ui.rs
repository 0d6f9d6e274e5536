//! Stateless rendering of [`App`].

use duel_board::{Position, Symbol};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use strum::IntoEnumIterator;

use super::app::{App, MenuItem};
use crate::controller::View;

/// Draws the visible screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(9),    // Body
            Constraint::Length(3), // Status
            Constraint::Length(1), // Help
        ])
        .split(area);

    let title = Paragraph::new("Tic-Tac-Toe Duel")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    let help = match app.screen() {
        View::Menu => {
            draw_menu(frame, chunks[1], app);
            "↑/↓ select · Enter confirm · q quit"
        }
        View::Hosting => {
            draw_hosting(frame, chunks[1], app);
            "Esc/m menu · q quit"
        }
        View::Joining => {
            draw_joining(frame, chunks[1], app);
            "Type the code · Enter join · Esc menu"
        }
        View::Game { .. } => {
            draw_game(frame, chunks[1], app);
            "Arrows/1-9 move · Enter play · r restart · m menu · q quit"
        }
    };

    let status = app
        .notice()
        .map(|notice| Span::styled(notice.to_string(), Style::default().fg(Color::Red)))
        .or_else(|| {
            app.connection()
                .filter(|_| !matches!(app.screen(), View::Game { .. }))
                .map(|c| Span::styled(c.to_string(), Style::default().fg(Color::Green)))
        })
        .or_else(|| {
            app.status()
                .map(|s| Span::styled(s.to_string(), Style::default().fg(Color::Yellow)))
        })
        .unwrap_or_default();
    let status = Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[2]);

    let help = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[3]);
}

fn draw_menu(frame: &mut Frame, area: Rect, app: &App) {
    let selected = app.selected_menu_item();
    let lines: Vec<Line> = MenuItem::iter()
        .map(|item| {
            if item == selected {
                Line::from(Span::styled(
                    format!("> {} <", item),
                    Style::default().fg(Color::Black).bg(Color::White),
                ))
            } else {
                Line::from(item.to_string())
            }
        })
        .collect();
    let menu = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().title("Main Menu").borders(Borders::ALL));
    frame.render_widget(menu, center_rect(area, 36, 9));
}

fn draw_hosting(frame: &mut Frame, area: Rect, app: &App) {
    let code = app
        .room_code()
        .map_or_else(|| "------".to_string(), |code| code.to_string());
    let lines = vec![
        Line::from("Share this room code:"),
        Line::from(""),
        Line::from(Span::styled(
            code,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ];
    let panel = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().title("Host Game").borders(Borders::ALL));
    frame.render_widget(panel, center_rect(area, 36, 7));
}

fn draw_joining(frame: &mut Frame, area: Rect, app: &App) {
    let lines = vec![
        Line::from("Enter the 6-digit room code:"),
        Line::from(""),
        Line::from(Span::styled(
            format!("[{:<6}]", app.join_input()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
    ];
    let panel = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().title("Join Game").borders(Borders::ALL));
    frame.render_widget(panel, center_rect(area, 36, 7));
}

fn draw_game(frame: &mut Frame, area: Rect, app: &App) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(42), Constraint::Length(22)])
        .split(area);

    draw_board(frame, halves[0], app);

    let score: Vec<Line> = app
        .score_lines()
        .into_iter()
        .map(|(label, wins)| Line::from(format!("{}: {}", label, wins)))
        .collect();
    let score = Paragraph::new(score).block(Block::default().title("Score").borders(Borders::ALL));
    frame.render_widget(score, center_rect(halves[1], 22, 4));
}

fn draw_board(frame: &mut Frame, area: Rect, app: &App) {
    let board_area = center_rect(area, 40, 11);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(board_area);

    for (row, chunk) in [0, 2, 4].into_iter().enumerate() {
        draw_row(frame, rows[chunk], app, row);
        if chunk < 4 {
            draw_separator(frame, rows[chunk + 1]);
        }
    }
}

fn draw_row(frame: &mut Frame, area: Rect, app: &App, row: usize) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12),
            Constraint::Length(1),
            Constraint::Length(12),
            Constraint::Length(1),
            Constraint::Length(12),
        ])
        .split(area);

    for col in 0..3 {
        if let Some(position) = Position::from_index(row * 3 + col) {
            draw_cell(frame, cols[col * 2], app, position);
        }
        if col < 2 {
            draw_separator_vertical(frame, cols[col * 2 + 1]);
        }
    }
}

fn draw_cell(frame: &mut Frame, area: Rect, app: &App, position: Position) {
    let index = position.to_index();
    let (text, base_style) = match app.board()[index] {
        None => (format!(" {} ", index + 1), Style::default().fg(Color::DarkGray)),
        Some(Symbol::X) => (
            " X ".to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
        Some(Symbol::O) => (
            " O ".to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let style = if position == app.cursor() {
        base_style.bg(Color::White).fg(Color::Black)
    } else if app.is_winning_cell(index) {
        base_style.bg(Color::Green)
    } else {
        base_style
    };

    let paragraph = Paragraph::new(Line::from(Span::styled(text, style))).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn draw_separator(frame: &mut Frame, area: Rect) {
    let sep = Paragraph::new("─".repeat(area.width as usize)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, area);
}

fn draw_separator_vertical(frame: &mut Frame, area: Rect) {
    let sep = Paragraph::new("│").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, area);
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{GameView, Mode};
    use crate::room::RoomCode;
    use ratatui::{Terminal, backend::TestBackend};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_menu_lists_entries() {
        let screen = render(&App::new());
        assert!(screen.contains("Play vs CPU"));
        assert!(screen.contains("Join Game"));
    }

    #[test]
    fn test_hosting_shows_room_code() {
        let mut app = App::new();
        app.on_view_changed(View::Hosting);
        app.on_room_ready(&RoomCode::parse("482913").unwrap());
        assert!(render(&app).contains("482913"));
    }

    #[test]
    fn test_game_shows_marks_and_score() {
        let mut app = App::new();
        app.on_view_changed(View::Game {
            mode: Mode::LocalVsCpu,
            my_symbol: None,
        });
        app.on_cell_updated(0, Symbol::X);
        app.on_score_changed(3, 1);
        let screen = render(&app);
        assert!(screen.contains(" X "));
        assert!(screen.contains("X (You): 3"));
        assert!(screen.contains("O (CPU): 1"));
    }
}
