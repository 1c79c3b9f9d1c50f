use std::{cmp, io, path::PathBuf, thread, time::Duration, time::Instant};

use anyhow::{Context, Result};
use backlog_core::{
    models::MAX_NOTES_LEN, palette, AppConfig, Backlog, BacklogError, Cover, Debouncer, Game,
    GameForm, Store, Theme, ViewMode,
};
use chrono::{Local, TimeZone};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);
const MAX_INPUT_LEN: usize = 200;
const LIBRARY_ROUTE: &str = "#/library";
const GAME_ROUTE_PREFIX: &str = "#/game/";

#[derive(Debug, Clone)]
struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    favorite: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                selection_bg: Color::DarkGray,
                favorite: Color::Yellow,
            },
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::Gray,
                selection_bg: Color::Gray,
                favorite: Color::Magenta,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    Offer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptKind {
    AddGame,
    Notes { game_id: String },
    Tag { game_id: String },
}

/// Single-line or multi-line text input; `cursor` counts chars, not bytes.
#[derive(Debug, Clone)]
struct TextPrompt {
    kind: PromptKind,
    input: String,
    cursor: usize,
}

impl TextPrompt {
    fn new(kind: PromptKind, initial: String) -> Self {
        let cursor = initial.chars().count();
        Self {
            kind,
            input: initial,
            cursor,
        }
    }

    fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::AddGame => "Add Game (title | platform | status | playtime)",
            PromptKind::Notes { .. } => "Notes",
            PromptKind::Tag { .. } => "Toggle Tag",
        }
    }

    fn multiline(&self) -> bool {
        matches!(self.kind, PromptKind::Notes { .. })
    }

    fn max_len(&self) -> usize {
        if self.multiline() {
            MAX_NOTES_LEN
        } else {
            MAX_INPUT_LEN
        }
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) -> bool {
        let allowed = !ch.is_control() || (ch == '\n' && self.multiline());
        if !allowed || self.char_len() >= self.max_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
        true
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
        true
    }

    /// Line and column of the cursor, both counted in chars.
    fn cursor_position(&self) -> (usize, usize) {
        let before = &self.input[..self.byte_index(self.cursor)];
        let line = before.matches('\n').count();
        let column = before
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count())
            .unwrap_or(0);
        (line, column)
    }

    fn value(&self) -> String {
        self.input.trim().to_string()
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    ImportLoaded(PathBuf, Result<String>),
}

/// Terminal front-end over a [`Backlog`].
pub struct BacklogApp {
    backlog: Backlog,
    config: AppConfig,
    state: UiState,
    prompt: Option<TextPrompt>,
    search_input: String,
    search: Debouncer<String>,
    notes: Debouncer<(String, String)>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    pending_import: bool,
    palette: Palette,
}

impl BacklogApp {
    pub fn new(backlog: Backlog, config: AppConfig) -> Self {
        let palette = Palette::for_theme(backlog.preferences().theme);
        let search_input = backlog.preferences().search.clone();
        Self {
            search: Debouncer::new(config.search_debounce()),
            notes: Debouncer::new(config.notes_debounce()),
            backlog,
            config,
            state: UiState::default(),
            prompt: None,
            search_input,
            event_tx: None,
            pending_import: false,
            palette,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh();
        self.restore_route();
        if self.backlog.should_offer_samples() {
            self.state.mode = Mode::Offer;
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
            if self.state.should_quit {
                break;
            }
        }

        self.flush_pending_edits();
        self.remember_route();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                if let Err(err) = self.handle_key(key) {
                    self.report(err);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick(Instant::now());
                true
            }
            Some(AppEvent::ImportLoaded(path, result)) => {
                self.pending_import = false;
                self.finish_import(path, result);
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        if let Some(search) = self.search.take_due(now) {
            self.commit_search(search);
        }
        if let Some((game_id, notes)) = self.notes.take_due(now) {
            self.commit_notes(&game_id, notes);
        }
    }

    fn commit_search(&mut self, search: String) {
        match self.backlog.set_search(search) {
            Ok(()) => self.refresh(),
            Err(err) => self.report(err),
        }
    }

    fn commit_notes(&mut self, game_id: &str, notes: String) {
        match self.backlog.set_notes(game_id, notes) {
            Ok(_) => {
                self.refresh();
                self.state.set_status("Notes saved".to_string());
            }
            Err(err) if err.is_not_found() => {
                self.state
                    .set_status("Game no longer exists; notes discarded".to_string());
            }
            Err(err) => self.report(err),
        }
    }

    fn flush_pending_edits(&mut self) {
        if let Some(search) = self.search.flush() {
            self.commit_search(search);
        }
        if let Some((game_id, notes)) = self.notes.flush() {
            self.commit_notes(&game_id, notes);
        }
    }

    fn refresh(&mut self) {
        let selected = self.state.current_game().map(|game| game.id.clone());
        self.state.set_games(self.backlog.visible());
        if let Some(id) = selected {
            self.state.select_game(&id);
        }
        self.state.clamp_cursor();
        self.palette = Palette::for_theme(self.backlog.preferences().theme);
    }

    fn restore_route(&mut self) {
        let route = self.backlog.preferences().last_route.clone();
        let Some(game_id) = route.strip_prefix(GAME_ROUTE_PREFIX) else {
            return;
        };
        if self.backlog.game(game_id).is_none() {
            warn!(game_id, "Last visited game no longer exists");
            self.state
                .set_status("Last viewed game was removed; showing the library".to_string());
            if let Err(err) = self.backlog.set_last_route(LIBRARY_ROUTE) {
                self.report(err);
            }
        } else if !self.state.select_game(game_id) {
            self.state
                .set_status("Last viewed game is hidden by the current filters".to_string());
        }
    }

    fn remember_route(&mut self) {
        let route = match self.state.current_game() {
            Some(game) => format!("{GAME_ROUTE_PREFIX}{}", game.id),
            None => LIBRARY_ROUTE.to_string(),
        };
        if let Err(err) = self.backlog.set_last_route(route) {
            error!(?err, "Failed to remember last route");
        }
    }

    fn report(&mut self, err: BacklogError) {
        match &err {
            BacklogError::NotFound { .. } => {
                self.refresh();
                self.state
                    .set_status("That game is gone; list refreshed".to_string());
            }
            BacklogError::InvalidFormat(_) | BacklogError::RequiredFieldMissing(_) => {
                self.state.set_status(err.to_string());
            }
            BacklogError::Storage(_) => {
                error!(?err, "Storage failure");
                self.state.set_status(format!("Save failed: {err}"));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<(), BacklogError> {
        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }
        match self.state.mode {
            Mode::Offer => self.handle_offer_key(key),
            Mode::Search => self.handle_search_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_offer_key(&mut self, key: KeyEvent) -> Result<(), BacklogError> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let loaded = self.backlog.load_samples()?;
                self.refresh();
                self.state
                    .set_status(format!("Loaded {loaded} sample games"));
                self.state.mode = Mode::Browse;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.backlog.dismiss_samples()?;
                self.state
                    .set_status("Press 'a' to add your first game".to_string());
                self.state.mode = Mode::Browse;
            }
            KeyCode::Char('q') => self.state.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<(), BacklogError> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                if let Some(search) = self.search.flush() {
                    self.commit_search(search);
                }
                self.state
                    .set_status(format!("Search: {}", self.search_input));
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.search.push(self.search_input.clone(), Instant::now());
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.search_input.push(ch);
                self.search.push(self.search_input.clone(), Instant::now());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<(), BacklogError> {
        let selected = self.state.current_game().map(|game| game.id.clone());
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Char('g') => self.state.move_to(0),
            KeyCode::Char('G') => self.state.move_to_end(),
            KeyCode::Home => self.state.move_to(0),
            KeyCode::End => self.state.move_to_end(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Search;
                self.state.set_status("Type to search titles, notes and tags".to_string());
            }
            KeyCode::Char('a') => {
                self.prompt = Some(TextPrompt::new(PromptKind::AddGame, String::new()));
            }
            KeyCode::Char('n') => {
                if let Some(game) = self.state.current_game() {
                    let kind = PromptKind::Notes {
                        game_id: game.id.clone(),
                    };
                    self.prompt = Some(TextPrompt::new(kind, game.notes.clone()));
                }
            }
            KeyCode::Char('t') => {
                if let Some(game_id) = selected {
                    self.prompt = Some(TextPrompt::new(PromptKind::Tag { game_id }, String::new()));
                }
            }
            KeyCode::Char('f') => {
                if let Some(id) = selected {
                    let game = self.backlog.toggle_favorite(&id)?;
                    let label = if game.favorite { "Favorited" } else { "Unfavorited" };
                    self.state.set_status(format!("{label} {}", game.title));
                    self.refresh();
                }
            }
            KeyCode::Char('c') => {
                if let Some(id) = selected {
                    let game = self.backlog.cycle_status(&id)?;
                    self.state
                        .set_status(format!("{} is now {}", game.title, game.status));
                    self.refresh();
                }
            }
            KeyCode::Char('p') => {
                if let Some(id) = selected {
                    let game = self.backlog.quick_mark_played(&id)?;
                    self.state.set_status(format!("Marked {} as played", game.title));
                    self.refresh();
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = selected {
                    if self.backlog.delete_game(&id)? {
                        self.state.set_status("Game deleted".to_string());
                    }
                    self.refresh();
                }
            }
            KeyCode::Char('s') => {
                let next = self.backlog.preferences().sort_field.next();
                self.backlog.set_sort(next)?;
                self.refresh();
                self.state.set_status(format!("Sorted by {next}"));
            }
            KeyCode::Char('o') => {
                self.backlog.toggle_sort_direction()?;
                self.refresh();
            }
            KeyCode::Char('F') => {
                self.backlog
                    .update_filters(|filters| filters.favorites_only = !filters.favorites_only)?;
                self.refresh();
            }
            KeyCode::Char('X') => {
                self.backlog.clear_filters()?;
                self.search_input.clear();
                self.search.cancel();
                self.refresh();
                self.state.set_status("Filters cleared".to_string());
            }
            KeyCode::Char('T') => {
                self.backlog.toggle_theme()?;
                self.refresh();
            }
            KeyCode::Char('v') => {
                self.backlog.toggle_view_mode()?;
                self.refresh();
            }
            KeyCode::Char('e') => {
                let path = self.config.export_path();
                self.backlog.export_to_file(&path)?;
                self.state
                    .set_status(format!("Exported to {}", path.display()));
            }
            KeyCode::Char('i') => self.start_import(),
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<(), BacklogError> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        let mut submit = false;
        let mut close = false;
        let edited = match key.code {
            KeyCode::Esc => {
                close = true;
                false
            }
            KeyCode::Enter if prompt.multiline() => prompt.insert('\n'),
            KeyCode::Enter => {
                submit = true;
                false
            }
            KeyCode::Left => {
                prompt.move_cursor(-1);
                false
            }
            KeyCode::Right => {
                prompt.move_cursor(1);
                false
            }
            KeyCode::Home => {
                prompt.move_home();
                false
            }
            KeyCode::End => {
                prompt.move_end();
                false
            }
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                prompt.insert(ch)
            }
            _ => false,
        };

        if edited {
            if let PromptKind::Notes { game_id } = &prompt.kind {
                self.notes
                    .push((game_id.clone(), prompt.input.clone()), Instant::now());
            }
        }

        if close || submit {
            let Some(prompt) = self.prompt.take() else {
                return Ok(());
            };
            return self.finish_prompt(prompt, submit);
        }
        Ok(())
    }

    fn finish_prompt(&mut self, prompt: TextPrompt, submit: bool) -> Result<(), BacklogError> {
        let value = prompt.value();
        match prompt.kind {
            PromptKind::Notes { .. } => {
                // Leaving the editor always keeps the last edit.
                if let Some((game_id, notes)) = self.notes.flush() {
                    self.commit_notes(&game_id, notes);
                }
            }
            PromptKind::AddGame if submit => {
                let fields = add_game_form(&value).validate()?;
                let game = self.backlog.create_game(fields)?;
                self.refresh();
                self.state.select_game(&game.id);
                self.state.set_status(format!("Added {}", game.title));
            }
            PromptKind::Tag { game_id } if submit => {
                if value.is_empty() {
                    return Err(BacklogError::RequiredFieldMissing("name"));
                }
                let tag = self.backlog.find_or_create_tag(&value)?;
                let game = self.backlog.toggle_game_tag(&game_id, &tag.id)?;
                let verb = if game.has_tag(&tag.id) { "Tagged" } else { "Untagged" };
                self.refresh();
                self.state
                    .set_status(format!("{verb} {} with {}", game.title, tag.name));
            }
            _ => self.state.set_status("Cancelled".to_string()),
        }
        Ok(())
    }

    fn start_import(&mut self) {
        if self.pending_import {
            self.state.set_status("An import is already running".to_string());
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let path = self.config.export_path();
        self.pending_import = true;
        self.state
            .set_status(format!("Importing {}...", path.display()));
        tokio::spawn(async move {
            let result = Store::read_snapshot_file(&path).await;
            let _ = tx.send(AppEvent::ImportLoaded(path, result)).await;
        });
    }

    fn finish_import(&mut self, path: PathBuf, result: Result<String>) {
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                error!(?err, "Import read failed");
                self.state.set_status(format!("Import failed: {err}"));
                return;
            }
        };
        self.search.cancel();
        self.notes.cancel();
        match self.backlog.import_snapshot(&text) {
            Ok(()) => {
                self.search_input = self.backlog.preferences().search.clone();
                self.refresh();
                info!(path = %path.display(), "Import applied");
                self.state.set_status(format!(
                    "Imported {} games from {}",
                    self.backlog.games().len(),
                    path.display()
                ));
            }
            Err(err) => self.report(err),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.palette.bg).fg(self.palette.fg)),
            size,
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(4)])
            .split(size);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[0]);

        self.render_game_list(frame, body[0]);
        self.render_game_info(frame, body[1]);
        self.render_status(frame, chunks[1]);

        if self.state.mode == Mode::Offer {
            self.render_offer(frame);
        }
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        let view_mode = self.backlog.preferences().view_mode;
        let rows_per_item = if view_mode == ViewMode::Grid { 2 } else { 1 };
        self.state.list_height = (area.height.saturating_sub(2) as usize / rows_per_item).max(1);
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let mut list_state = ListState::default();
        let games = self.state.visible_games(self.state.list_height);
        if !games.is_empty() {
            list_state.select(Some(self.state.cursor.saturating_sub(self.state.offset)));
        }
        let items: Vec<ListItem> = games
            .iter()
            .map(|game| {
                let star = if game.favorite {
                    Span::styled("★ ", Style::default().fg(self.palette.favorite))
                } else {
                    Span::raw("  ")
                };
                let title = Span::styled(
                    game.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                );
                let status = Span::styled(
                    format!(" [{}]", game.status),
                    Style::default().fg(self.palette.muted),
                );
                let mut lines = vec![Line::from(vec![star, title, status])];
                if view_mode == ViewMode::Grid {
                    lines.push(Line::from(Span::styled(
                        format!("  {} · {}", game.platform, game.playtime),
                        Style::default().fg(self.palette.muted),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();

        let prefs = self.backlog.preferences();
        let arrow = match prefs.sort_direction {
            backlog_core::SortDirection::Asc => "↑",
            backlog_core::SortDirection::Desc => "↓",
        };
        let mut title = format!(
            "Games {}/{} · {} {arrow}",
            self.state.games.len(),
            self.backlog.games().len(),
            prefs.sort_field
        );
        if prefs.filters.favorites_only {
            title.push_str(" · ★ only");
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.palette.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_game_info(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(game) = self.state.current_game() else {
            let empty = if self.backlog.games().is_empty() {
                "No games yet. Press 'a' to add one."
            } else {
                "No games match the current filters."
            };
            frame.render_widget(Paragraph::new(empty).block(block), area);
            return;
        };

        let label = |name: &str| {
            Span::styled(
                format!("{name:<10}"),
                Style::default().fg(self.palette.accent),
            )
        };
        let mut lines = vec![
            Line::from(Span::styled(
                game.title.clone(),
                Style::default()
                    .fg(self.palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![label("Cover"), cover_span(game)]),
            Line::from(vec![label("Platform"), Span::raw(game.platform.label())]),
            Line::from(vec![label("Status"), Span::raw(game.status.label())]),
            Line::from(vec![label("Playtime"), Span::raw(game.playtime.label())]),
            Line::from(vec![label("Released"), Span::raw(game.release_label().to_string())]),
            Line::from(vec![label("Added"), Span::raw(format_timestamp(game.date_added))]),
            Line::from(vec![label("Updated"), Span::raw(format_timestamp(game.date_updated))]),
        ];

        let mut tag_spans = vec![label("Tags")];
        for tag in self.backlog.tags_for(game) {
            let color = palette::parse_hex(&tag.color)
                .map(|(r, g, b)| Color::Rgb(r, g, b))
                .unwrap_or(self.palette.accent);
            tag_spans.push(Span::styled(
                format!(" {} ", tag.display_name()),
                Style::default().bg(color).fg(Color::Black),
            ));
            tag_spans.push(Span::raw(" "));
        }
        lines.push(Line::from(tag_spans));
        lines.push(Line::from(""));

        let notes = match &self.prompt {
            Some(TextPrompt {
                kind: PromptKind::Notes { game_id },
                input,
                ..
            }) if *game_id == game.id => input.clone(),
            _ => game.notes.clone(),
        };
        if notes.is_empty() {
            lines.push(Line::from(Span::styled(
                "No notes ('n' to edit)",
                Style::default().fg(self.palette.muted),
            )));
        } else {
            lines.extend(notes.lines().map(|line| Line::from(line.to_string())));
        }

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Search {
            format!("Search: {}_", self.search_input)
        } else {
            self.state.status.clone()
        };
        let stats = self.backlog.stats();
        let secondary = format!(
            "{} games · {} favorites · {:.0}% played   [/]search [a]dd [n]otes [t]ag [f]av [c]ycle [p]layed [x]del [s]ort [o]rder [F]avs [X]clear [e]xport [i]mport [q]uit",
            stats.total,
            stats.favorites,
            stats.completion_ratio() * 100.0
        );
        let paragraph = Paragraph::new(vec![Line::from(primary), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_offer(&self, frame: &mut Frame) {
        let area = centered_rect(52, 7, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from("Your backlog is empty."),
            Line::from("Load a small sample library to explore?"),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" load samples  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" start empty"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("Welcome"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &TextPrompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(70_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let rows = if prompt.multiline() { 8 } else { 1 };
        let area = centered_rect(width, rows as u16 + 5, frame_area);
        frame.render_widget(Clear, area);

        let (cursor_line, cursor_column) = prompt.cursor_position();
        let first = cursor_line.saturating_sub(rows - 1);
        let mut lines: Vec<Line> = prompt
            .input
            .split('\n')
            .enumerate()
            .skip(first)
            .take(rows)
            .map(|(index, text)| {
                let marker = if index == 0 { "> " } else { "  " };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(self.palette.accent)),
                    Span::raw(text.to_string()),
                ])
            })
            .collect();
        lines.push(Line::from(""));
        let helper = if prompt.multiline() {
            vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" new line  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" done (saves automatically)"),
            ]
        } else {
            vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" confirm  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" close"),
            ]
        };
        lines.push(Line::from(helper));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(prompt.title()));
        frame.render_widget(paragraph, area);

        let cursor_x = (area.x as usize + 3 + cursor_column)
            .min((area.x + area.width.saturating_sub(2)) as usize) as u16;
        let cursor_y = area.y + 1 + (cursor_line - first) as u16;
        frame.set_cursor(cursor_x, cursor_y);
    }
}

/// Parses `title | platform | status | playtime`; omitted parts keep the defaults.
fn add_game_form(input: &str) -> GameForm {
    let mut form = GameForm::with_defaults();
    let mut parts = input.split('|').map(str::trim);
    form.title = parts.next().unwrap_or_default().to_string();
    for (slot, part) in [&mut form.platform, &mut form.status, &mut form.playtime]
        .into_iter()
        .zip(parts)
    {
        if !part.is_empty() {
            *slot = part.to_string();
        }
    }
    form
}

fn cover_span(game: &Game) -> Span<'static> {
    match game.cover() {
        Cover::Url(url) => Span::raw(url),
        Cover::Placeholder { initials, color } => {
            let bg = palette::parse_hex(&color)
                .map(|(r, g, b)| Color::Rgb(r, g, b))
                .unwrap_or(Color::Gray);
            Span::styled(
                format!(" {initials} "),
                Style::default()
                    .bg(bg)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
        }
    }
}

fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    games: Vec<Game>,
    cursor: usize,
    offset: usize,
    list_height: usize,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_games(&mut self, games: Vec<Game>) {
        self.games = games;
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.games.is_empty() {
            return;
        }
        let last = self.games.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
        self.ensure_cursor_visible();
    }

    fn move_to(&mut self, index: usize) {
        if self.games.is_empty() {
            return;
        }
        self.cursor = index.min(self.games.len() - 1);
        self.ensure_cursor_visible();
    }

    fn move_to_end(&mut self) {
        self.move_to(usize::MAX);
    }

    fn page_down(&mut self) {
        let delta = self.list_height.min(self.games.len());
        self.move_cursor(delta as isize);
    }

    fn page_up(&mut self) {
        let delta = self.list_height.min(self.games.len());
        self.move_cursor(-(delta as isize));
    }

    fn visible_games(&self, height: usize) -> &[Game] {
        if self.games.is_empty() {
            return &[];
        }
        let start = self.offset.min(self.games.len());
        let end = (start + height).min(self.games.len());
        &self.games[start..end]
    }

    fn current_game(&self) -> Option<&Game> {
        self.games.get(self.cursor)
    }

    fn select_game(&mut self, game_id: &str) -> bool {
        match self.games.iter().position(|game| game.id == game_id) {
            Some(pos) => {
                self.cursor = pos;
                self.ensure_cursor_visible();
                true
            }
            None => false,
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self) {
        if self.games.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.games.len() {
            self.cursor = self.games.len() - 1;
        }
    }

    fn ensure_cursor_visible(&mut self) {
        if self.games.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        let max_offset = self.games.len().saturating_sub(height);
        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_core::{MemoryStore, NewGame, Platform, Status};

    fn games(count: usize) -> Vec<Game> {
        let mut backlog = Backlog::open(Store::new(MemoryStore::new()));
        (0..count)
            .map(|index| {
                backlog
                    .create_game(NewGame::titled(format!("Game {index}")))
                    .expect("create game")
            })
            .collect()
    }

    #[test]
    fn cursor_stays_in_bounds_and_visible() {
        let mut state = UiState {
            list_height: 3,
            ..UiState::default()
        };
        state.set_games(games(10));
        state.move_cursor(5);
        assert_eq!(state.cursor, 5);
        assert_eq!(state.offset, 3);
        state.move_to_end();
        assert_eq!(state.cursor, 9);
        assert_eq!(state.visible_games(3).len(), 3);
        state.move_cursor(-100);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.offset, 0);
    }

    #[test]
    fn select_game_finds_by_id() {
        let mut state = UiState::default();
        let list = games(3);
        let target = list[2].id.clone();
        state.set_games(list);
        assert!(state.select_game(&target));
        assert_eq!(
            state.current_game().map(|game| game.id.as_str()),
            Some(target.as_str())
        );
        assert!(!state.select_game("missing"));

        state.set_games(games(1));
        state.clamp_cursor();
        assert_eq!(state.cursor, 0);
    }

    fn app_with(games: &[NewGame]) -> BacklogApp {
        let mut backlog = Backlog::open(Store::new(MemoryStore::new()));
        for game in games {
            backlog.create_game(game.clone()).expect("create game");
        }
        let mut app = BacklogApp::new(backlog, AppConfig::default());
        app.refresh();
        app
    }

    fn press(app: &mut BacklogApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .expect("key handled");
    }

    fn type_text(app: &mut BacklogApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn prompt_edits_by_char() {
        let mut prompt = TextPrompt::new(PromptKind::AddGame, "Pokmon".to_string());
        prompt.move_cursor(-3);
        assert!(prompt.insert('é'));
        assert_eq!(prompt.input, "Pokémon");
        assert_eq!(prompt.cursor, 4);
        assert!(prompt.backspace());
        assert_eq!(prompt.input, "Pokmon");
        assert!(prompt.insert('é'));
        prompt.move_home();
        assert!(!prompt.backspace());
        assert!(prompt.delete());
        assert_eq!(prompt.input, "okémon");
        assert!(!prompt.insert('\n'));
        assert!(!prompt.insert('\t'));
        prompt.move_end();
        assert!(prompt.insert(' '));
        assert_eq!(prompt.value(), "okémon");
    }

    #[test]
    fn notes_prompt_keeps_lines_and_cursor_position() {
        let kind = PromptKind::Notes {
            game_id: "g".to_string(),
        };
        let mut prompt = TextPrompt::new(kind, "Pokémon run\nnext".to_string());
        assert_eq!(prompt.cursor_position(), (1, 4));
        assert!(prompt.insert('\n'));
        assert_eq!(prompt.cursor_position(), (2, 0));
        prompt.move_home();
        assert_eq!(prompt.cursor_position(), (0, 0));
        assert_eq!(prompt.input, "Pokémon run\nnext\n");
    }

    #[test]
    fn notes_editor_round_trips_existing_text() {
        let mut app = app_with(&[NewGame {
            notes: "Pokémon run\nnext: Elite 4".to_string(),
            ..NewGame::titled("Pokémon Emerald")
        }]);
        let id = app.state.current_game().expect("game").id.clone();

        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::End);
        press(&mut app, KeyCode::Char('!'));
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Beat Wallace");
        assert!(app.prompt.is_some());
        press(&mut app, KeyCode::Esc);

        assert!(app.prompt.is_none());
        assert!(!app.notes.is_pending());
        let game = app.backlog.game(&id).expect("game");
        assert_eq!(game.notes, "Pokémon run\nnext: Elite 4!\nBeat Wallace");
    }

    #[test]
    fn tag_prompt_toggles_tag_on_selected_game() {
        let mut app = app_with(&[NewGame::titled("It Takes Two")]);
        let id = app.state.current_game().expect("game").id.clone();

        press(&mut app, KeyCode::Char('t'));
        type_text(&mut app, "Co-op");
        press(&mut app, KeyCode::Enter);
        assert!(app.prompt.is_none());
        let tag = app.backlog.tags()[0].clone();
        assert_eq!(tag.name, "Co-op");
        assert!(app.backlog.game(&id).expect("game").has_tag(&tag.id));

        press(&mut app, KeyCode::Char('t'));
        type_text(&mut app, "co-op");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.backlog.tags().len(), 1);
        assert!(!app.backlog.game(&id).expect("game").has_tag(&tag.id));

        press(&mut app, KeyCode::Char('t'));
        let empty = app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(matches!(
            empty,
            Err(BacklogError::RequiredFieldMissing("name"))
        ));
        assert_eq!(app.backlog.tags().len(), 1);
    }

    #[test]
    fn malformed_import_keeps_state() {
        let mut app = app_with(&[NewGame::titled("Celeste")]);
        let path = PathBuf::from("backlog-export.json");

        app.finish_import(path.clone(), Ok(r#"{"foo": 1}"#.to_string()));
        assert_eq!(app.backlog.games().len(), 1);
        assert!(app.state.status.starts_with("invalid import format"));

        app.finish_import(path, Err(anyhow::anyhow!("gone")));
        assert!(app.state.status.starts_with("Import failed"));
        assert_eq!(app.state.games.len(), 1);
    }

    #[test]
    fn add_prompt_fills_form_selections() {
        let fields = add_game_form("Hades | Switch | Played")
            .validate()
            .expect("valid form");
        assert_eq!(fields.title, "Hades");
        assert_eq!(fields.platform, Platform::Switch);
        assert_eq!(fields.status, Status::Played);

        let defaults = add_game_form("Celeste").validate().expect("valid form");
        assert_eq!(defaults.platform, Platform::default());

        let err = add_game_form("Celeste | Dreamcast").validate().unwrap_err();
        assert!(matches!(err, BacklogError::RequiredFieldMissing("platform")));
        assert!(add_game_form("  ").validate().is_err());
    }

    #[test]
    fn ticks_commit_debounced_search() {
        let config = AppConfig::default();
        let backlog = Backlog::open(Store::new(MemoryStore::new()));
        let mut app = BacklogApp::new(backlog, config);
        let start = Instant::now();
        app.search_input = "hades".to_string();
        app.search.push(app.search_input.clone(), start);
        app.handle_tick(start);
        assert_eq!(app.backlog.preferences().search, "");
        let due = start + app.search.delay();
        app.handle_tick(due);
        assert_eq!(app.backlog.preferences().search, "hades");
    }
}
