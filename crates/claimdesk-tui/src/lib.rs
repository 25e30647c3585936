// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use claimdesk_app::{
    BLANK, BrowseCommand, BrowseEvent, BrowseScreen, ColumnDefinition, EntityKind, FetchError,
    LoadState, OpenPopup, PopupCommand, PopupMode, QueryDescriptor, RelatedColumnManager,
    RelatedColumnSpec, RequestToken, ResponseOutcome, ResultPage, ServerParam, display_cell,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use std::collections::BTreeMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Page sizes `+` and `-` cycle through.
pub const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

const FILTER_MARK_ACTIVE: &str = "▼";
const LINK_ARROW: &str = "→";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Host services the browse screen needs: page fetches and the related
/// column catalog.
pub trait BrowseRuntime<P: ServerParam> {
    fn fetch_page(&mut self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError>;
    fn list_related_columns(&mut self, entity: EntityKind) -> Result<Vec<RelatedColumnSpec>>;

    /// Runs a fetch and reports it on `tx`. The default runs inline;
    /// runtimes backed by a network client move the work to a thread.
    fn spawn_fetch(
        &mut self,
        token: RequestToken,
        query: QueryDescriptor<P>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self.fetch_page(&query);
        tx.send(InternalEvent::PageLoaded { token, result })
            .map_err(|_| anyhow!("page event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageLoaded {
        token: RequestToken,
        result: Result<ResultPage, FetchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct PopupUiState {
    cursor: usize,
    search_focus: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ColumnFinderUiState {
    visible: bool,
    query: String,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct RelatedPickerUiState {
    visible: bool,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SearchInputUiState {
    visible: bool,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected_row: usize,
    selected_col: usize,
    popup: PopupUiState,
    column_finder: ColumnFinderUiState,
    related_picker: RelatedPickerUiState,
    search_input: SearchInputUiState,
    help_visible: bool,
    status: Option<String>,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RelatedPickerEntry {
    table: String,
    key: String,
    label: String,
    added: bool,
}

/// Runs the interactive browse screen until the user quits. The screen is
/// disposed on the way out so in-flight fetches land nowhere.
pub fn run_browser<P, R>(screen: &mut BrowseScreen<P>, runtime: &mut R) -> Result<()>
where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    start_browse(screen, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(screen, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, screen, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(screen, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    screen.dispose();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn start_browse<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    match runtime.list_related_columns(screen.entity()) {
        Ok(specs) => screen.set_related_catalog(specs),
        Err(error) => emit_status(
            view_data,
            internal_tx,
            format!("related columns unavailable: {error:#}"),
        ),
    }
    dispatch(screen, runtime, view_data, internal_tx, BrowseCommand::Load);
}

fn process_internal_events<P: ServerParam>(
    screen: &mut BrowseScreen<P>,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PageLoaded { token, result } => {
                let outcome = screen.receive(token, result);
                debug!(token = token.get(), ?outcome, "page response handled");
                if outcome == ResponseOutcome::Applied {
                    clamp_table_cursor(screen, view_data);
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

/// Sends `command` to the screen and acts on what comes back.
fn dispatch<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: BrowseCommand,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    for event in screen.dispatch(command) {
        match event {
            BrowseEvent::ReloadRequested(request) => {
                let token = request.token;
                if let Err(error) = runtime.spawn_fetch(token, request.query, internal_tx.clone())
                {
                    screen.receive(token, Err(FetchError::failed(format!("{error:#}"))));
                }
            }
            BrowseEvent::StatusUpdated(message) => emit_status(view_data, internal_tx, message),
            BrowseEvent::PopupOpened(_) => view_data.popup = PopupUiState::default(),
            BrowseEvent::ColumnsChanged => clamp_table_cursor(screen, view_data),
            BrowseEvent::PopupClosed | BrowseEvent::FiltersChanged => {}
        }
    }
}

fn handle_key_event<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool
where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    if matches!(key.code, KeyCode::Char('c' | 'q'))
        && key.modifiers.contains(KeyModifiers::CONTROL)
    {
        return true;
    }

    if screen.popup().is_open() {
        handle_popup_key(screen, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.search_input.visible {
        handle_search_input_key(screen, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.column_finder.visible {
        handle_column_finder_key(screen, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.related_picker.visible {
        handle_related_picker_key(screen, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.selected_row = view_data.selected_row.saturating_add(1);
            clamp_table_cursor(screen, view_data);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.selected_row = view_data.selected_row.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            view_data.selected_col = view_data.selected_col.saturating_add(1);
            clamp_table_cursor(screen, view_data);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.selected_col = view_data.selected_col.saturating_sub(1);
        }
        KeyCode::Char('f') | KeyCode::Enter => {
            if let Some(key) = selected_column_key(screen, view_data) {
                dispatch(
                    screen,
                    runtime,
                    view_data,
                    internal_tx,
                    BrowseCommand::OpenFilter(key),
                );
            }
        }
        KeyCode::Char('c') => {
            if screen.registry().visible_columns().len() <= 1 {
                emit_status(view_data, internal_tx, "cannot hide the last visible column");
            } else if let Some(key) = selected_column_key(screen, view_data) {
                dispatch(
                    screen,
                    runtime,
                    view_data,
                    internal_tx,
                    BrowseCommand::SetVisible {
                        column: key,
                        visible: false,
                    },
                );
            }
        }
        KeyCode::Char('C') => {
            dispatch(screen, runtime, view_data, internal_tx, BrowseCommand::ShowAll);
        }
        KeyCode::Char('/') => {
            view_data.column_finder = ColumnFinderUiState {
                visible: true,
                ..ColumnFinderUiState::default()
            };
        }
        KeyCode::Char('r') => {
            view_data.related_picker = RelatedPickerUiState {
                visible: true,
                cursor: 0,
            };
            if related_picker_entries(screen).is_empty() {
                emit_status(view_data, internal_tx, "no related columns advertised");
            }
        }
        KeyCode::Char('R') => {
            dispatch(screen, runtime, view_data, internal_tx, BrowseCommand::Reload);
        }
        KeyCode::Char(']') => {
            dispatch(screen, runtime, view_data, internal_tx, BrowseCommand::NextPage);
        }
        KeyCode::Char('[') => {
            dispatch(screen, runtime, view_data, internal_tx, BrowseCommand::PrevPage);
        }
        KeyCode::Char('+') => {
            let size = cycle_page_size(screen.pages().page_size(), true);
            dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::SetPageSize(size),
            );
            emit_status(view_data, internal_tx, format!("page size {size}"));
        }
        KeyCode::Char('-') => {
            let size = cycle_page_size(screen.pages().page_size(), false);
            dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::SetPageSize(size),
            );
            emit_status(view_data, internal_tx, format!("page size {size}"));
        }
        KeyCode::Char('x') => {
            if screen.filters().is_empty() {
                emit_status(view_data, internal_tx, "no filters to clear");
            } else {
                dispatch(
                    screen,
                    runtime,
                    view_data,
                    internal_tx,
                    BrowseCommand::ClearAllFilters,
                );
            }
        }
        KeyCode::Char('s') => {
            view_data.search_input = SearchInputUiState {
                visible: true,
                text: screen.search_text().to_owned(),
            };
        }
        KeyCode::Char('?') => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn handle_popup_key<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    let Some(popup) = screen.popup().as_open() else {
        return;
    };
    let command = popup_command_for_key(popup, &mut view_data.popup, key);
    if let Some(command) = command {
        dispatch(
            screen,
            runtime,
            view_data,
            internal_tx,
            BrowseCommand::Popup(command),
        );
    }

    if let Some(popup) = screen.popup().as_open() {
        let visible = popup.visible_candidates().len();
        view_data.popup.cursor = view_data.popup.cursor.min(visible.saturating_sub(1));
    } else {
        view_data.popup = PopupUiState::default();
    }
}

fn popup_command_for_key(
    popup: &OpenPopup,
    ui: &mut PopupUiState,
    key: KeyEvent,
) -> Option<PopupCommand> {
    if ui.search_focus {
        let mut search = popup.search().to_owned();
        return match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                ui.search_focus = false;
                None
            }
            KeyCode::Backspace => {
                search.pop();
                Some(PopupCommand::SetSearch(search))
            }
            KeyCode::Char(ch) => {
                search.push(ch);
                ui.cursor = 0;
                Some(PopupCommand::SetSearch(search))
            }
            _ => None,
        };
    }

    match key.code {
        KeyCode::Esc => return Some(PopupCommand::Cancel),
        KeyCode::Enter => return Some(PopupCommand::Apply),
        KeyCode::Tab => return Some(PopupCommand::ToggleMode),
        _ => {}
    }

    if popup.mode() != PopupMode::Values {
        let mut text = popup.text().to_owned();
        return match key.code {
            KeyCode::Backspace => {
                text.pop();
                Some(PopupCommand::SetText(text))
            }
            KeyCode::Char(ch) => {
                text.push(ch);
                Some(PopupCommand::SetText(text))
            }
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            ui.cursor = ui.cursor.saturating_add(1);
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            ui.cursor = ui.cursor.saturating_sub(1);
            None
        }
        KeyCode::Char(' ') => popup
            .visible_candidates()
            .get(ui.cursor)
            .map(|value| PopupCommand::Toggle((*value).to_owned())),
        KeyCode::Char('a') => Some(PopupCommand::SelectAll),
        KeyCode::Char('n') => Some(PopupCommand::SelectNone),
        KeyCode::Char('/') => {
            ui.search_focus = true;
            None
        }
        _ => None,
    }
}

fn handle_search_input_key<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    match key.code {
        KeyCode::Esc => view_data.search_input = SearchInputUiState::default(),
        KeyCode::Enter => {
            let text = std::mem::take(&mut view_data.search_input).text;
            dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::SetSearchText(text.trim().to_owned()),
            );
        }
        KeyCode::Backspace => {
            view_data.search_input.text.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.search_input.text.clear();
        }
        KeyCode::Char(ch) => view_data.search_input.text.push(ch),
        _ => {}
    }
}

struct ColumnFinderMatch {
    key: String,
    label: String,
    visible: bool,
    joined: bool,
}

fn column_finder_matches<P: ServerParam>(
    screen: &BrowseScreen<P>,
    query: &str,
) -> Vec<ColumnFinderMatch> {
    screen
        .registry()
        .search(query)
        .into_iter()
        .map(|column| ColumnFinderMatch {
            key: column.key.clone(),
            label: column.label.clone(),
            visible: column.visible,
            joined: column.is_joined(),
        })
        .collect()
}

fn handle_column_finder_key<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.column_finder = ColumnFinderUiState::default();
            return;
        }
        (KeyCode::Up, _) => {
            view_data.column_finder.cursor = view_data.column_finder.cursor.saturating_sub(1);
        }
        (KeyCode::Char('p'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.column_finder.cursor = view_data.column_finder.cursor.saturating_sub(1);
        }
        (KeyCode::Down, _) => {
            view_data.column_finder.cursor = view_data.column_finder.cursor.saturating_add(1);
        }
        (KeyCode::Char('n'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.column_finder.cursor = view_data.column_finder.cursor.saturating_add(1);
        }
        (KeyCode::Backspace, _) => {
            view_data.column_finder.query.pop();
            view_data.column_finder.cursor = 0;
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.column_finder.query.clear();
            view_data.column_finder.cursor = 0;
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            view_data.column_finder.query.push(ch);
            view_data.column_finder.cursor = 0;
        }
        (KeyCode::Enter, _) => {
            let matches = column_finder_matches(screen, &view_data.column_finder.query);
            let Some(selected) = matches.get(view_data.column_finder.cursor) else {
                emit_status(view_data, internal_tx, "no matching columns");
                return;
            };
            if selected.visible && screen.registry().visible_columns().len() <= 1 {
                emit_status(view_data, internal_tx, "cannot hide the last visible column");
                return;
            }
            let key = selected.key.clone();
            dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::ToggleVisible(key),
            );
        }
        _ => {}
    }

    let matches = column_finder_matches(screen, &view_data.column_finder.query).len();
    view_data.column_finder.cursor = view_data
        .column_finder
        .cursor
        .min(matches.saturating_sub(1));
}

/// Advertised joined columns grouped by table, followed within each table
/// by the ones already shown.
fn related_picker_entries<P: ServerParam>(screen: &BrowseScreen<P>) -> Vec<RelatedPickerEntry> {
    let registry = screen.registry();
    let mut grouped: BTreeMap<String, Vec<RelatedPickerEntry>> = BTreeMap::new();
    for (table, specs) in screen.related().available_grouped(registry) {
        grouped
            .entry(table)
            .or_default()
            .extend(specs.into_iter().map(|spec| RelatedPickerEntry {
                table: spec.table.clone(),
                key: spec.key.clone(),
                label: spec.label.clone(),
                added: false,
            }));
    }
    for column in RelatedColumnManager::selected(registry) {
        let table = column.source_table().unwrap_or_default().to_owned();
        grouped
            .entry(table.clone())
            .or_default()
            .push(RelatedPickerEntry {
                table,
                key: column.key.clone(),
                label: column.label.clone(),
                added: true,
            });
    }
    grouped.into_values().flatten().collect()
}

fn handle_related_picker_key<P, R>(
    screen: &mut BrowseScreen<P>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) where
    P: ServerParam,
    R: BrowseRuntime<P>,
{
    let entries = related_picker_entries(screen);
    let selected = entries.get(view_data.related_picker.cursor).cloned();
    match key.code {
        KeyCode::Esc => {
            view_data.related_picker = RelatedPickerUiState::default();
            return;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.related_picker.cursor = view_data.related_picker.cursor.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.related_picker.cursor = view_data.related_picker.cursor.saturating_sub(1);
        }
        KeyCode::Enter => match selected {
            Some(entry) if entry.added => emit_status(
                view_data,
                internal_tx,
                format!("{} is already shown; d removes it", entry.label),
            ),
            Some(entry) => dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::AddRelated {
                    key: entry.key,
                    label: entry.label,
                    table: entry.table,
                },
            ),
            None => {}
        },
        KeyCode::Char('d') => match selected {
            Some(entry) if entry.added => dispatch(
                screen,
                runtime,
                view_data,
                internal_tx,
                BrowseCommand::RemoveRelated(entry.key),
            ),
            Some(entry) => emit_status(
                view_data,
                internal_tx,
                format!("{} is not shown", entry.label),
            ),
            None => {}
        },
        _ => {}
    }

    let count = related_picker_entries(screen).len();
    view_data.related_picker.cursor = view_data
        .related_picker
        .cursor
        .min(count.saturating_sub(1));
}

/// Next (or previous) entry of [`PAGE_SIZES`], wrapping. Sizes off the
/// cycle snap to the nearest entry in the requested direction.
pub fn cycle_page_size(current: u32, forward: bool) -> u32 {
    let len = PAGE_SIZES.len();
    match (PAGE_SIZES.iter().position(|size| *size == current), forward) {
        (Some(index), true) => PAGE_SIZES[(index + 1) % len],
        (Some(index), false) => PAGE_SIZES[(index + len - 1) % len],
        (None, true) => PAGE_SIZES
            .iter()
            .copied()
            .find(|size| *size > current)
            .unwrap_or(PAGE_SIZES[0]),
        (None, false) => PAGE_SIZES
            .iter()
            .rev()
            .copied()
            .find(|size| *size < current)
            .unwrap_or(PAGE_SIZES[len - 1]),
    }
}

fn selected_column<'a, P: ServerParam>(
    screen: &'a BrowseScreen<P>,
    view_data: &ViewData,
) -> Option<&'a ColumnDefinition> {
    screen
        .registry()
        .visible_columns()
        .get(view_data.selected_col)
        .copied()
}

fn selected_column_key<P: ServerParam>(
    screen: &BrowseScreen<P>,
    view_data: &ViewData,
) -> Option<String> {
    selected_column(screen, view_data).map(|column| column.key.clone())
}

fn clamp_table_cursor<P: ServerParam>(screen: &BrowseScreen<P>, view_data: &mut ViewData) {
    let rows = screen.pages().rows().len();
    let columns = screen.registry().visible_columns().len();
    view_data.selected_row = view_data.selected_row.min(rows.saturating_sub(1));
    view_data.selected_col = view_data.selected_col.min(columns.saturating_sub(1));
}

fn render<P: ServerParam>(
    frame: &mut ratatui::Frame<'_>,
    screen: &BrowseScreen<P>,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(screen))
        .block(Block::default().title("claimdesk").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_table(frame, layout[1], screen, view_data);

    let status_widget = Paragraph::new(status_text(screen, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(popup) = screen.popup().as_open() {
        let area = centered_rect(50, 64, frame.area());
        frame.render_widget(Clear, area);
        let title = screen
            .registry()
            .get(popup.column())
            .map_or_else(|| popup.column().to_owned(), |column| column.label.clone());
        let widget = Paragraph::new(render_popup_overlay_text(popup, &view_data.popup)).block(
            Block::default()
                .title(format!("filter {title}"))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(widget, area);
    }

    if view_data.column_finder.visible {
        let area = centered_rect(56, 58, frame.area());
        frame.render_widget(Clear, area);
        let finder = Paragraph::new(render_column_finder_overlay_text(screen, view_data))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(finder, area);
    }

    if view_data.related_picker.visible {
        let area = centered_rect(60, 62, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_related_picker_overlay_text(screen, view_data))
            .block(Block::default().title("related columns").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if view_data.search_input.visible {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let search = Paragraph::new(format!(
            "search: {}\n\nenter apply | ctrl+u clear | esc cancel",
            view_data.search_input.text
        ))
        .block(Block::default().title("search").borders(Borders::ALL));
        frame.render_widget(search, area);
    }

    if view_data.help_visible {
        let area = centered_rect(72, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table<P: ServerParam>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    screen: &BrowseScreen<P>,
    view_data: &ViewData,
) {
    let columns = screen.registry().visible_columns();
    let widths = vec![Constraint::Min(8); columns.len().max(1)];

    let header = Row::new(columns.iter().map(|column| {
        Cell::from(header_label(screen, column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = screen
        .pages()
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let selected_row = row_index == view_data.selected_row;
            let cells = columns
                .iter()
                .enumerate()
                .map(|(column_index, column)| {
                    let mut style = Style::default();
                    if selected_row {
                        style = style.bg(Color::DarkGray);
                    }
                    if selected_row && column_index == view_data.selected_col {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                    Cell::from(cell_text(row, column)).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(screen))
                .borders(Borders::ALL),
        );
    let mut table_state = TableState::default().with_selected(Some(view_data.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn cell_text(row: &claimdesk_app::Row, column: &ColumnDefinition) -> String {
    let text = display_cell(row.cell(column), column.data_type);
    if text == BLANK { String::new() } else { text }
}

fn header_label<P: ServerParam>(screen: &BrowseScreen<P>, column: &ColumnDefinition) -> String {
    let mut label = if column.is_joined() {
        format!("{LINK_ARROW} {}", column.label)
    } else {
        column.label.clone()
    };
    if screen.filters().is_filtered(&column.key) {
        label.push(' ');
        label.push_str(FILTER_MARK_ACTIVE);
    }
    label
}

fn table_title<P: ServerParam>(screen: &BrowseScreen<P>) -> String {
    let pages = screen.pages();
    let total = pages.meta().map_or(0, |meta| meta.total_count);
    format!(
        "{} | page {}/{} | {total} rows",
        screen.entity().label(),
        pages.page(),
        pages.total_pages()
    )
}

fn header_text<P: ServerParam>(screen: &BrowseScreen<P>) -> String {
    let mut parts = vec![
        screen.entity().label().to_owned(),
        format!("size {}", screen.pages().page_size()),
    ];
    let filters = screen
        .filters()
        .iter()
        .map(|(key, entry)| {
            let label = screen
                .registry()
                .get(key)
                .map_or(key, |column| column.label.as_str());
            format!("{label}={}", entry.summary())
        })
        .collect::<Vec<_>>();
    if !filters.is_empty() {
        parts.push(format!("filters: {}", filters.join(", ")));
    }
    if !screen.search_text().is_empty() {
        parts.push(format!("search: {:?}", screen.search_text()));
    }
    parts.join(" | ")
}

fn status_hidden_by_overlay<P: ServerParam>(screen: &BrowseScreen<P>, view_data: &ViewData) -> bool {
    screen.popup().is_open()
        || view_data.column_finder.visible
        || view_data.related_picker.visible
        || view_data.search_input.visible
        || view_data.help_visible
}

fn status_text<P: ServerParam>(screen: &BrowseScreen<P>, view_data: &ViewData) -> String {
    let badge = match screen.pages().state() {
        LoadState::Idle => "IDLE",
        LoadState::Loading(_) => "LOADING",
        LoadState::Loaded => "READY",
        LoadState::Failed(_) => "ERROR",
    };
    let message = view_data.status.as_deref().or(screen.status_line());
    if status_hidden_by_overlay(screen, view_data) {
        return match message {
            Some(message) => format!("{badge} | {message}"),
            None => badge.to_owned(),
        };
    }

    let hints = "j/k/h/l | f filter | c/C cols | / find | r related | [/] page | +/- size | s search | x clear | ? help | q quit";
    match message {
        Some(message) => format!("{badge} | {message} | {hints}"),
        None => format!("{badge} | {hints}"),
    }
}

fn render_popup_overlay_text(popup: &OpenPopup, ui: &PopupUiState) -> String {
    let mut lines = vec![format!("mode: {}", popup.mode().label())];
    lines.push(String::new());

    match popup.mode() {
        PopupMode::Values => {
            let cursor = if ui.search_focus { "_" } else { "" };
            lines.push(format!("search: {}{cursor}", popup.search()));
            lines.push(format!(
                "{}/{} checked",
                popup.checked_count(),
                popup.candidates().len()
            ));
            lines.push(String::new());
            let values = popup.visible_candidates();
            if values.is_empty() {
                lines.push("(no values on this page)".to_owned());
            }
            let start = ui.cursor.saturating_sub(8);
            let end = (start + 16).min(values.len());
            for (index, value) in values.iter().enumerate().take(end).skip(start) {
                let prefix = if index == ui.cursor { "> " } else { "  " };
                let mark = if popup.is_checked(value) { "[x]" } else { "[ ]" };
                lines.push(format!("{prefix}{mark} {value}"));
            }
            lines.push(String::new());
            lines.push(
                "space toggle | a all | n none | / search | tab contains | enter apply | esc cancel"
                    .to_owned(),
            );
        }
        PopupMode::Numeric => {
            lines.push(format!("values: {}_", popup.text()));
            lines.push(String::new());
            lines.push("numbers separated by commas or spaces".to_owned());
            lines.push("tab contains | enter apply | esc cancel".to_owned());
        }
        PopupMode::Contains => {
            lines.push(format!("contains: {}_", popup.text()));
            lines.push(String::new());
            lines.push("tab values | enter apply | esc cancel".to_owned());
        }
    }
    lines.join("\n")
}

fn render_column_finder_overlay_text<P: ServerParam>(
    screen: &BrowseScreen<P>,
    view_data: &ViewData,
) -> String {
    let mut lines = vec![format!("query: {}", view_data.column_finder.query)];
    lines.push(String::new());

    let matches = column_finder_matches(screen, &view_data.column_finder.query);
    if matches.is_empty() {
        lines.push("(no matches)".to_owned());
    }
    for (index, entry) in matches.iter().enumerate() {
        let prefix = if index == view_data.column_finder.cursor {
            "> "
        } else {
            "  "
        };
        let mark = if entry.visible { "[x]" } else { "[ ]" };
        let joined = if entry.joined { " (joined)" } else { "" };
        lines.push(format!("{prefix}{mark} {}{joined}", entry.label));
    }

    lines.push(String::new());
    lines.push("type filter | up/down pick | enter show/hide | esc close".to_owned());
    lines.join("\n")
}

fn render_related_picker_overlay_text<P: ServerParam>(
    screen: &BrowseScreen<P>,
    view_data: &ViewData,
) -> String {
    let entries = related_picker_entries(screen);
    if entries.is_empty() {
        return "no related columns for this entity\n\nesc close".to_owned();
    }

    let mut lines = Vec::new();
    let mut current_table = None::<&str>;
    for (index, entry) in entries.iter().enumerate() {
        if current_table != Some(entry.table.as_str()) {
            if current_table.is_some() {
                lines.push(String::new());
            }
            lines.push(format!("{}:", entry.table));
            current_table = Some(entry.table.as_str());
        }
        let prefix = if index == view_data.related_picker.cursor {
            "> "
        } else {
            "  "
        };
        let mark = if entry.added { " [shown]" } else { "" };
        lines.push(format!("{prefix}{} ({}){mark}", entry.label, entry.key));
    }

    lines.push(String::new());
    lines.push("j/k pick | enter add | d remove | esc close".to_owned());
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: q quit | ctrl+c quit | ? help\n\
table: j/k rows | h/l columns | [/] page | +/- page size (10/25/50/100) | R reload\n\
filter: f or enter open | x clear all | s search\n\
filter popup: j/k pick | space toggle | a all | n none | / search | tab mode | enter apply | esc cancel\n\
columns: c hide | C show all | / find (enter show/hide)\n\
related: r open | enter add | d remove | esc close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
