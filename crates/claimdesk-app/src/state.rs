// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::catalog::ValueCatalog;
use crate::columns::ColumnRegistry;
use crate::entities::EntityKind;
use crate::filter::{FilterChange, FilterState};
use crate::ids::RequestToken;
use crate::model::{RelatedColumnSpec, ResultPage};
use crate::page::{PageController, ResponseOutcome};
use crate::popup::{FilterPopup, PopupCommand};
use crate::presets::Preset;
use crate::query::{
    FilterGap, MappingTable, QueryDescriptor, QueryInputs, QueryTrigger, ServerParam,
    build_query, filter_gaps,
};
use crate::related::RelatedColumnManager;
use crate::source::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseCommand {
    Load,
    Reload,
    OpenFilter(String),
    Popup(PopupCommand),
    SetFilter { column: String, change: FilterChange },
    ClearFilter(String),
    ClearAllFilters,
    SetSearchText(String),
    SetVisible { column: String, visible: bool },
    ToggleVisible(String),
    ShowAll,
    AddRelated { key: String, label: String, table: String },
    RemoveRelated(String),
    GoToPage(u32),
    NextPage,
    PrevPage,
    SetPageSize(u32),
}

/// A fetch the host must run and report back through [`BrowseScreen::receive`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<P> {
    pub token: RequestToken,
    pub query: QueryDescriptor<P>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseEvent<P> {
    PopupOpened(String),
    PopupClosed,
    FiltersChanged,
    ColumnsChanged,
    StatusUpdated(String),
    ReloadRequested(PageRequest<P>),
}

/// One open browse screen: columns, filters, paging and the popup.
///
/// Nothing here is shared between screens. After [`Self::dispose`] every
/// command is ignored and late responses are dropped.
#[derive(Debug, Clone)]
pub struct BrowseScreen<P> {
    entity: EntityKind,
    registry: ColumnRegistry,
    filters: FilterState,
    mappings: MappingTable<P>,
    related: RelatedColumnManager,
    pages: PageController,
    popup: FilterPopup,
    search_text: String,
    status_line: Option<String>,
}

impl<P: ServerParam> BrowseScreen<P> {
    pub fn new(preset: Preset<P>, page_size: u32) -> Self {
        Self {
            entity: preset.entity,
            registry: ColumnRegistry::new(preset.columns),
            filters: FilterState::new(),
            mappings: preset.mappings,
            related: RelatedColumnManager::default(),
            pages: PageController::new(page_size),
            popup: FilterPopup::Closed,
            search_text: String::new(),
            status_line: None,
        }
    }

    /// Installs the joined columns the schema service advertises.
    pub fn set_related_catalog(&mut self, specs: impl IntoIterator<Item = RelatedColumnSpec>) {
        self.related = RelatedColumnManager::new(specs);
    }

    pub const fn entity(&self) -> EntityKind {
        self.entity
    }

    pub const fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub const fn mappings(&self) -> &MappingTable<P> {
        &self.mappings
    }

    pub const fn related(&self) -> &RelatedColumnManager {
        &self.related
    }

    pub const fn pages(&self) -> &PageController {
        &self.pages
    }

    pub const fn popup(&self) -> &FilterPopup {
        &self.popup
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn is_disposed(&self) -> bool {
        self.pages.is_disposed()
    }

    /// Distinct values of `key` over the loaded page, computed on demand.
    pub fn catalog(&self, key: &str) -> Option<ValueCatalog> {
        let column = self.registry.get(key)?;
        Some(ValueCatalog::from_rows(self.pages.rows(), column))
    }

    /// Catalog a checkbox selection on `key` is normalized against. Numeric
    /// columns take typed tokens, so a selection there is never "everything".
    fn checklist_catalog(&self, key: &str) -> Option<ValueCatalog> {
        if self.is_checklist(key) {
            self.catalog(key)
        } else {
            None
        }
    }

    fn is_checklist(&self, key: &str) -> bool {
        self.registry
            .get(key)
            .is_some_and(|column| !column.data_type.is_numeric())
    }

    /// Query for the current state without issuing a request.
    pub fn query(&self) -> QueryDescriptor<P> {
        build_query(&self.inputs(), QueryTrigger::Refresh)
    }

    pub fn gaps(&self) -> Vec<FilterGap> {
        filter_gaps(&self.inputs())
    }

    fn inputs(&self) -> QueryInputs<'_, P> {
        QueryInputs {
            registry: &self.registry,
            filters: &self.filters,
            mappings: &self.mappings,
            search_text: &self.search_text,
            page: self.pages.page(),
            page_size: self.pages.page_size(),
        }
    }

    pub fn dispatch(&mut self, command: BrowseCommand) -> Vec<BrowseEvent<P>> {
        if self.is_disposed() {
            return Vec::new();
        }
        match command {
            BrowseCommand::Load => self.reload(QueryTrigger::Initial),
            BrowseCommand::Reload => self.reload(QueryTrigger::Refresh),
            BrowseCommand::OpenFilter(key) => self.open_filter(&key),
            BrowseCommand::Popup(command) => self.handle_popup(command),
            BrowseCommand::SetFilter { column, change } => {
                if !self.registry.contains(&column) {
                    return Vec::new();
                }
                let catalog = self.checklist_catalog(&column);
                let changed = self.filters.apply_change(&column, change, catalog.as_ref());
                self.after_filter_change(changed)
            }
            BrowseCommand::ClearFilter(key) => {
                let changed = self.filters.clear(&key);
                self.after_filter_change(changed)
            }
            BrowseCommand::ClearAllFilters => {
                let changed = self.filters.clear_all();
                self.after_filter_change(changed)
            }
            BrowseCommand::SetSearchText(text) => {
                if text == self.search_text {
                    return Vec::new();
                }
                self.search_text = text;
                self.after_filter_change(true)
            }
            BrowseCommand::SetVisible { column, visible } => {
                self.update_registry(self.registry.set_visible(&column, visible))
            }
            BrowseCommand::ToggleVisible(key) => {
                self.update_registry(self.registry.toggle_visible(&key))
            }
            BrowseCommand::ShowAll => self.update_registry(self.registry.show_all()),
            BrowseCommand::AddRelated { key, label, table } => {
                let Some(registry) = self.related.add_related(&self.registry, &key, &label, &table)
                else {
                    return Vec::new();
                };
                self.registry = registry;
                let mut events = vec![
                    BrowseEvent::ColumnsChanged,
                    self.set_status(format!("added {label}")),
                ];
                events.extend(self.reload(QueryTrigger::ColumnsChanged));
                events
            }
            BrowseCommand::RemoveRelated(key) => {
                let Some(registry) = self.related.remove_related(&self.registry, &key) else {
                    return Vec::new();
                };
                self.registry = registry;
                let filter_cleared = self.filters.clear(&key);
                let mut events = vec![BrowseEvent::ColumnsChanged];
                if filter_cleared {
                    events.push(BrowseEvent::FiltersChanged);
                }
                events.push(self.set_status(format!("removed {key}")));
                events.extend(self.reload(if filter_cleared {
                    QueryTrigger::FilterChanged
                } else {
                    QueryTrigger::ColumnsChanged
                }));
                events
            }
            BrowseCommand::GoToPage(page) => {
                let page = page.clamp(1, self.pages.total_pages());
                if self.pages.set_page(page) {
                    self.reload(QueryTrigger::PageChanged)
                } else {
                    Vec::new()
                }
            }
            BrowseCommand::NextPage => {
                if self.pages.next_page() {
                    self.reload(QueryTrigger::PageChanged)
                } else {
                    Vec::new()
                }
            }
            BrowseCommand::PrevPage => {
                if self.pages.prev_page() {
                    self.reload(QueryTrigger::PageChanged)
                } else {
                    Vec::new()
                }
            }
            BrowseCommand::SetPageSize(page_size) => {
                if self.pages.set_page_size(page_size) {
                    self.reload(QueryTrigger::PageSizeChanged)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Hands a fetch result back. Only the latest request's result lands.
    pub fn receive(
        &mut self,
        token: RequestToken,
        result: Result<ResultPage, FetchError>,
    ) -> ResponseOutcome {
        let message = match &result {
            Err(FetchError::Failed { message }) => Some(message.clone()),
            _ => None,
        };
        let outcome = self.pages.complete(token, result);
        match outcome {
            ResponseOutcome::Applied => self.status_line = None,
            ResponseOutcome::Failed => self.status_line = message,
            ResponseOutcome::Stale | ResponseOutcome::Aborted | ResponseOutcome::Disposed => {}
        }
        outcome
    }

    pub fn dispose(&mut self) {
        self.popup = FilterPopup::Closed;
        self.pages.dispose();
    }

    fn open_filter(&mut self, key: &str) -> Vec<BrowseEvent<P>> {
        let Some(column) = self.registry.get(key) else {
            return Vec::new();
        };
        let catalog = ValueCatalog::from_rows(self.pages.rows(), column);
        self.popup = FilterPopup::open(column, catalog, self.filters.get(key));
        vec![BrowseEvent::PopupOpened(key.to_owned())]
    }

    fn handle_popup(&mut self, command: PopupCommand) -> Vec<BrowseEvent<P>> {
        if !self.popup.is_open() {
            return Vec::new();
        }
        let commit = self.popup.handle(command);
        if self.popup.is_open() {
            return Vec::new();
        }
        let mut events = vec![BrowseEvent::PopupClosed];
        if let Some(commit) = commit {
            let catalog = self
                .is_checklist(&commit.column)
                .then_some(&commit.candidates);
            let changed = self
                .filters
                .apply_change(&commit.column, commit.change, catalog);
            events.extend(self.after_filter_change(changed));
        }
        events
    }

    fn after_filter_change(&mut self, changed: bool) -> Vec<BrowseEvent<P>> {
        if !changed {
            return Vec::new();
        }
        let mut events = vec![BrowseEvent::FiltersChanged];
        let gaps = self.gaps();
        if gaps.is_empty() {
            self.status_line = None;
        } else {
            let summary = gaps
                .iter()
                .map(|gap| format!("{}: {}", gap.column, gap.reason.message()))
                .collect::<Vec<_>>()
                .join("; ");
            events.push(self.set_status(summary));
        }
        events.extend(self.reload(QueryTrigger::FilterChanged));
        events
    }

    fn update_registry(&mut self, registry: ColumnRegistry) -> Vec<BrowseEvent<P>> {
        if registry == self.registry {
            return Vec::new();
        }
        self.registry = registry;
        vec![BrowseEvent::ColumnsChanged]
    }

    fn reload(&mut self, trigger: QueryTrigger) -> Vec<BrowseEvent<P>> {
        if trigger.resets_page() {
            self.pages.set_page(1);
        }
        let query = build_query(&self.inputs(), trigger);
        let token = self.pages.begin();
        vec![BrowseEvent::ReloadRequested(PageRequest { token, query })]
    }

    fn set_status(&mut self, message: String) -> BrowseEvent<P> {
        self.status_line = Some(message.clone());
        BrowseEvent::StatusUpdated(message)
    }
}

#[cfg(test)]
mod tests {
    use super::{BrowseCommand, BrowseEvent, BrowseScreen, PageRequest};
    use crate::filter::{FilterChange, FilterEntry};
    use crate::model::{PageMeta, ResultPage, Row};
    use crate::page::{LoadState, ResponseOutcome};
    use crate::popup::PopupCommand;
    use crate::presets::{ClaimParam, EntityParams};
    use crate::query::ParamValue;
    use crate::source::FetchError;
    use serde_json::json;

    fn screen() -> BrowseScreen<ClaimParam> {
        BrowseScreen::new(ClaimParam::preset(), 25)
    }

    fn request(events: &[BrowseEvent<ClaimParam>]) -> PageRequest<ClaimParam> {
        events
            .iter()
            .find_map(|event| match event {
                BrowseEvent::ReloadRequested(request) => Some(request.clone()),
                _ => None,
            })
            .expect("a reload should be requested")
    }

    fn loaded(screen: &mut BrowseScreen<ClaimParam>, events: &[BrowseEvent<ClaimParam>]) {
        let rows = ["Open", "Denied", "Paid", "Open"]
            .iter()
            .enumerate()
            .map(|(index, status)| {
                serde_json::from_value::<Row>(json!({
                    "claID": 100 + index,
                    "claStatus": status,
                    "claClassification": if index % 2 == 0 { "A" } else { "B" },
                }))
                .expect("row")
            })
            .collect();
        let page = ResultPage {
            rows,
            meta: PageMeta {
                page: 1,
                page_size: 25,
                total_count: 80,
            },
        };
        assert_eq!(
            screen.receive(request(events).token, Ok(page)),
            ResponseOutcome::Applied
        );
    }

    #[test]
    fn popup_uncheck_filters_and_resets_page() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        loaded(&mut screen, &events);
        let events = screen.dispatch(BrowseCommand::GoToPage(3));
        assert_eq!(request(&events).query.page, 3);

        assert_eq!(
            screen.dispatch(BrowseCommand::OpenFilter("claStatus".to_owned())),
            vec![BrowseEvent::PopupOpened("claStatus".to_owned())]
        );
        assert!(screen
            .dispatch(BrowseCommand::Popup(PopupCommand::Toggle("Paid".to_owned())))
            .is_empty());
        let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));
        assert_eq!(events[0], BrowseEvent::PopupClosed);
        assert_eq!(events[1], BrowseEvent::FiltersChanged);

        let query = request(&events).query;
        assert_eq!(query.page, 1);
        assert_eq!(
            query.param(ClaimParam::StatusList),
            Some(&ParamValue::List(vec!["Denied".to_owned(), "Open".to_owned()]))
        );
    }

    #[test]
    fn select_none_on_unmapped_column_is_flagged_not_filtered() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        loaded(&mut screen, &events);

        screen.dispatch(BrowseCommand::OpenFilter("claClassification".to_owned()));
        screen.dispatch(BrowseCommand::Popup(PopupCommand::SelectNone));
        let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));

        let query = request(&events).query;
        assert!(query.server_params.is_empty());
        assert_eq!(query.search_text, None);
        assert!(screen.filters().is_filtered("claClassification"));
        assert_eq!(screen.gaps().len(), 1);
        assert!(events.iter().any(|event| matches!(
            event,
            BrowseEvent::StatusUpdated(message) if message.starts_with("claClassification")
        )));
    }

    #[test]
    fn cancel_and_untouched_apply_issue_no_request() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        loaded(&mut screen, &events);

        screen.dispatch(BrowseCommand::OpenFilter("claStatus".to_owned()));
        screen.dispatch(BrowseCommand::Popup(PopupCommand::SelectNone));
        assert_eq!(
            screen.dispatch(BrowseCommand::Popup(PopupCommand::Cancel)),
            vec![BrowseEvent::PopupClosed]
        );
        assert!(screen.filters().is_empty());

        screen.dispatch(BrowseCommand::OpenFilter("claStatus".to_owned()));
        assert_eq!(
            screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply)),
            vec![BrowseEvent::PopupClosed]
        );
    }

    #[test]
    fn related_columns_reload_and_removal_clears_their_filter() {
        let mut screen = screen();
        let before = screen.registry().clone();
        let events = screen.dispatch(BrowseCommand::AddRelated {
            key: "patName".to_owned(),
            label: "Patient".to_owned(),
            table: "patients".to_owned(),
        });
        assert_eq!(events[0], BrowseEvent::ColumnsChanged);
        assert_eq!(request(&events).query.additional_columns, vec!["patName"]);

        screen.dispatch(BrowseCommand::SetFilter {
            column: "patName".to_owned(),
            change: FilterEntry::text("avery").into(),
        });
        let events = screen.dispatch(BrowseCommand::RemoveRelated("patName".to_owned()));
        assert!(events.contains(&BrowseEvent::FiltersChanged));
        let query = request(&events).query;
        assert!(query.additional_columns.is_empty());
        assert_eq!(query.search_text, None);
        assert_eq!(screen.registry(), &before);
    }

    #[test]
    fn absent_keys_and_visibility_changes_do_not_reload() {
        let mut screen = screen();
        assert!(screen.dispatch(BrowseCommand::OpenFilter("nope".to_owned())).is_empty());
        assert!(screen.dispatch(BrowseCommand::ClearFilter("nope".to_owned())).is_empty());
        assert!(screen.dispatch(BrowseCommand::RemoveRelated("claID".to_owned())).is_empty());
        assert!(screen
            .dispatch(BrowseCommand::SetFilter {
                column: "nope".to_owned(),
                change: FilterChange::Clear,
            })
            .is_empty());
        assert_eq!(
            screen.dispatch(BrowseCommand::ToggleVisible("claStatus".to_owned())),
            vec![BrowseEvent::ColumnsChanged]
        );
        assert!(screen.dispatch(BrowseCommand::ToggleVisible("nope".to_owned())).is_empty());
    }

    #[test]
    fn page_size_change_resets_page_in_next_query() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        loaded(&mut screen, &events);
        screen.dispatch(BrowseCommand::NextPage);
        let events = screen.dispatch(BrowseCommand::SetPageSize(50));
        let query = request(&events).query;
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 50);
    }

    #[test]
    fn failure_keeps_rows_and_sets_status() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        loaded(&mut screen, &events);
        let events = screen.dispatch(BrowseCommand::Reload);
        let outcome = screen.receive(
            request(&events).token,
            Err(FetchError::failed("cannot reach http://localhost:8080/api")),
        );
        assert_eq!(outcome, ResponseOutcome::Failed);
        assert_eq!(screen.pages().rows().len(), 4);
        assert_eq!(
            screen.status_line(),
            Some("cannot reach http://localhost:8080/api")
        );
    }

    #[test]
    fn disposed_screen_ignores_commands_and_responses() {
        let mut screen = screen();
        let events = screen.dispatch(BrowseCommand::Load);
        screen.dispose();
        assert!(screen.dispatch(BrowseCommand::Reload).is_empty());
        assert_eq!(
            screen.receive(request(&events).token, Ok(ResultPage::default())),
            ResponseOutcome::Disposed
        );
        assert_eq!(
            screen.pages().state(),
            &LoadState::Loading(request(&events).token)
        );
    }

    #[test]
    fn search_text_joins_column_text_filters() {
        let mut screen = screen();
        screen.dispatch(BrowseCommand::SetFilter {
            column: "claClassification".to_owned(),
            change: FilterEntry::text("inpatient").into(),
        });
        let events = screen.dispatch(BrowseCommand::SetSearchText("smith".to_owned()));
        assert_eq!(
            request(&events).query.search_text.as_deref(),
            Some("smith inpatient")
        );
        assert!(screen
            .dispatch(BrowseCommand::SetSearchText("smith".to_owned()))
            .is_empty());
    }
}
