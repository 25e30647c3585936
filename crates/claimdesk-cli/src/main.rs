// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use claimdesk_app::{
    AdjustmentParam, BLANK, BrowseCommand, BrowseScreen, ClaimNoteParam, ClaimParam,
    ColumnRegistry, DataSource, DisbursementParam, EntityKind, EntityParams, FilterEntry, PatientParam,
    PayerParam, PaymentParam, PhysicianParam, QueryDescriptor, QueryInputs, QueryTrigger,
    RelatedColumnSpec, ResultPage, SchemaService, ServerParam, ServiceParam, build_query, display_cell,
    parse_numeric_input,
};
use claimdesk_client::{Client, HttpDataSource};
use config::Config;
use runtime::ClientRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

const MAX_PAGE_SIZE: u32 = 500;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    if options.list_entities {
        print!("{}", entity_listing());
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `claimdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let entity = options.entity.unwrap_or_else(|| config.default_entity());
    let page_size = options.page_size.unwrap_or_else(|| config.page_size());

    if options.print_query {
        let session = Session {
            options: &options,
            page_size,
            mode: Mode::PrintQuery,
            client: None,
        };
        return run_for_entity(entity, &session);
    }

    logging::init_logging(config.log_level(), &config.log_path()?)?;

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    info!(
        entity = entity.as_str(),
        base_url = client.base_url(),
        "starting claimdesk"
    );
    let session = Session {
        options: &options,
        page_size,
        mode: if options.fetch {
            Mode::Fetch
        } else {
            Mode::Browse
        },
        client: Some(client),
    };
    run_for_entity(entity, &session)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    PrintQuery,
    Fetch,
    Browse,
}

struct Session<'a> {
    options: &'a CliOptions,
    page_size: u32,
    mode: Mode,
    client: Option<Client>,
}

fn run_for_entity(entity: EntityKind, session: &Session<'_>) -> Result<()> {
    match entity {
        EntityKind::Claims => run_entity::<ClaimParam>(session),
        EntityKind::Patients => run_entity::<PatientParam>(session),
        EntityKind::Payments => run_entity::<PaymentParam>(session),
        EntityKind::Adjustments => run_entity::<AdjustmentParam>(session),
        EntityKind::Disbursements => run_entity::<DisbursementParam>(session),
        EntityKind::Payers => run_entity::<PayerParam>(session),
        EntityKind::Physicians => run_entity::<PhysicianParam>(session),
        EntityKind::Services => run_entity::<ServiceParam>(session),
        EntityKind::ClaimNotes => run_entity::<ClaimNoteParam>(session),
    }
}

fn run_entity<P: EntityParams>(session: &Session<'_>) -> Result<()> {
    let options = session.options;
    let related = match &session.client {
        Some(client) if !options.related.is_empty() => {
            SchemaService::list_related_columns(client, P::ENTITY.as_str())
                .with_context(|| format!("load related columns for {}", P::ENTITY.as_str()))?
        }
        _ => Vec::new(),
    };
    let mut screen =
        prepare_screen::<P>(options, session.page_size, &related, session.client.is_some())?;

    if session.mode != Mode::Browse {
        for gap in screen.gaps() {
            eprintln!("warning: {}: {}", gap.column, gap.reason.message());
        }
    }

    let page = options.page.unwrap_or(1);
    match session.mode {
        Mode::PrintQuery => {
            let query = one_shot_query(&screen, page);
            println!(
                "{}",
                serde_json::to_string_pretty(&query).context("encode query as JSON")?
            );
            Ok(())
        }
        Mode::Fetch => {
            let client = session
                .client
                .as_ref()
                .ok_or_else(|| anyhow!("--fetch needs a configured server"))?;
            let source = HttpDataSource::new(client.clone(), P::ENTITY);
            let query = one_shot_query(&screen, page);
            let result = source
                .fetch_page(&query)
                .map_err(|error| anyhow!("fetch {} page {page}: {error}", P::ENTITY.as_str()))?;
            print!("{}", render_plain_table(screen.registry(), &result));
            Ok(())
        }
        Mode::Browse => {
            let client = session
                .client
                .clone()
                .ok_or_else(|| anyhow!("browsing needs a configured server"))?;
            let mut runtime = ClientRuntime::new(client, P::ENTITY);
            claimdesk_tui::run_browser(&mut screen, &mut runtime)
        }
    }
}

/// Builds a screen for `P` with the command-line filters, search text and
/// joined columns applied. With `strict_related` every `--related` key must
/// be in `related`.
fn prepare_screen<P: EntityParams>(
    options: &CliOptions,
    page_size: u32,
    related: &[RelatedColumnSpec],
    strict_related: bool,
) -> Result<BrowseScreen<P>> {
    let mut screen = BrowseScreen::new(P::preset(), page_size);
    screen.set_related_catalog(related.to_vec());

    for key in &options.related {
        let (label, table) = match screen.related().spec(key) {
            Some(spec) => (spec.label.clone(), spec.table.clone()),
            None if strict_related => {
                let known = related
                    .iter()
                    .map(|spec| spec.key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                bail!(
                    "unknown related column {key:?} for {}; available: {known}",
                    P::ENTITY.as_str()
                );
            }
            None => (key.clone(), String::new()),
        };
        if screen.registry().contains(key) {
            bail!("--related {key:?} is already a column of {}", P::ENTITY.as_str());
        }
        screen.dispatch(BrowseCommand::AddRelated {
            key: key.clone(),
            label,
            table,
        });
    }

    for filter in &options.filters {
        let column = screen.registry().get(filter.column()).cloned().ok_or_else(|| {
            let known = screen
                .registry()
                .iter()
                .map(|column| column.key.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!(
                "unknown column {:?} for {}; known columns: {known}",
                filter.column(),
                P::ENTITY.as_str()
            )
        })?;
        let entry = match filter {
            FilterArg::Values { values, .. } if column.data_type.is_numeric() => {
                FilterEntry::Categorical {
                    selected: parse_numeric_input(&values.join(",")),
                }
            }
            FilterArg::Values { values, .. } => FilterEntry::categorical(values.iter().cloned()),
            FilterArg::Contains { text, .. } => FilterEntry::text(text.clone()),
        };
        screen.dispatch(BrowseCommand::SetFilter {
            column: column.key.clone(),
            change: entry.into(),
        });
    }

    if let Some(search) = &options.search {
        screen.dispatch(BrowseCommand::SetSearchText(search.trim().to_owned()));
    }
    Ok(screen)
}

fn one_shot_query<P: ServerParam>(screen: &BrowseScreen<P>, page: u32) -> QueryDescriptor<P> {
    build_query(
        &QueryInputs {
            registry: screen.registry(),
            filters: screen.filters(),
            mappings: screen.mappings(),
            search_text: screen.search_text(),
            page,
            page_size: screen.pages().page_size(),
        },
        QueryTrigger::Initial,
    )
}

fn render_plain_table(registry: &ColumnRegistry, page: &ResultPage) -> String {
    let columns = registry.visible_columns();
    let mut grid = vec![
        columns
            .iter()
            .map(|column| column.label.clone())
            .collect::<Vec<_>>(),
    ];
    for row in &page.rows {
        grid.push(
            columns
                .iter()
                .map(|column| {
                    let text = display_cell(row.cell(column), column.data_type);
                    if text == BLANK { String::new() } else { text }
                })
                .collect(),
        );
    }

    let widths = (0..columns.len())
        .map(|index| {
            grid.iter()
                .map(|cells| cells[index].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let mut out = String::new();
    for (index, cells) in grid.iter().enumerate() {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
        if index == 0 {
            let rule = widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(&rule);
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "page {}/{} | {} rows total\n",
        page.meta.page,
        page.meta.total_pages(),
        page.meta.total_count
    ));
    out
}

fn entity_listing() -> String {
    EntityKind::ALL
        .iter()
        .map(|entity| format!("{:<14} {}\n", entity.as_str(), entity.label()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterArg {
    Values { column: String, values: Vec<String> },
    Contains { column: String, text: String },
}

impl FilterArg {
    fn column(&self) -> &str {
        match self {
            Self::Values { column, .. } | Self::Contains { column, .. } => column,
        }
    }
}

/// Parses `key=v1,v2` (value set) or `key~text` (contains). The first of
/// `=` and `~` decides which.
fn parse_filter_arg(raw: &str) -> Result<FilterArg> {
    let Some(split) = raw.find(['=', '~']) else {
        bail!("--filter {raw:?} must look like key=v1,v2 or key~text");
    };
    let column = raw[..split].trim();
    if column.is_empty() {
        bail!("--filter {raw:?} is missing a column key");
    }
    let rest = &raw[split + 1..];
    if raw[split..].starts_with('~') {
        if rest.trim().is_empty() {
            bail!("--filter {raw:?} needs text after ~");
        }
        return Ok(FilterArg::Contains {
            column: column.to_owned(),
            text: rest.trim().to_owned(),
        });
    }

    let values = rest
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if values.is_empty() {
        bail!("--filter {raw:?} needs at least one value after =");
    }
    Ok(FilterArg::Values {
        column: column.to_owned(),
        values,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    entity: Option<EntityKind>,
    filters: Vec<FilterArg>,
    search: Option<String>,
    related: Vec<String>,
    page: Option<u32>,
    page_size: Option<u32>,
    print_query: bool,
    fetch: bool,
    list_entities: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        entity: None,
        filters: Vec::new(),
        search: None,
        related: Vec::new(),
        page: None,
        page_size: None,
        print_query: false,
        fetch: false,
        list_entities: false,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let mut value = |hint: &str| {
            iter.next()
                .map(|value| value.as_ref().to_owned())
                .ok_or_else(|| anyhow!("{arg} requires {hint}"))
        };
        match arg {
            "--config" => {
                options.config_path = PathBuf::from(value("a file path")?);
            }
            "--entity" => {
                let name = value("an entity name")?;
                options.entity = Some(EntityKind::parse(&name).ok_or_else(|| {
                    anyhow!("unknown entity {name:?}; run with --list-entities to see choices")
                })?);
            }
            "--filter" => {
                options.filters.push(parse_filter_arg(&value("key=v1,v2 or key~text")?)?);
            }
            "--search" => {
                options.search = Some(value("search text")?);
            }
            "--related" => {
                let key = value("a related column key")?;
                if !options.related.contains(&key) {
                    options.related.push(key);
                }
            }
            "--page" => {
                let raw = value("a page number")?;
                let page: u32 = raw
                    .parse()
                    .with_context(|| format!("--page {raw:?} is not a number"))?;
                if page == 0 {
                    bail!("--page starts at 1");
                }
                options.page = Some(page);
            }
            "--page-size" => {
                let raw = value("a page size")?;
                let page_size: u32 = raw
                    .parse()
                    .with_context(|| format!("--page-size {raw:?} is not a number"))?;
                if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
                    bail!("--page-size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}");
                }
                options.page_size = Some(page_size);
            }
            "--print-query" => {
                options.print_query = true;
            }
            "--fetch" => {
                options.fetch = true;
            }
            "--list-entities" => {
                options.list_entities = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.print_query && options.fetch {
        bail!("--print-query and --fetch are exclusive; pick one");
    }
    Ok(options)
}

fn print_help() {
    println!("claimdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --entity <name>          Browse this entity (see --list-entities)");
    println!("  --filter key=v1,v2       Keep rows whose column is one of the values");
    println!("  --filter key~text        Keep rows whose column contains text");
    println!("  --search <text>          Free-text search");
    println!("  --related <key>          Add a joined column");
    println!("  --page <n>               Page for --print-query and --fetch");
    println!("  --page-size <n>          Rows per page (1-500)");
    println!("  --print-query            Print the server query as JSON and exit");
    println!("  --fetch                  Fetch one page and print it as a table");
    println!("  --list-entities          List browsable entities");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and server settings");
    println!("  --help                   Show this help");
}
