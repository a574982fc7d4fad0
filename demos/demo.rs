// Interactive demo: an organisation chart fed by a simulated asynchronous host list.
//
// The list reports `Loading` for a second, then becomes available; captions of
// some departments resolve later still. Press F5 to publish a new generation
// with an extra department, `q` to quit. Set RECORDTREE_LOG=<file> to capture
// tracing output.
use std::env;
use std::fs::File;
use std::io;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{DefaultTerminal, Frame};
use tracing_subscriber::EnvFilter;

use tui_recordtree::{
    AttributeMapping, AttributeNames, AttributeValue, HostRecord, HostSelection, KeyValue,
    ListSnapshot, LoadStatus, RecordId, RecordTreeView, SelectionMode, SelectionValue,
    SourceGeneration, TreeViewConfig, TreeViewStyle,
};

const LIST_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
struct Department {
    id: RecordId,
    code: i64,
    parent: Option<i64>,
    name: String,
    is_folder: bool,
    headcount: Option<u32>,
    caption_ready: Instant,
}

impl HostRecord for Department {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// Host selection binding: remembers the selected names.
struct Status {
    mode: SelectionMode,
    selected: Vec<String>,
    notifications: usize,
}

impl HostSelection<Department> for Status {
    fn mode(&self) -> SelectionMode {
        self.mode
    }

    fn set_selection(&mut self, selection: SelectionValue<Department>) {
        self.selected = match selection {
            SelectionValue::Single(record) => record.into_iter().map(|d| d.name).collect(),
            SelectionValue::Multiple(records) => records.into_iter().map(|d| d.name).collect(),
        };
    }

    fn notify_changed(&mut self) {
        self.notifications += 1;
    }
}

fn mapping() -> AttributeMapping<Department> {
    AttributeMapping::<Department>::new(
        Box::new(|d: &Department| AttributeValue::available(KeyValue::from(d.code))),
        Box::new(|d: &Department| match d.parent {
            Some(parent) => AttributeValue::available(KeyValue::from(parent)),
            None => AttributeValue::empty(),
        }),
        Rc::new(|d: &Department| {
            if Instant::now() >= d.caption_ready {
                AttributeValue::available(d.name.clone())
            } else {
                AttributeValue::loading()
            }
        }),
        Some(Box::new(|d: &Department| AttributeValue::available(d.is_folder))),
    )
}

fn departments(start: Instant, extra: usize) -> Vec<Department> {
    let slow = start + Duration::from_secs(3);
    let mut next_id = 0u128;
    let mut department = |code: i64, parent: Option<i64>, name: &str, headcount: Option<u32>| {
        next_id += 1;
        Department {
            id: RecordId::from_u128(next_id),
            code,
            parent,
            name: name.to_owned(),
            is_folder: false,
            headcount,
            caption_ready: if code % 3 == 0 { slow } else { start },
        }
    };

    let mut list = vec![
        department(1, None, "Headquarters", None),
        department(10, Some(1), "Engineering", None),
        department(11, Some(10), "Platform", Some(14)),
        department(12, Some(10), "Tooling", Some(6)),
        department(13, Some(10), "Research", Some(4)),
        department(20, Some(1), "Operations", None),
        department(21, Some(20), "Support", Some(22)),
        department(22, Some(20), "Logistics", Some(9)),
        department(30, None, "Subsidiary", None),
        department(31, Some(30), "Sales", Some(17)),
        // Parent 99 does not exist; dropped by the default orphan policy.
        department(40, Some(99), "Lost team", Some(2)),
    ];
    let mut archive = department(50, None, "Archive", None);
    archive.is_folder = true;
    list.push(archive);

    for idx in 0..extra {
        let code = 100 + i64::try_from(idx).unwrap_or(0);
        list.push(department(code, Some(30), &format!("New office {}", idx + 1), Some(1)));
    }
    list
}

fn init_logging() {
    let Some(path) = env::var_os("RECORDTREE_LOG") else {
        return;
    };
    let Ok(file) = File::create(path) else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

struct App {
    view: RecordTreeView<Department, Box<dyn FnMut()>>,
    status: Status,
    source: ListSnapshot<Department>,
    started: Instant,
    style: TreeViewStyle<'static>,
}

impl App {
    fn publish(&mut self) {
        let generation = self.source.generation.0 + 1;
        let extra = usize::try_from(generation.saturating_sub(1)).unwrap_or(0);
        self.source = ListSnapshot::available(
            SourceGeneration(generation),
            departments(self.started, extra),
        );
        self.view.on_source_update(&self.source);
    }

    fn render(&mut self, frame: &mut Frame) {
        let [tree_area, status_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

        let dim = Style::default().fg(Color::Rgb(120, 130, 150));
        let headcount = move |d: &Department| {
            d.headcount.map(|count| {
                Line::from(vec![
                    Span::raw(d.name.clone()),
                    Span::styled(format!("  ({count})"), dim),
                ])
            })
        };
        self.view
            .render_with_content(tree_area, frame.buffer_mut(), &self.style, &headcount);

        let selected = if self.status.selected.is_empty() {
            "nothing".to_owned()
        } else {
            self.status.selected.join(", ")
        };
        let text = format!(
            " selected: {selected}  |  notifications: {}  |  F5 reload, q quit",
            self.status.notifications
        );
        frame.render_widget(Paragraph::new(text).style(dim), status_area);
    }
}

fn run_app(mut terminal: DefaultTerminal, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if app.source.status == LoadStatus::Loading && app.started.elapsed() >= LIST_DELAY {
            app.publish();
        }
        app.view.tick(Instant::now());

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') if !app.view.state().is_search_open() => break,
                    KeyCode::F(5) => app.publish(),
                    _ => {
                        let _ = app.view.handle_key(key, &mut app.status);
                    }
                },
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    init_logging();
    let multiple = env::args().skip(1).any(|arg| arg == "--multi");
    let mode = if multiple {
        SelectionMode::Multiple
    } else {
        SelectionMode::Single
    };

    let config = TreeViewConfig::new(
        AttributeNames::new("Code", "ParentCode", "Name").with_folder_flag("IsFolder"),
    )
    .open_expanded(true);
    let on_change: Box<dyn FnMut()> = Box::new(|| tracing::info!("selection changed"));
    let view = RecordTreeView::with_action(config, mapping(), on_change)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let mut style = TreeViewStyle::default();
    style.block_style = Style::default()
        .fg(Color::Rgb(221, 227, 235))
        .bg(Color::Rgb(24, 28, 36));
    style.border_style = Style::default().fg(Color::Rgb(92, 110, 140));
    style.line_style = Style::default().fg(Color::Rgb(86, 98, 120));
    style.selected_style = Style::default()
        .fg(Color::Rgb(136, 192, 208))
        .add_modifier(Modifier::BOLD);
    style.search_match_style = Style::default().fg(Color::Rgb(229, 201, 133));
    style.highlight_style = Style::default()
        .fg(Color::Rgb(255, 255, 255))
        .bg(Color::Rgb(52, 66, 96))
        .add_modifier(Modifier::BOLD);
    style.title = Some(Line::from(if multiple {
        "Departments (multi-select)"
    } else {
        "Departments"
    }));

    let app = App {
        view,
        status: Status {
            mode,
            selected: Vec::new(),
            notifications: 0,
        },
        source: ListSnapshot::loading(SourceGeneration(0)),
        started: Instant::now(),
        style,
    };

    let terminal = ratatui::init();
    let result = run_app(terminal, app);
    ratatui::restore();
    result
}
