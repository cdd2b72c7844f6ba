use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use bms_core::{
    CellTag, DecodedFlags, GlobalPanel, HeaderClass, MosAggregate, PackPanel, RenderModel,
};

use crate::poll::PollEvent;

const PLACEHOLDER: &str = "—";

pub struct UiState {
    pub model: Option<RenderModel>,
    /// Set by a failed cycle; replaces the dashboard body until the next success.
    pub banner: Option<String>,
    pub selected: usize,
    pub command_line: Option<String>,
    pub last_command: Option<String>,
    pub logs: VecDeque<String>,
    pub max_logs: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            model: None,
            banner: None,
            selected: 0,
            command_line: None,
            last_command: None,
            logs: VecDeque::new(),
            max_logs: 8,
        }
    }
}

impl UiState {
    pub fn apply(&mut self, event: PollEvent) {
        match event {
            PollEvent::Model(model) => {
                let count = model.packs.len();
                self.model = Some(*model);
                self.banner = None;
                if self.selected >= count {
                    self.selected = count.saturating_sub(1);
                }
            }
            PollEvent::Failed(message) => self.banner = Some(message),
        }
    }

    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn selected_pack(&self) -> Option<&PackPanel> {
        self.model.as_ref()?.packs.get(self.selected)
    }

    pub fn select_next(&mut self) {
        let count = self.model.as_ref().map_or(0, |model| model.packs.len());
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_previous(&mut self) {
        let count = self.model.as_ref().map_or(0, |model| model.packs.len());
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }

    /// Display name of the pack with `id` in the latest model.
    pub fn pack_name(&self, id: u32) -> Option<String> {
        self.model
            .as_ref()?
            .packs
            .iter()
            .find(|pack| pack.id.get() == id)
            .map(|pack| pack.name.clone())
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(state.max_logs as u16 + 2),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], state);
    match (&state.banner, &state.model) {
        (Some(message), _) => draw_banner(frame, chunks[1], message),
        (None, Some(model)) => draw_dashboard(frame, chunks[1], model, state.selected),
        (None, None) => draw_boxed(
            frame,
            chunks[1],
            "Dashboard",
            vec![Line::from("Waiting for first snapshot...")],
            Style::default(),
        ),
    }
    draw_command_line(frame, chunks[2], state);
    draw_logs(frame, chunks[3], state);
}

fn draw_boxed(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line>, border: Style) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title.to_string());
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let status = if state.banner.is_some() {
        Span::styled("Telemetry unavailable", Style::default().fg(Color::Red))
    } else if state.model.is_some() {
        Span::styled("Live", Style::default().fg(Color::Green))
    } else {
        Span::styled("Connecting", Style::default().fg(Color::Yellow))
    };
    let mut spans = vec![status, Span::raw(" | q exit | : command")];
    if let Some(last) = &state.last_command {
        spans.push(Span::raw(" | last: "));
        spans.push(Span::raw(last.clone()));
    }
    draw_boxed(
        frame,
        area,
        "BMS Dashboard",
        vec![Line::from(spans)],
        Style::default(),
    );
}

fn draw_banner(frame: &mut Frame, area: Rect, message: &str) {
    draw_boxed(
        frame,
        area,
        "Error",
        vec![Line::from(Span::styled(
            format!("Error fetching BMS data: {message}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))],
        Style::default().fg(Color::Red),
    );
}

fn draw_dashboard(frame: &mut Frame, area: Rect, model: &RenderModel, selected: usize) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(5)])
        .split(area);
    draw_global(frame, rows[0], &model.global);

    if model.packs.is_empty() {
        draw_boxed(
            frame,
            rows[1],
            "Packs",
            vec![Line::from("No packs reporting")],
            Style::default(),
        );
        return;
    }

    let count = model.packs.len() as u32;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, count); model.packs.len()])
        .split(rows[1]);
    for (index, (pack, column)) in model.packs.iter().zip(columns.iter()).enumerate() {
        draw_pack(frame, *column, pack, index == selected);
    }
}

fn draw_global(frame: &mut Frame, area: Rect, global: &GlobalPanel) {
    let stats = &global.stats;
    let mut lines = Vec::new();
    if let Some(cluster) = &global.cluster {
        lines.push(Line::from(vec![
            label("Packs "),
            Span::raw(cluster.number_of_packs.to_string()),
            label("  Bus "),
            Span::raw(fmt_opt(cluster.voltage, 2, "V")),
        ]));
    }
    lines.push(Line::from(vec![
        label("Voltage "),
        Span::raw(fmt_value(stats.mean_voltage, 2, "V")),
        label("  Current "),
        Span::raw(fmt_value(stats.sum_current, 2, "A")),
        label("  Temp "),
        Span::raw(fmt_value(stats.mean_temperature, 1, "°C")),
        label("  SOC "),
        Span::raw(fmt_value(stats.mean_soc, 1, "%")),
        label("  SOH "),
        Span::raw(fmt_value(stats.mean_soh, 1, "%")),
    ]));
    lines.push(Line::from(vec![
        label("Max cell "),
        Span::raw(fmt_extremum(stats.max_cell.as_ref())),
        label("  Min cell "),
        Span::raw(fmt_extremum(stats.min_cell.as_ref())),
    ]));
    lines.push(Line::from(vec![
        label("Errors "),
        Span::styled(
            fmt_names(&stats.packs_with_error),
            Style::default().fg(Color::Red),
        ),
        label("  Warnings "),
        Span::styled(
            fmt_names(&stats.packs_with_warning),
            Style::default().fg(Color::Yellow),
        ),
    ]));

    let mut mos = vec![label("MOS ")];
    for switch in &global.mos {
        let (text, color) = match switch.state {
            MosAggregate::FullyOn => ("ON", Color::Green),
            MosAggregate::PartiallyOn => ("PARTIAL", Color::Yellow),
            MosAggregate::Off => ("OFF", Color::DarkGray),
        };
        mos.push(Span::raw(format!("{} ", switch.label)));
        mos.push(Span::styled(text, Style::default().fg(color)));
        mos.push(Span::raw("  "));
    }
    lines.push(Line::from(mos));

    let mut bulk = vec![label("Bulk ")];
    for (key, action) in ["a", "A", "d", "D"].iter().zip(&global.bulk_commands) {
        bulk.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        bulk.push(Span::raw(format!(" {}  ", action.label)));
    }
    lines.push(Line::from(bulk));

    draw_boxed(frame, area, "Cluster", lines, Style::default());
}

fn draw_pack(frame: &mut Frame, area: Rect, pack: &PackPanel, selected: bool) {
    let header = header_color(pack.header);
    let mut lines = vec![
        Line::from(vec![
            label("State "),
            Span::styled(
                pack.state.to_string(),
                Style::default().fg(header).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            label("U "),
            Span::raw(fmt_opt(pack.voltage, 2, "V")),
            label("  I "),
            Span::raw(fmt_opt(pack.current, 2, "A")),
        ]),
        Line::from(vec![
            label("SOC "),
            Span::raw(fmt_opt(pack.state_of_charge, 1, "%")),
            label("  SOH "),
            Span::raw(fmt_opt(pack.state_of_health, 1, "%")),
        ]),
        Line::from(vec![
            label("Cap "),
            Span::raw(fmt_opt(pack.available_capacity, 1, "Ah")),
            Span::raw(" / "),
            Span::raw(fmt_opt(pack.total_capacity, 1, "Ah")),
            label("  Cycles "),
            Span::raw(fmt_opt(pack.cycle_count, 0, "")),
        ]),
        Line::from(vec![
            label("Die "),
            Span::raw(fmt_opt(pack.die_temperature, 1, "°C")),
            label("  PVDD "),
            Span::raw(fmt_opt(pack.pvdd_voltage, 2, "V")),
        ]),
        Line::from(vec![
            label("NTC "),
            Span::raw(fmt_list(&pack.ntc_temperature, 1)),
        ]),
        flags_line("Alerts ", &pack.alerts, Color::Red),
        flags_line("Warnings ", &pack.warnings, Color::Yellow),
    ];

    let mut mos = vec![label("MOS ")];
    for (index, switch) in pack.mos.iter().enumerate() {
        let color = if switch.on { Color::Green } else { Color::DarkGray };
        mos.push(Span::raw(format!("{}:{} ", index + 1, switch.label)));
        mos.push(Span::styled(
            if switch.on { "ON" } else { "OFF" },
            Style::default().fg(color),
        ));
        mos.push(Span::raw("  "));
    }
    lines.push(Line::from(mos));

    lines.push(Line::from(vec![
        label("Δ "),
        Span::raw(fmt_opt(pack.cell_spread.map(|v| v * 1000.0), 0, "mV")),
        label("  Balancing "),
        Span::raw(if pack.balancing_cells.is_empty() {
            "none".to_string()
        } else {
            pack.balancing_cells
                .iter()
                .map(|cell| format!("C{cell}"))
                .collect::<Vec<_>>()
                .join(" ")
        }),
    ]));
    for chunk in pack.cells.chunks(4) {
        let mut spans = Vec::new();
        for cell in chunk {
            let style = match cell.tag {
                CellTag::Max => Style::default().fg(Color::Red),
                CellTag::Min => Style::default().fg(Color::Cyan),
                CellTag::Normal => Style::default(),
            };
            spans.push(label(format!("C{:<2} ", cell.position)));
            spans.push(Span::styled(format!("{:.3}  ", cell.voltage), style));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(vec![
        label("Alive "),
        Span::raw(fmt_count(pack.alive_counter)),
        label("  SPI retries "),
        Span::raw(fmt_count(pack.spi_retries)),
    ]));

    let title = if selected {
        format!("> {}", pack.name)
    } else {
        pack.name.clone()
    };
    let mut border = Style::default().fg(header);
    if selected {
        border = border.add_modifier(Modifier::BOLD);
    }
    draw_boxed(frame, area, &title, lines, border);
}

fn draw_command_line(frame: &mut Frame, area: Rect, state: &UiState) {
    let line = match &state.command_line {
        Some(input) => Line::from(vec![
            Span::styled(":", Style::default().fg(Color::Yellow)),
            Span::raw(input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        None => Line::from(vec![
            Span::styled("←/→", Style::default().fg(Color::Yellow)),
            Span::raw(" select pack  "),
            Span::styled("1-3", Style::default().fg(Color::Yellow)),
            Span::raw(" toggle MOS on selected pack  "),
            Span::styled(":", Style::default().fg(Color::Yellow)),
            Span::raw(" type a command, e.g. charge_on 1"),
        ]),
    };
    draw_boxed(frame, area, "Commands", vec![line], Style::default());
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry.clone())))
        .collect();
    draw_boxed(frame, area, "Logs", lines, Style::default());
}

fn label<'a, S: Into<std::borrow::Cow<'a, str>>>(text: S) -> Span<'a> {
    Span::styled(text, Style::default().fg(Color::Gray))
}

fn flags_line(title: &'static str, flags: &DecodedFlags, color: Color) -> Line<'static> {
    let body = match flags {
        DecodedFlags::NoneActive => Span::styled("none", Style::default().fg(Color::DarkGray)),
        DecodedFlags::Active(labels) => {
            Span::styled(labels.join(", "), Style::default().fg(color))
        }
    };
    Line::from(vec![label(title), body])
}

fn header_color(class: HeaderClass) -> Color {
    match class {
        HeaderClass::NeutralDark => Color::DarkGray,
        HeaderClass::Danger => Color::Red,
        HeaderClass::Warning => Color::Yellow,
        HeaderClass::Primary => Color::Blue,
        HeaderClass::Secondary => Color::Gray,
    }
}

pub fn fmt_value(value: f64, precision: usize, unit: &str) -> String {
    if unit.is_empty() {
        format!("{value:.precision$}")
    } else {
        format!("{value:.precision$} {unit}")
    }
}

pub fn fmt_opt(value: Option<f64>, precision: usize, unit: &str) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| fmt_value(v, precision, unit))
}

fn fmt_count(value: Option<u32>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

fn fmt_list(values: &[f64], precision: usize) -> String {
    if values.is_empty() {
        return PLACEHOLDER.to_string();
    }
    values
        .iter()
        .map(|v| format!("{v:.precision$}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fmt_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn fmt_extremum(extremum: Option<&bms_core::CellExtremum>) -> String {
    match extremum {
        Some(cell) => format!("{:.3} V @ {}", cell.value, cell.location),
        None => PLACEHOLDER.to_string(),
    }
}
