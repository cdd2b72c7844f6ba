use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bms_core::{CommandAction, DisplayTables};
use bms_runtime::{
    parse_command_line, BulkCommand, CommandDispatcher, CommandRequest, DispatchOutcome,
};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::poll::PollEvent;
use crate::ui::{draw_ui, UiState};

pub struct InspectorApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    receiver: UnboundedReceiver<PollEvent>,
    dispatcher: CommandDispatcher,
    outcomes: crossbeam_channel::Receiver<DispatchOutcome>,
    shutdown_sender: Sender<()>,
    log_receiver: Receiver<String>,
    tables: Arc<DisplayTables>,
}

impl InspectorApp {
    pub fn new(
        receiver: UnboundedReceiver<PollEvent>,
        dispatcher: CommandDispatcher,
        outcomes: crossbeam_channel::Receiver<DispatchOutcome>,
        shutdown_sender: Sender<()>,
        log_receiver: Receiver<String>,
        tables: Arc<DisplayTables>,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self {
            terminal,
            ui_state: UiState::default(),
            receiver,
            dispatcher,
            outcomes,
            shutdown_sender,
            log_receiver,
            tables,
        })
    }

    /// Runs until the operator quits; the terminal is restored on every exit path.
    pub fn run(mut self) -> Result<()> {
        let result = self.event_loop();
        let _ = self.terminal.show_cursor();
        let restored = crossterm::terminal::disable_raw_mode();
        let _ = self.shutdown_sender.send(());
        result?;
        restored?;
        Ok(())
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut last_draw = Instant::now();

        loop {
            while let Ok(event) = self.receiver.try_recv() {
                self.ui_state.apply(event);
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            while let Ok(outcome) = self.outcomes.try_recv() {
                self.ui_state.last_command = Some(describe_outcome(&outcome));
            }

            if last_draw.elapsed() >= Duration::from_millis(100) {
                self.terminal.draw(|frame| draw_ui(frame, &self.ui_state))?;
                last_draw = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.ui_state.command_line.is_some() {
                        self.handle_command_key(key);
                    } else if !self.handle_key(key) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns `false` when the operator asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char(':') => self.ui_state.command_line = Some(String::new()),
            KeyCode::Right | KeyCode::Char('l') => self.ui_state.select_next(),
            KeyCode::Left | KeyCode::Char('h') => self.ui_state.select_previous(),
            KeyCode::Char(c) => {
                if let Some(command) = bulk_command_for_key(c) {
                    self.submit(command.request());
                } else if let Some(index) = c.to_digit(10).and_then(|d| d.checked_sub(1)) {
                    self.toggle_switch(index as usize);
                }
            }
            _ => {}
        }
        true
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        let Some(input) = self.ui_state.command_line.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.ui_state.command_line = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Enter => {
                let line = self.ui_state.command_line.take().unwrap_or_default();
                if line.trim().is_empty() {
                    return;
                }
                let ui_state = &self.ui_state;
                match parse_command_line(&line, |id| resolve_pack(ui_state, &self.tables, id)) {
                    Ok(request) => self.submit(request),
                    Err(err) => {
                        warn!(
                            target: "bms::inspector",
                            input = %line,
                            error = %err,
                            "command.rejected"
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn toggle_switch(&self, index: usize) {
        let Some(pack) = self.ui_state.selected_pack() else {
            warn!(target: "bms::inspector", "No pack selected");
            return;
        };
        let Some(switch) = pack.mos.get(index) else {
            return;
        };
        let action: &CommandAction = if switch.on {
            &switch.turn_off
        } else {
            &switch.turn_on
        };
        let request = action.request.clone();
        self.submit(request);
    }

    fn submit(&self, request: CommandRequest) {
        let summary = describe_request(&request);
        match self.dispatcher.submit(request) {
            Ok(()) => info!(target: "bms::inspector", "Requested {summary}"),
            Err(err) => error!(target: "bms::inspector", "Failed to queue {summary}: {err}"),
        }
    }
}

/// Hot keys for the cluster-wide commands on the global panel.
pub fn bulk_command_for_key(key: char) -> Option<BulkCommand> {
    match key {
        'a' => Some(BulkCommand::ChargeOn),
        'A' => Some(BulkCommand::ChargeOff),
        'd' => Some(BulkCommand::DischargeOn),
        'D' => Some(BulkCommand::DischargeOff),
        _ => None,
    }
}

/// Pack ids typed on the command line name packs on screen; before the
/// first snapshot they fall back to the configured name table.
fn resolve_pack(state: &UiState, tables: &DisplayTables, id: u32) -> Option<String> {
    match state.model {
        Some(_) => state.pack_name(id),
        None => tables.pack_name(id).map(|_| tables.pack_display_name(id)),
    }
}

fn describe_request(request: &CommandRequest) -> String {
    match &request.pack {
        Some(pack) => format!("{} for {}", request.cmd, pack),
        None => format!("{} for all packs", request.cmd),
    }
}

fn describe_outcome(outcome: &DispatchOutcome) -> String {
    match &outcome.result {
        Ok(()) => format!("{} sent", describe_request(&outcome.request)),
        Err(err) => format!("{} failed: {}", describe_request(&outcome.request), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bms_runtime::DispatchError;

    #[test]
    fn bulk_hot_keys_cover_all_commands() {
        let mapped: Vec<BulkCommand> = ['a', 'A', 'd', 'D']
            .into_iter()
            .filter_map(bulk_command_for_key)
            .collect();
        assert_eq!(mapped, BulkCommand::ALL.to_vec());
        assert_eq!(bulk_command_for_key('x'), None);
    }

    #[test]
    fn unseen_packs_resolve_through_tables_before_first_snapshot() {
        let tables = DisplayTables::builtin();
        let state = UiState::default();
        assert_eq!(
            resolve_pack(&state, &tables, 1).as_deref(),
            Some("Pack 1 - EVE MB31 314Ah")
        );
        assert_eq!(resolve_pack(&state, &tables, 9), None);
    }

    #[test]
    fn outcomes_are_summarised_for_the_status_line() {
        let sent = DispatchOutcome {
            request: BulkCommand::ChargeOn.request(),
            result: Ok(()),
        };
        assert_eq!(describe_outcome(&sent), "charge_on_all for all packs sent");

        let failed = DispatchOutcome {
            request: CommandRequest {
                cmd: "charge_off".into(),
                pack: Some("Pack 2".into()),
            },
            result: Err(DispatchError::Status(500)),
        };
        assert_eq!(
            describe_outcome(&failed),
            "charge_off for Pack 2 failed: command endpoint answered HTTP 500"
        );
    }
}
