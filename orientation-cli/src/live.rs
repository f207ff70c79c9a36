use std::{sync::Arc, thread};

use anyhow::Result;
use futures_util::{pin_mut, StreamExt};
use log::{error, warn};
use orientation_host_lib::{
    store::OrientationStore, AppPaths, Clock, CsvExporter, Dashboard, OrientationSession,
    SensorSource, SessionConfig,
};
use rustyline::{error::ReadlineError, DefaultEditor, ExternalPrinter};
use tokio::sync::{mpsc, oneshot};

const HELP: &str = "commands: chart (toggle chart), export (write CSV), show, help, quit\n";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    ToggleChart,
    Export,
    Show,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let command = match line.trim() {
            "" => return None,
            "chart" | "c" => Command::ToggleChart,
            "export" | "e" => Command::Export,
            "show" | "s" => Command::Show,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// Blocking line editor loop, runs on its own thread.
fn read_commands(mut editor: DefaultEditor, commands: mpsc::Sender<Command>) {
    loop {
        let command = match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match Command::parse(&line) {
                    Some(command) => command,
                    None => continue,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Command::Quit,
            Err(e) => {
                warn!("input error: {}", e);
                Command::Quit
            }
        };
        let quit = command == Command::Quit;
        if commands.blocking_send(command).is_err() || quit {
            break;
        }
    }
}

pub async fn live(
    config: &SessionConfig,
    paths: &AppPaths,
    source: Box<dyn SensorSource>,
    store: Arc<dyn OrientationStore>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let (command_tx, mut command_rx) = mpsc::channel(8);
    let (printer_tx, printer_rx) = oneshot::channel();
    // not joined, it may still be blocked in readline when the feed ends
    thread::spawn(move || {
        let setup = DefaultEditor::new().and_then(|mut editor| {
            let printer = editor.create_external_printer()?;
            Ok((editor, printer))
        });
        match setup {
            Ok((editor, printer)) => {
                let _ = printer_tx.send(Ok(printer));
                read_commands(editor, command_tx);
            }
            Err(e) => {
                let _ = printer_tx.send(Err(e));
            }
        }
    });
    let mut printer = printer_rx.await??;

    let session = OrientationSession::start(config, source, store, clock);
    let exporter = CsvExporter::new(&paths.csv_export);
    run_session(session, &exporter, &mut printer, &mut command_rx).await
}

/// Drives the view until quit or error, then always shuts the session down.
async fn run_session(
    session: OrientationSession,
    exporter: &CsvExporter,
    printer: &mut impl ExternalPrinter,
    commands: &mut mpsc::Receiver<Command>,
) -> Result<()> {
    let result = view_loop(&session, exporter, printer, commands).await;
    session.shutdown().await;
    result
}

async fn view_loop(
    session: &OrientationSession,
    exporter: &CsvExporter,
    printer: &mut impl ExternalPrinter,
    commands: &mut mpsc::Receiver<Command>,
) -> Result<()> {
    let query = session.query();
    printer.print(HELP.to_string())?;
    let mut dashboard = Dashboard::new();
    let feed = query.latest_feed();
    pin_mut!(feed);

    loop {
        tokio::select! {
            latest = feed.next() => match latest {
                Some(Ok(records)) => {
                    dashboard.apply_latest(records);
                    printer.print(dashboard.render())?;
                }
                Some(Err(e)) => warn!("failed to load latest records: {}", e),
                None => {
                    warn!("persister stopped, leaving live view");
                    return Ok(());
                }
            },
            command = commands.recv() => match command.unwrap_or(Command::Quit) {
                Command::ToggleChart => {
                    let visible = dashboard.toggle_chart();
                    printer.print(format!("chart {}\n", if visible { "on" } else { "off" }))?;
                    printer.print(dashboard.render())?;
                }
                Command::Export => match dashboard.export_history(&query, exporter).await {
                    Ok(rows) => printer.print(format!(
                        "Exported {} records to {:?}\n",
                        rows,
                        exporter.path()
                    ))?,
                    Err(e) => error!("export failed: {:?}", e),
                },
                Command::Show => printer.print(dashboard.render())?,
                Command::Help => printer.print(HELP.to_string())?,
                Command::Unknown(other) => printer.print(format!("unknown command {:?}\n{}", other, HELP))?,
                Command::Quit => return Ok(()),
            }
        }
    }
}
