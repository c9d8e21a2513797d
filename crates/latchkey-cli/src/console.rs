//! Line-oriented operator console.
//!
//! Reads commands from an input stream, forwards them to the controller's
//! command queue, and prints a display line whenever the controller status
//! changes. With mock devices the console also plays the hardware: it can
//! present and remove tags and attach or detach the reader.

use anyhow::{Result, bail};
use latchkey_controller::Command;
use latchkey_core::StatusSnapshot;
use latchkey_hardware::mock::MockTagReaderHandle;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

const HELP: &str = "\
commands:
  status            record the current status
  lock | unlock     force the door
  antenna on|off    switch the reader antenna
  exit | quit       lock, close devices and exit
mock devices only:
  tag <id>          present a tag to the reader
  remove            take the tag away
  detach | attach   unplug or replug the reader";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Controller(Command),
    PresentTag(String),
    RemoveTag,
    Detach,
    Attach,
    Help,
    Empty,
}

/// Parse a console line.
pub fn parse_line(line: &str) -> Result<ConsoleInput> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ConsoleInput::Empty);
    };
    let arg = words.next();
    if words.next().is_some() {
        bail!("too many arguments: {line}");
    }

    let input = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("status", None) => ConsoleInput::Controller(Command::StatusDump),
        ("lock", None) => ConsoleInput::Controller(Command::ManualLock),
        ("unlock", None) => ConsoleInput::Controller(Command::ManualUnlock),
        ("antenna", Some("on")) => ConsoleInput::Controller(Command::ToggleAntenna(true)),
        ("antenna", Some("off")) => ConsoleInput::Controller(Command::ToggleAntenna(false)),
        ("exit" | "quit", None) => ConsoleInput::Controller(Command::Exit),
        ("tag", Some(id)) => ConsoleInput::PresentTag(id.to_string()),
        ("remove", None) => ConsoleInput::RemoveTag,
        ("detach", None) => ConsoleInput::Detach,
        ("attach", None) => ConsoleInput::Attach,
        ("help" | "?", None) => ConsoleInput::Help,
        _ => bail!("unknown command: {line} (try `help`)"),
    };
    Ok(input)
}

/// Display line for a status snapshot.
pub fn render(snapshot: &StatusSnapshot) -> String {
    let antenna = if snapshot.antenna_on {
        "antenna on"
    } else {
        "antenna off"
    };
    format!(
        "{}  [{}]  ({})",
        snapshot.tag_label(),
        snapshot.lock_state.label(),
        antenna
    )
}

/// Operator console bound to a running controller.
pub struct Console {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<StatusSnapshot>,
    reader: Option<MockTagReaderHandle>,
}

impl Console {
    pub fn new(
        commands: mpsc::Sender<Command>,
        status: watch::Receiver<StatusSnapshot>,
        reader: Option<MockTagReaderHandle>,
    ) -> Self {
        Self {
            commands,
            status,
            reader,
        }
    }

    /// Serve the console until the controller stops listening.
    ///
    /// End of input stops reading but keeps the controller running until
    /// Ctrl-C.
    pub async fn run<I>(mut self, input: I)
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut input_open = true;
        let mut display_open = true;
        let mut interrupted = false;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = self.commands.closed() => break,
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => {
                        debug!("Console input closed");
                        input_open = false;
                    }
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        input_open = false;
                    }
                },
                changed = self.status.changed(), if display_open => match changed {
                    Ok(()) => println!("{}", render(&self.status.borrow_and_update())),
                    Err(_) => display_open = false,
                },
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    self.send(Command::Exit).await;
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let input = match parse_line(line) {
            Ok(input) => input,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        match input {
            ConsoleInput::Controller(command) => self.send(command).await,
            ConsoleInput::Help => println!("{HELP}"),
            ConsoleInput::Empty => {}
            mock => {
                if let Err(e) = self.drive_mock(mock).await {
                    println!("{e}");
                }
            }
        }
    }

    async fn drive_mock(&self, input: ConsoleInput) -> Result<()> {
        let Some(reader) = &self.reader else {
            bail!("only available with mock devices");
        };

        match input {
            ConsoleInput::PresentTag(id) => reader.present_tag(&id).await?,
            ConsoleInput::RemoveTag => reader.remove_tag().await?,
            ConsoleInput::Detach => reader.detach().await?,
            ConsoleInput::Attach => reader.attach().await?,
            _ => {}
        }
        Ok(())
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            debug!("Controller no longer accepting commands");
        }
    }
}
