//! The LED indicator board.
//!
//! The board is write-only from our side: every command is encoded with
//! [`WireCommand::to_bytes`] and pushed down the serial line. Line settings
//! (baud rate, parity) are configured on the device before the game starts.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::WireCommand;

/// Something that can display LED commands.
pub trait IndicatorBoard: Send {
    /// Send one command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the bytes could not be written.
    fn send(&mut self, command: &WireCommand) -> Result<()>;
}

/// An indicator board on a byte stream, normally a serial device.
#[derive(Debug)]
pub struct SerialIndicator<W> {
    writer: W,
    sent: u64,
}

impl SerialIndicator<File> {
    /// Open the serial device at `path` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the device cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(Error::Transport)?;
        info!("Indicator board opened at {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> SerialIndicator<W> {
    /// Wrap an existing writer.
    pub fn new(writer: W) -> Self {
        Self { writer, sent: 0 }
    }

    /// Number of commands written successfully.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> IndicatorBoard for SerialIndicator<W> {
    fn send(&mut self, command: &WireCommand) -> Result<()> {
        let bytes = command.to_bytes();
        self.writer.write_all(&bytes).map_err(Error::Transport)?;
        self.writer.flush().map_err(Error::Transport)?;
        self.sent += 1;
        trace!(?bytes, "Wrote indicator command");
        Ok(())
    }
}

/// A board that discards every command. Used when no port is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl IndicatorBoard for NullIndicator {
    fn send(&mut self, command: &WireCommand) -> Result<()> {
        debug!(?command, "No indicator board attached, dropping command");
        Ok(())
    }
}

/// Open the board on `port`, falling back to [`NullIndicator`] when no port is
/// configured or the device cannot be opened.
pub fn open_or_null(port: Option<&Path>) -> Box<dyn IndicatorBoard> {
    let Some(port) = port else {
        info!("No indicator port configured, LED commands are discarded");
        return Box::new(NullIndicator);
    };
    match SerialIndicator::open(port) {
        Ok(board) => Box::new(board),
        Err(e) => {
            warn!(
                "Indicator board {} unavailable, playing without LEDs: {e}",
                port.display()
            );
            Box::new(NullIndicator)
        }
    }
}

impl<B: IndicatorBoard + ?Sized> IndicatorBoard for Box<B> {
    fn send(&mut self, command: &WireCommand) -> Result<()> {
        (**self).send(command)
    }
}
