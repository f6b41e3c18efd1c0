use std::str::FromStr;

use stopwatch_core::Clock;

use crate::ticker::StopwatchTicker;

pub const HELP_TEXT: &str = "\
Keys (then ENTER):
  1 - start left stopwatch
  2 - start right stopwatch
  p - pause both
  s - stop both (resets to zero)
  h - this help
  q - quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the stopwatch at this index.
    Start(usize),
    PauseAll,
    StopAll,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}, press h for help")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(CommandError::Empty),
            "1" => Ok(Command::Start(0)),
            "2" => Ok(Command::Start(1)),
            "p" | "P" => Ok(Command::PauseAll),
            "s" | "S" => Ok(Command::StopAll),
            "h" | "H" | "?" => Ok(Command::Help),
            "q" | "Q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

impl Command {
    /// Applies a stopwatch command. `Help` and `Quit` are handled by the caller.
    pub fn apply<C: Clock + ?Sized + 'static>(self, tickers: &mut [StopwatchTicker<C>]) {
        match self {
            Command::Start(idx) => match tickers.get_mut(idx) {
                Some(ticker) => ticker.start(),
                None => log::warn!("no stopwatch at slot {}", idx + 1),
            },
            Command::PauseAll => tickers.iter_mut().for_each(StopwatchTicker::pause),
            Command::StopAll => tickers.iter_mut().for_each(StopwatchTicker::stop),
            Command::Help | Command::Quit => {}
        }
    }
}
