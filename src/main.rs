mod command;
mod config;
mod ticker;

use std::io::Write;
use std::sync::Arc;

use env_logger::{Builder, Env};
use stopwatch_core::SystemClock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::command::{Command, CommandError, HELP_TEXT};
use crate::config::TickerConfig;
use crate::ticker::StopwatchTicker;

const APP_NAME: &str = "Stopwatch";

/// Redraws both stopwatches on one line whenever either publishes.
async fn display_loop(mut left: watch::Receiver<String>, mut right: watch::Receiver<String>) {
    loop {
        {
            let line = format!(
                "\r  {}    {}  ",
                *left.borrow_and_update(),
                *right.borrow_and_update()
            );
            let mut out = std::io::stdout().lock();
            if out.write_all(line.as_bytes()).and_then(|_| out.flush()).is_err() {
                break;
            }
        }
        tokio::select! {
            changed = left.changed() => if changed.is_err() { break },
            changed = right.changed() => if changed.is_err() { break },
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = TickerConfig::from_env()?;
    log::info!("{} starting, tick every {:?}", APP_NAME, config.tick_interval);

    // One clock for the whole process, handed to each stopwatch
    let clock = Arc::new(SystemClock);
    let mut tickers = [
        StopwatchTicker::new("left", Arc::clone(&clock), config.clone()),
        StopwatchTicker::new("right", clock, config),
    ];

    println!("{}", HELP_TEXT);
    let display = tokio::spawn(display_loop(tickers[0].subscribe(), tickers[1].subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("\n{}", HELP_TEXT),
            Ok(cmd) => cmd.apply(&mut tickers),
            Err(CommandError::Empty) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    for ticker in tickers.iter_mut() {
        log::info!("{}: final reading {}", ticker.name(), ticker.current());
        ticker.stop();
    }
    // Closing the channels ends the display loop
    drop(tickers);
    display.await?;
    log::info!("{} exiting", APP_NAME);
    Ok(())
}
