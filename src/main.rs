use clap::{App, Arg};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::os::unix::io::RawFd;
use std::process;
use std::sync::Mutex;

const STDIN_FILENO: RawFd = 0;

/// The terminal settings as they were before we put stdin into raw
/// mode, so both normal exit paths and the `SIGINT` handler can put
/// it back. `None` until `enable_raw_mode` runs.
static ORIGINAL_TERMIOS: Mutex<Option<Termios>> = Mutex::new(None);

fn main() {
    let matches = match app().get_matches_safe() {
        Ok(matches) => matches,
        Err(e) if e.use_stderr() => {
            eprintln!("{}", e.message);
            process::exit(2);
        }
        Err(e) => {
            println!("{}", e.message);
            process::exit(0);
        }
    };

    let config = match lc3_emu::Config::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    };

    enable_raw_mode();
    install_sigint_handler();

    let result = lc3_emu::run(config);
    restore_terminal();

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(e.exit_code());
    }
}

fn app() -> App<'static, 'static> {
    App::new("lc3")
        .about("An emulator for the LC-3 educational computer architecture")
        .arg(
            Arg::with_name("IMAGE")
                .help("LC-3 object image(s) to load and run, in order.")
                .required(true)
                .multiple(true)
                .index(1),
        )
}

fn enable_raw_mode() {
    let original = termios::tcgetattr(STDIN_FILENO).unwrap_or_else(|err| {
        eprintln!("failed to read terminal settings: {}", err);
        process::exit(1);
    });

    let mut raw = original.clone();
    raw.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);

    termios::tcsetattr(STDIN_FILENO, SetArg::TCSANOW, &raw).unwrap_or_else(|err| {
        eprintln!("failed to set terminal to raw mode: {}", err);
        process::exit(1);
    });

    *ORIGINAL_TERMIOS.lock().unwrap() = Some(original);
}

fn restore_terminal() {
    if let Some(original) = ORIGINAL_TERMIOS.lock().unwrap().take() {
        let _ = termios::tcsetattr(STDIN_FILENO, SetArg::TCSANOW, &original);
    }
}

/// Restores the terminal and exits with the documented
/// interrupt-termination status. The guest program cannot observe or
/// mask this.
extern "C" fn handle_sigint(_signal: i32) {
    restore_terminal();
    process::exit(-2);
}

fn install_sigint_handler() {
    let handler = SigHandler::Handler(handle_sigint);
    // SAFETY: `handle_sigint` only touches a `Mutex<Option<Termios>>`
    // and calls `process::exit`, matching the reference
    // implementation's own interrupt handler.
    unsafe {
        signal::signal(Signal::SIGINT, handler).unwrap_or_else(|err| {
            eprintln!("failed to install SIGINT handler: {}", err);
            process::exit(1);
        });
    }
}
