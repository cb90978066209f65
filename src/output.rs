//! Colored, user-facing console lines.
//! Colors are used only when the stream is a TTY so scripted output stays plain.

use owo_colors::{OwoColorize, Style};

use crate::descriptor::MoveStatus;

#[derive(Clone, Copy)]
enum Stream {
    Out,
    Err,
}

fn emit(stream: Stream, label: &str, style: Style, msg: &str) {
    let tty = match stream {
        Stream::Out => atty::is(atty::Stream::Stdout),
        Stream::Err => atty::is(atty::Stream::Stderr),
    };
    let line = if tty {
        format!("{} {}", label.style(style), msg)
    } else {
        format!("{label} {msg}")
    };
    match stream {
        Stream::Out => println!("{line}"),
        Stream::Err => eprintln!("{line}"),
    }
}

pub fn print_info(msg: &str) {
    emit(Stream::Out, "info:", Style::new().cyan().bold(), msg);
}

pub fn print_warn(msg: &str) {
    emit(Stream::Err, "warn:", Style::new().yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    emit(Stream::Err, "error:", Style::new().red().bold(), msg);
}

/// One result line per file, e.g. `moved: a.mkv -> /out/Show/Show.S01E01.mkv`.
pub fn print_move(status: MoveStatus, detail: &str) {
    let (label, style) = match status {
        MoveStatus::Renamed => ("moved:", Style::new().green().bold()),
        MoveStatus::NotFound => ("missing:", Style::new().yellow().bold()),
        _ => ("failed:", Style::new().red().bold()),
    };
    emit(Stream::Out, label, style, detail);
}
