//! Pieslot command-line entry point.

fn main() {
    if let Err(err) = pieslot_lib::cli::run() {
        eprintln!("pieslot: {err}");
        std::process::exit(1);
    }
}
