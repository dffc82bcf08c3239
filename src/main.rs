use std::process::exit;

fn main() {
    if let Err(e) = artdeck::app::run_cli() {
        eprintln!("error: {e}");
        exit(1);
    }
}
