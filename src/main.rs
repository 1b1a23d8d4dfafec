fn main() {
    if let Err(err) = sheet_capture::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
