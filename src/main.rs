fn main() {
    if let Err(err) = sheet_analyst::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
