fn main() {
    if let Err(err) = datamend::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
