fn main() {
    if let Err(err) = sentilens_lib::run() {
        eprintln!("sentilens: {err:#}");
        std::process::exit(1);
    }
}
