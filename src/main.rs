use taxamend::ui::output;

fn main() {
    if let Err(err) = taxamend::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
