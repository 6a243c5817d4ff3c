fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match steamcount_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[steamcount-core] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = steamcount_core::runtime::run_with_options(options) {
        eprintln!("[steamcount-core] {error}");
        std::process::exit(1);
    }
}
