fn main() {
    let args: Vec<String> = std::env::args().collect();
    gto_cli::cli::run_with_args(args);
}
