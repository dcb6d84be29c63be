fn main() {
    if let Err(e) = dhcpscope::cli::run_with_args(std::env::args_os()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
