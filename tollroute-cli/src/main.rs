//! Entry point for the `tollroute` command.
#![forbid(unsafe_code)]

#[expect(clippy::print_stderr, reason = "final report for the operator")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = tollroute_cli::run() {
        eprintln!("tollroute: {err}");
        std::process::exit(1);
    }
}
