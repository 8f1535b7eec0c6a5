fn main() -> std::process::ExitCode {
    docgen_cli::run()
}
