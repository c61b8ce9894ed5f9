fn main() -> std::process::ExitCode {
    folio_lib::run()
}
