fn main() -> std::process::ExitCode {
    merch_studio_lib::run()
}
