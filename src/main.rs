fn main() -> anyhow::Result<()> {
    gesturectl::logging::init();
    gesturectl::cli::run()
}
