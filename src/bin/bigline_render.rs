use bigline::cli::run_render_cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    run_render_cli()
}
