fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talent_tree_planner=info".into()),
        )
        .init();

    if let Err(err) = talent_tree_planner::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
