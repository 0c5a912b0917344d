use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Configures a stdout layer plus a daily-rolling file layer under `logs/`.
///
/// Mirrors the teacher's `configure_logging`: terse on stdout, verbose
/// (including LLM request bodies) in the file sink.
pub fn configure_logging() {
    std::fs::create_dir_all("logs").ok();

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(EnvFilter::new("info,sqlx=warn"));

    let file_appender = rolling::daily("logs", "newsloom.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_filter(EnvFilter::new("llm_request=debug,info,sqlx=info"));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
