//! `ownership run` -- dispatch one mode and print the envelope.
//!
//! For schedulers and automation that want the function's behavior without
//! an HTTP hop. Exit code 0 for success envelopes (including "No data
//! found"), 1 for error envelopes.

use ownership_core::Dispatcher;

pub(crate) async fn cmd_run(dispatcher: &Dispatcher, mode: Option<&str>) -> i32 {
    let envelope = dispatcher.handle(mode).await;

    match serde_json::to_string_pretty(&envelope) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", String::from_utf8_lossy(&envelope.render().body)),
    }

    if envelope.is_error() {
        1
    } else {
        0
    }
}
