//! The process-wide logger.
//!
//! Lives in its own test binary: once installed, the logger cannot be
//! replaced for the rest of the process.

use std::sync::{Arc, Mutex};

use http_support::log::{logger, set_logger};
use http_support::{Level, Logger, Options};
use serde_json::json;

type Entries = Arc<Mutex<Vec<(Level, String, Options)>>>;

struct Recorder {
    entries: Entries,
}

impl Logger for Recorder {
    fn log(&self, level: Level, message: &str, context: &Options) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string(), context.clone()));
    }
}

#[test]
fn default_logger_is_set_once() {
    let installed: Entries = Arc::default();
    set_logger(Box::new(Recorder {
        entries: Arc::clone(&installed),
    }))
    .unwrap_or_else(|_| panic!("first install must succeed"));

    let mut context = Options::new();
    context.insert("order".to_string(), json!(12));
    logger().warning("retrying capture", &context);
    logger().debug("capture sent", &Options::new());

    assert_eq!(
        *installed.lock().unwrap(),
        vec![
            (Level::Warning, "retrying capture".to_string(), context),
            (Level::Debug, "capture sent".to_string(), Options::new()),
        ]
    );

    let rejected_entries: Entries = Arc::default();
    let rejected = match set_logger(Box::new(Recorder {
        entries: Arc::clone(&rejected_entries),
    })) {
        Ok(()) => panic!("second install must be rejected"),
        Err(rejected) => rejected,
    };

    // The rejected logger comes back intact and the first one stays active.
    rejected.info("handed back", &Options::new());
    logger().error("still routed", &Options::new());

    assert_eq!(
        *rejected_entries.lock().unwrap(),
        vec![(Level::Info, "handed back".to_string(), Options::new())]
    );
    let installed = installed.lock().unwrap();
    assert_eq!(installed.len(), 3);
    assert_eq!(installed[2].0, Level::Error);
    assert_eq!(installed[2].1, "still routed");
}
