// Kept in its own test binary: the built-in registry behind
// `render_timeperiod` fixes "now" for the whole process.
use serde_json::json;
use timeperiod_block::context::RequestParams;
use timeperiod_block::reporter::{CollectingReporter, Level};
use timeperiod_block::{render_timeperiod, USE_TIME_PARAM};

#[test]
fn test_override_is_read_once_per_process() {
    let rep = CollectingReporter::new();
    let pinned = RequestParams::new().with(USE_TIME_PARAM, "2030-01-01");
    let window = json!({"start": "2029-12-31", "end": "2030-01-02"});
    let window = window.as_object().unwrap();

    assert_eq!(render_timeperiod(window, "new year", &pinned, &rep).unwrap(), "new year");
    assert_eq!(render_timeperiod(window, "new year", &pinned, &rep).unwrap(), "new year");

    // a later request without the override still sees the pinned time
    let out = render_timeperiod(window, "new year", &RequestParams::new(), &rep).unwrap();
    assert_eq!(out, "new year");

    let reports = rep.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].level, Level::Notice);
    assert_eq!(reports[0].message, "Using test time for timeperiod: 01/01/2030 00:00:00");
}
