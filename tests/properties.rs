use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use timeperiod_block::humanize::diff_seconds;
use timeperiod_block::{Decision, EvalContext, Params, TimePeriodBlock};

const MAX: i64 = 4_000_000_000;

fn at(secs: i64) -> String {
    format!("@{secs}")
}

fn live(secs: i64) -> EvalContext {
    EvalContext::live(Utc.timestamp_opt(secs, 0).unwrap())
}

proptest! {
    #[test]
    fn inside_window_shows(a in 0..MAX, b in 0..MAX, c in 0..MAX) {
        let mut v = [a, b, c];
        v.sort_unstable();
        let [start, now, end] = v;
        let block = TimePeriodBlock::default();
        let params = Params::new(Some(at(start).as_str()), Some(at(end).as_str()));
        prop_assert_eq!(block.evaluate(&params, &live(now)), Ok(Decision::Show));
    }

    #[test]
    fn outside_window_suppresses(start in 1..MAX, len in 0..1_000_000i64, before in 1..1_000_000i64) {
        let block = TimePeriodBlock::default();
        let params = Params::new(Some(at(start).as_str()), Some(at(start + len).as_str()));
        prop_assert_eq!(block.evaluate(&params, &live(start - before)), Ok(Decision::Suppress));
        prop_assert_eq!(block.evaluate(&params, &live(start + len + before)), Ok(Decision::Suppress));
    }

    #[test]
    fn single_bound_is_inclusive(bound in 0..MAX, now in 0..MAX) {
        let block = TimePeriodBlock::default();
        let from = block.evaluate(&Params::new(Some(at(bound).as_str()), None), &live(now)).unwrap();
        let until = block.evaluate(&Params::new(None, Some(at(bound).as_str())), &live(now)).unwrap();
        prop_assert_eq!(from == Decision::Show, now >= bound);
        prop_assert_eq!(until == Decision::Show, now <= bound);
    }

    #[test]
    fn evaluation_is_idempotent(start in 0..MAX, now in 0..MAX, debug in any::<bool>()) {
        let block = TimePeriodBlock::default();
        let ctx = EvalContext { debug, ..live(now) };
        let params = Params::new(Some(at(start).as_str()), None);
        prop_assert_eq!(block.evaluate(&params, &ctx), block.evaluate(&params, &ctx));
    }

    #[test]
    fn diff_is_symmetric(a in -MAX..MAX, b in -MAX..MAX) {
        prop_assert_eq!(diff_seconds(a, b), diff_seconds(b, a));
    }
}

#[test]
fn debug_notice_two_days_ahead() {
    let now = 1_700_000_000;
    let ctx = EvalContext { debug: true, ..live(now) };
    let params = Params::new(Some(at(now + 2 * 86_400).as_str()), None);
    assert_eq!(
        TimePeriodBlock::default().evaluate(&params, &ctx),
        Ok(Decision::DebugNotice("Content will be displayed in 2 day(s).".into()))
    );
    assert_eq!(
        TimePeriodBlock::default().evaluate(&params, &live(now)),
        Ok(Decision::Suppress)
    );
}
