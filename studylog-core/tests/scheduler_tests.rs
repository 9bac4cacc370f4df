use studylog_core::{advance, MemoryState, Outcome, EF_DEFAULT, EF_MIN};

#[test]
fn grade_table_is_total_and_stable() {
    assert_eq!(Outcome::Again.grade(), 0);
    assert_eq!(Outcome::Fail.grade(), 1);
    assert_eq!(Outcome::Hard.grade(), 2);
    assert_eq!(Outcome::Good.grade(), 3);
    assert_eq!(Outcome::Easy.grade(), 4);

    assert!(!Outcome::Hard.is_success());
    assert!(Outcome::Good.is_success());
}

#[test]
fn easy_from_new() {
    let s = advance(MemoryState::default(), Outcome::Easy);

    assert_eq!(s.reps, 1);
    assert_eq!(s.interval_days, 1);
    assert!(s.ef > EF_DEFAULT);
}

#[test]
fn good_progression() {
    // good leaves the ease factor untouched, so the ladder is 1, 6, 15.
    let s1 = advance(MemoryState::default(), Outcome::Good);
    assert_eq!((s1.interval_days, s1.reps), (1, 1));
    assert!((s1.ef - EF_DEFAULT).abs() < 1e-6);

    let s2 = advance(s1, Outcome::Good);
    assert_eq!((s2.interval_days, s2.reps), (6, 2));

    let s3 = advance(s2, Outcome::Good);
    assert_eq!((s3.interval_days, s3.reps), (15, 3));
}

#[test]
fn low_grades_reset_streak_and_interval() {
    for outcome in [Outcome::Again, Outcome::Fail, Outcome::Hard] {
        let mut s = MemoryState::default();
        for _ in 0..3 {
            s = advance(s, Outcome::Good);
        }
        let after = advance(s, outcome);

        assert_eq!(after.reps, 0);
        assert_eq!(after.interval_days, 1);
        assert!(after.ef < s.ef);
    }
}

#[test]
fn high_grades_never_decrease_reps() {
    for outcome in [Outcome::Good, Outcome::Easy] {
        let mut s = MemoryState::default();
        for _ in 0..10 {
            let next = advance(s, outcome);
            assert_eq!(next.reps, s.reps + 1);
            s = next;
        }
    }
}

#[test]
fn interval_grows_monotonically_under_success() {
    let mut s = advance(MemoryState::default(), Outcome::Easy);
    for _ in 0..8 {
        let next = advance(s, Outcome::Easy);
        assert!(next.interval_days >= s.interval_days);
        s = next;
    }
}

#[test]
fn ef_clamps_at_floor() {
    let mut s = MemoryState::default();
    for _ in 0..20 {
        s = advance(s, Outcome::Again);
        assert!(s.ef >= EF_MIN);
    }
    assert!((s.ef - EF_MIN).abs() < 1e-6);
}
