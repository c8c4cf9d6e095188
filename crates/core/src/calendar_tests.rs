use super::*;

fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid local time")
}

#[test]
fn monthly_day_of_month_spec_rolls_over_the_month() {
    // spec.md §8 scenario 5.
    let spec = CalendarSpec {
        minute: Some(30),
        hour: Some(4),
        day_of_month: Some(1),
        ..Default::default()
    };
    let reference = local(2025, 3, 1, 4, 31);
    let fire = next_fire(&spec, reference);
    assert_eq!(fire, local(2025, 4, 1, 4, 30));
}

#[test]
fn next_fire_is_always_strictly_after_reference() {
    let spec = CalendarSpec {
        minute: Some(0),
        ..Default::default()
    };
    let reference = local(2025, 6, 15, 10, 0);
    let fire = next_fire(&spec, reference);
    assert!(fire > reference);
}

#[test]
fn wildcard_spec_fires_on_the_very_next_minute() {
    let spec = CalendarSpec::default();
    let reference = local(2025, 1, 1, 0, 0);
    let fire = next_fire(&spec, reference);
    assert_eq!(fire, local(2025, 1, 1, 0, 1));
}

#[test]
fn weekday_and_day_of_month_both_set_takes_the_earlier_candidate() {
    // Jan 1 2025 is a Wednesday (weekday 3). Ask for the 15th OR any
    // Wednesday at 09:00; the next Wednesday arrives before the 15th.
    let spec = CalendarSpec {
        day_of_month: Some(15),
        weekday: Some(3),
        hour: Some(9),
        minute: Some(0),
        ..Default::default()
    };
    let reference = local(2025, 1, 1, 0, 0);
    let fire = next_fire(&spec, reference);
    assert!(fire < local(2025, 1, 15, 9, 0));
    assert_eq!(fire.weekday().num_days_from_sunday(), 3);
}

#[test]
fn result_always_satisfies_every_declared_field() {
    let spec = CalendarSpec {
        month: Some(5),
        hour: Some(12),
        minute: Some(0),
        ..Default::default()
    };
    let reference = local(2025, 1, 1, 0, 0);
    let fire = next_fire(&spec, reference);
    assert_eq!(fire.month0(), 5);
    assert_eq!(fire.hour(), 12);
    assert_eq!(fire.minute(), 0);
}
