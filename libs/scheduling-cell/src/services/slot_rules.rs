// libs/scheduling-cell/src/services/slot_rules.rs
//
// Pure time-grid rules shared by the grid admin op, the availability
// calculator and the reservation allocator. No I/O here.
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

use crate::models::{SchedulingError, SlotSpec, SlotSpecViolation};

/// Fixed width of a facility grid window.
pub const SLOT_MINUTES: i64 = 30;
/// Granularity at which reservation start times may be requested.
pub const RESERVATION_STEP_MINUTES: i64 = 15;

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn operating_start() -> NaiveTime {
    hm(9, 0)
}

pub fn operating_end() -> NaiveTime {
    hm(18, 0)
}

pub fn lunch_start() -> NaiveTime {
    hm(12, 0)
}

pub fn lunch_end() -> NaiveTime {
    hm(13, 0)
}

/// Validate a candidate grid-slot definition. Each rule fails with its own
/// violation kind so the admin surface can report a precise cause.
pub fn validate_slot_spec(
    start_time: NaiveTime,
    end_time: NaiveTime,
    capacity: i32,
) -> Result<(), SchedulingError> {
    if capacity <= 0 {
        return Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Capacity));
    }
    let span = end_time.signed_duration_since(start_time);
    if span != Duration::minutes(SLOT_MINUTES) {
        return Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Range));
    }
    if start_time.minute() % 15 != 0 || end_time.minute() % 15 != 0 {
        return Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Alignment));
    }
    if start_time < operating_start() || end_time > operating_end() {
        return Err(SchedulingError::InvalidSlotSpec(
            SlotSpecViolation::OperatingHours,
        ));
    }
    if !(end_time <= lunch_start() || start_time >= lunch_end()) {
        return Err(SchedulingError::InvalidSlotSpec(
            SlotSpecViolation::LunchWindow,
        ));
    }
    Ok(())
}

/// Validate a full replacement grid. An empty list is rejected outright;
/// accepting it would wipe the facility grid in one call.
pub fn validate_grid_specs(specs: &[SlotSpec]) -> Result<(), SchedulingError> {
    if specs.is_empty() {
        return Err(SchedulingError::EmptyGrid);
    }
    for spec in specs {
        validate_slot_spec(spec.start_time, spec.end_time, spec.capacity)?;
    }
    Ok(())
}

/// Reservation start times may only land on 15-minute boundaries.
pub fn validate_alignment(start_at: DateTime<Utc>) -> Result<(), SchedulingError> {
    if start_at.minute() % 15 != 0 {
        return Err(SchedulingError::MisalignedStart);
    }
    Ok(())
}

/// Expand a requested start + duration into the ordered 30-minute windows
/// the reservation occupies. The anchor is the start truncated down to the
/// nearest 15-minute mark with seconds discarded, so a :15/:45 request
/// yields windows (e.g. 10:15-10:45) that can never match the :00/:30 grid;
/// the allocator rejects those as an operating-hours conflict rather than
/// silently realigning them.
pub fn expand_reservation(
    start_at: DateTime<Utc>,
    duration_minutes: i32,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, SchedulingError> {
    if duration_minutes <= 0 || duration_minutes % 30 != 0 {
        return Err(SchedulingError::InvalidDuration);
    }

    let truncated_minute = start_at.minute() - start_at.minute() % 15;
    let mut cursor = start_at
        .with_minute(truncated_minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(start_at);

    let mut windows = Vec::with_capacity((duration_minutes / 30) as usize);
    let mut remaining = i64::from(duration_minutes);
    while remaining > 0 {
        let window_end = cursor + Duration::minutes(SLOT_MINUTES);
        windows.push((cursor, window_end));
        cursor = window_end;
        remaining -= SLOT_MINUTES;
    }
    Ok(windows)
}

/// Project expanded windows to their time-of-day keys for lookup against
/// the grid, which is defined on times, not dates.
pub fn slot_keys(windows: &[(DateTime<Utc>, DateTime<Utc>)]) -> Vec<(NaiveTime, NaiveTime)> {
    windows
        .iter()
        .map(|(start, end)| (start.time(), end.time()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn slot_spec_accepts_a_clean_morning_window() {
        assert!(validate_slot_spec(hm(10, 0), hm(10, 30), 2).is_ok());
        assert!(validate_slot_spec(hm(9, 0), hm(9, 30), 1).is_ok());
        assert!(validate_slot_spec(hm(17, 30), hm(18, 0), 5).is_ok());
    }

    #[test]
    fn slot_spec_rejects_each_rule_with_its_own_kind() {
        assert_matches!(
            validate_slot_spec(hm(10, 0), hm(10, 30), 0),
            Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Capacity))
        );
        assert_matches!(
            validate_slot_spec(hm(10, 0), hm(11, 0), 1),
            Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Range))
        );
        assert_matches!(
            validate_slot_spec(hm(10, 30), hm(10, 0), 1),
            Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Range))
        );
        assert_matches!(
            validate_slot_spec(
                NaiveTime::from_hms_opt(10, 5, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 35, 0).unwrap(),
                1
            ),
            Err(SchedulingError::InvalidSlotSpec(SlotSpecViolation::Alignment))
        );
        assert_matches!(
            validate_slot_spec(hm(8, 30), hm(9, 0), 1),
            Err(SchedulingError::InvalidSlotSpec(
                SlotSpecViolation::OperatingHours
            ))
        );
        assert_matches!(
            validate_slot_spec(hm(17, 45), hm(18, 15), 1),
            Err(SchedulingError::InvalidSlotSpec(
                SlotSpecViolation::OperatingHours
            ))
        );
        assert_matches!(
            validate_slot_spec(hm(12, 0), hm(12, 30), 1),
            Err(SchedulingError::InvalidSlotSpec(
                SlotSpecViolation::LunchWindow
            ))
        );
        assert_matches!(
            validate_slot_spec(hm(12, 30), hm(13, 0), 1),
            Err(SchedulingError::InvalidSlotSpec(
                SlotSpecViolation::LunchWindow
            ))
        );
    }

    #[test]
    fn empty_replacement_grid_is_rejected() {
        assert_matches!(validate_grid_specs(&[]), Err(SchedulingError::EmptyGrid));

        let one = vec![SlotSpec {
            start_time: hm(10, 0),
            end_time: hm(10, 30),
            capacity: 1,
        }];
        assert!(validate_grid_specs(&one).is_ok());
    }

    #[test]
    fn replacement_grid_surfaces_the_first_bad_spec() {
        let specs = vec![
            SlotSpec {
                start_time: hm(10, 0),
                end_time: hm(10, 30),
                capacity: 1,
            },
            SlotSpec {
                start_time: hm(12, 0),
                end_time: hm(12, 30),
                capacity: 1,
            },
        ];
        assert_matches!(
            validate_grid_specs(&specs),
            Err(SchedulingError::InvalidSlotSpec(
                SlotSpecViolation::LunchWindow
            ))
        );
    }

    #[test]
    fn lunch_boundaries_themselves_are_bookable() {
        assert!(validate_slot_spec(hm(11, 30), hm(12, 0), 1).is_ok());
        assert!(validate_slot_spec(hm(13, 0), hm(13, 30), 1).is_ok());
    }

    #[test]
    fn alignment_accepts_quarter_hours_only() {
        assert!(validate_alignment(at(10, 0)).is_ok());
        assert!(validate_alignment(at(10, 45)).is_ok());
        assert_matches!(
            validate_alignment(at(10, 10)),
            Err(SchedulingError::MisalignedStart)
        );
    }

    #[test]
    fn expansion_covers_the_duration_in_contiguous_windows() {
        let windows = expand_reservation(at(10, 0), 90).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], (at(10, 0), at(10, 30)));
        assert_eq!(windows[1], (at(10, 30), at(11, 0)));
        assert_eq!(windows[2], (at(11, 0), at(11, 30)));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn expansion_is_deterministic() {
        let first = expand_reservation(at(14, 30), 60).unwrap();
        let second = expand_reservation(at(14, 30), 60).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn expansion_truncates_to_the_quarter_hour_and_drops_seconds() {
        let raw = Utc.with_ymd_and_hms(2025, 3, 10, 10, 20, 42).unwrap();
        let windows = expand_reservation(raw, 30).unwrap();
        assert_eq!(windows[0].0, at(10, 15));
        assert_eq!(windows[0].1, at(10, 45));
    }

    #[test]
    fn quarter_hour_anchor_yields_keys_off_the_half_hour_grid() {
        // 10:15 + 30min expands to 10:15-10:45, which a :00/:30 grid can
        // never contain; the allocator treats the miss as an
        // operating-hours conflict.
        let windows = expand_reservation(at(10, 15), 30).unwrap();
        let keys = slot_keys(&windows);
        assert_eq!(keys, vec![(hm(10, 15), hm(10, 45))]);
    }

    #[test]
    fn expansion_rejects_non_multiples_of_thirty() {
        assert_matches!(
            expand_reservation(at(10, 0), 45),
            Err(SchedulingError::InvalidDuration)
        );
        assert_matches!(
            expand_reservation(at(10, 0), 0),
            Err(SchedulingError::InvalidDuration)
        );
        assert_matches!(
            expand_reservation(at(10, 0), -30),
            Err(SchedulingError::InvalidDuration)
        );
    }
}
