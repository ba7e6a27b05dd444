//! Reminder rule evaluation: fire decisions and client targeting.
//!
//! Pure functions over a wall-clock timestamp so they can be exercised
//! without a running scheduler.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike};

use billnudge_core::{AutomatedReminder, Client, ClientStatus, MessageKind, ScheduleKind, TimeOfDay};

/// Longest gap the catch-up window will scan, in days.
const MAX_CATCH_UP_DAYS: i64 = 7;

/// Weekday index of `t`, 0 = Sunday.
pub fn weekday_index(t: &DateTime<FixedOffset>) -> u8 {
    t.weekday().num_days_from_sunday() as u8
}

/// The `HH:MM` minute `t` falls in.
pub fn minute_of(t: &DateTime<FixedOffset>) -> Option<TimeOfDay> {
    TimeOfDay::new(t.hour() as u8, t.minute() as u8)
}

/// Exact-minute fire decision.
///
/// `scheduled` rules fire when their time equals the current `HH:MM`;
/// `recurring` rules additionally need today's weekday in their day set;
/// `immediate` rules never fire on a tick.
pub fn fires_now(reminder: &AutomatedReminder, now: &DateTime<FixedOffset>) -> bool {
    let schedule = &reminder.schedule;
    let Some(time) = schedule.time else {
        return false;
    };
    let on_time = minute_of(now) == Some(time);

    match schedule.kind {
        ScheduleKind::Immediate => false,
        ScheduleKind::Scheduled => on_time,
        ScheduleKind::Recurring => on_time && schedule.recurring_days.contains(&weekday_index(now)),
    }
}

/// Catch-up fire decision: fires when an occurrence of the rule's time
/// (on an allowed weekday, for recurring rules) lies in `(previous, now]`.
///
/// Consecutive ticks have disjoint windows, so a rule fires at most once
/// per occurrence. Gaps longer than a week are clamped.
pub fn fires_within(
    reminder: &AutomatedReminder,
    previous: &DateTime<FixedOffset>,
    now: &DateTime<FixedOffset>,
) -> bool {
    let schedule = &reminder.schedule;
    if schedule.kind == ScheduleKind::Immediate {
        return false;
    }
    let Some(time) = schedule.time else {
        return false;
    };
    if previous >= now {
        return fires_now(reminder, now);
    }
    let Some(at) = NaiveTime::from_hms_opt(time.hour().into(), time.minute().into(), 0) else {
        return false;
    };

    let earliest = (*now - Duration::days(MAX_CATCH_UP_DAYS)).max(*previous);
    let mut day = earliest.date_naive();
    let last = now.date_naive();
    while day <= last {
        let candidate = day.and_time(at).and_local_timezone(now.timezone()).single();
        if let Some(candidate) = candidate {
            let in_window = candidate > earliest && candidate <= *now;
            let day_allowed = schedule.kind == ScheduleKind::Scheduled
                || schedule.recurring_days.contains(&weekday_index(&candidate));
            if in_window && day_allowed {
                return true;
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    false
}

/// Clients a firing rule should reach.
///
/// Conditions (balance bounds, allowed statuses) apply first; then
/// `dunning` keeps only overdue clients and `invoice` keeps only clients
/// with a positive balance.
pub fn select_targets<'a>(reminder: &AutomatedReminder, clients: &'a [Client]) -> Vec<&'a Client> {
    clients
        .iter()
        .filter(|c| reminder.conditions.as_ref().is_none_or(|cond| cond.admits(c)))
        .filter(|c| match reminder.kind {
            MessageKind::Dunning => c.status == ClientStatus::Overdue,
            MessageKind::Invoice => c.balance > 0.0,
            MessageKind::Receipt | MessageKind::General => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use billnudge_core::{ReminderChannel, ReminderConditions, ReminderSchedule};
    use chrono::{TimeZone, Utc, Weekday};

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, day, hour, minute, second)
            .unwrap()
    }

    fn rule(kind: MessageKind, schedule: ReminderSchedule) -> AutomatedReminder {
        AutomatedReminder {
            id: "r1".into(),
            name: "rule".into(),
            kind,
            channel: ReminderChannel::Sms,
            template: "Dear {name}".into(),
            enabled: true,
            schedule,
            conditions: None,
            created_at: Utc::now(),
        }
    }

    fn client(name: &str, balance: f64, status: ClientStatus) -> Client {
        Client {
            id: name.into(),
            name: name.into(),
            phone: "0712345678".into(),
            email: None,
            address: None,
            balance,
            status,
            created_at: Utc::now(),
            last_payment: None,
        }
    }

    fn nine() -> TimeOfDay {
        TimeOfDay::new(9, 0).unwrap()
    }

    #[test]
    fn test_calendar_assumptions() {
        assert_eq!(at(12, 0, 0, 0).weekday(), Weekday::Mon);
        assert_eq!(weekday_index(&at(12, 0, 0, 0)), 1);
        assert_eq!(weekday_index(&at(14, 0, 0, 0)), 3);
        assert_eq!(weekday_index(&at(18, 0, 0, 0)), 0);
    }

    #[test]
    fn test_scheduled_fires_only_on_its_minute() {
        let r = rule(MessageKind::General, ReminderSchedule::daily(nine()));
        assert!(fires_now(&r, &at(15, 9, 0, 0)));
        assert!(fires_now(&r, &at(15, 9, 0, 59)));
        assert!(!fires_now(&r, &at(15, 9, 1, 0)));
        assert!(!fires_now(&r, &at(15, 8, 59, 59)));
    }

    #[test]
    fn test_recurring_needs_matching_weekday() {
        let r = rule(MessageKind::General, ReminderSchedule::recurring(nine(), &[1, 3]));
        assert!(fires_now(&r, &at(12, 9, 0, 0))); // Monday
        assert!(!fires_now(&r, &at(13, 9, 0, 0))); // Tuesday
        assert!(fires_now(&r, &at(14, 9, 0, 0))); // Wednesday
        assert!(!fires_now(&r, &at(15, 9, 0, 0))); // Thursday
        assert!(!fires_now(&r, &at(12, 9, 1, 0)));
    }

    #[test]
    fn test_immediate_never_fires() {
        let mut schedule = ReminderSchedule::immediate();
        schedule.time = Some(nine());
        let r = rule(MessageKind::General, schedule);
        assert!(!fires_now(&r, &at(15, 9, 0, 0)));
        assert!(!fires_within(&r, &at(15, 8, 0, 0), &at(15, 10, 0, 0)));
    }

    #[test]
    fn test_catch_up_window() {
        let r = rule(MessageKind::General, ReminderSchedule::daily(nine()));
        // Process was asleep from 08:30 to 09:20.
        assert!(fires_within(&r, &at(15, 8, 30, 0), &at(15, 9, 20, 0)));
        // Window boundaries: (prev, now].
        assert!(fires_within(&r, &at(15, 8, 59, 30), &at(15, 9, 0, 0)));
        assert!(!fires_within(&r, &at(15, 9, 0, 0), &at(15, 9, 1, 0)));
        // Across midnight into the next day's occurrence.
        assert!(fires_within(&r, &at(14, 23, 0, 0), &at(15, 9, 5, 0)));
        assert!(!fires_within(&r, &at(15, 9, 30, 0), &at(15, 10, 0, 0)));
    }

    #[test]
    fn test_catch_up_respects_weekdays() {
        let r = rule(MessageKind::General, ReminderSchedule::recurring(nine(), &[1]));
        // Tuesday 08:00 → Wednesday 10:00 never passes a Monday 09:00.
        assert!(!fires_within(&r, &at(13, 8, 0, 0), &at(14, 10, 0, 0)));
        // Sunday 20:00 → Monday 09:10 does.
        assert!(fires_within(&r, &at(11, 20, 0, 0), &at(12, 9, 10, 0)));
    }

    #[test]
    fn test_dunning_only_targets_overdue() {
        let clients = vec![
            client("active", 900.0, ClientStatus::Active),
            client("inactive", 900.0, ClientStatus::Inactive),
            client("overdue", 900.0, ClientStatus::Overdue),
        ];
        let mut r = rule(MessageKind::Dunning, ReminderSchedule::daily(nine()));
        r.conditions = Some(ReminderConditions {
            min_balance: None,
            max_balance: None,
            client_status: Some(vec![ClientStatus::Active, ClientStatus::Inactive, ClientStatus::Overdue]),
        });
        let names: Vec<&str> = select_targets(&r, &clients).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["overdue"]);

        r.conditions = Some(ReminderConditions {
            min_balance: None,
            max_balance: None,
            client_status: Some(vec![ClientStatus::Active]),
        });
        assert!(select_targets(&r, &clients).is_empty());
    }

    #[test]
    fn test_invoice_needs_positive_balance() {
        let clients = vec![
            client("owes", 10.0, ClientStatus::Active),
            client("clear", 0.0, ClientStatus::Active),
            client("credit", -5.0, ClientStatus::Active),
        ];
        let r = rule(MessageKind::Invoice, ReminderSchedule::daily(nine()));
        let names: Vec<&str> = select_targets(&r, &clients).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["owes"]);
    }

    #[test]
    fn test_conditions_bound_general_rules() {
        let clients = vec![
            client("low", 50.0, ClientStatus::Active),
            client("mid", 500.0, ClientStatus::Active),
            client("high", 5000.0, ClientStatus::Active),
            client("zero", 0.0, ClientStatus::Inactive),
        ];
        let mut r = rule(MessageKind::General, ReminderSchedule::daily(nine()));
        assert_eq!(select_targets(&r, &clients).len(), 4);

        r.conditions = Some(ReminderConditions {
            min_balance: Some(100.0),
            max_balance: Some(1000.0),
            client_status: None,
        });
        let names: Vec<&str> = select_targets(&r, &clients).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["mid"]);
    }
}
