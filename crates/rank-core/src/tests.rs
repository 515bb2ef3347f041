//! Unit tests for rank-core primitives.

#[cfg(test)]
mod ids {
    use crate::{TripId, VehicleId};

    #[test]
    fn display() {
        assert_eq!(VehicleId(7).to_string(), "VehicleId(7)");
        assert_eq!(TripId(12).to_string(), "TripId(12)");
    }

    #[test]
    fn ordering_and_raw() {
        assert!(VehicleId(1) < VehicleId(2));
        assert_eq!(TripId::from(9).get(), 9);
    }
}

#[cfg(test)]
mod fleet {
    use crate::{CapacityClass, CapacityClasses, CoreError};

    #[test]
    fn classes_sorted_and_deduped() {
        let set = CapacityClasses::new([8, 4, 6, 4, 5, 7]).unwrap();
        let seats: Vec<u8> = set.iter().map(CapacityClass::seats).collect();
        assert_eq!(seats, [4, 5, 6, 7, 8]);
        assert_eq!(set.max(), CapacityClass(8));
        assert_eq!(set.min(), CapacityClass(4));
        assert!(set.contains(CapacityClass(6)));
        assert!(!set.contains(CapacityClass(3)));
    }

    #[test]
    fn empty_set_rejected() {
        assert!(matches!(CapacityClasses::new(Vec::<u8>::new()), Err(CoreError::Config(_))));
    }

    #[test]
    fn zero_seat_class_rejected() {
        assert!(matches!(CapacityClasses::new([0, 4]), Err(CoreError::ZeroCapacity)));
    }

    #[test]
    fn class_display() {
        assert_eq!(CapacityClass(5).to_string(), "5-seater");
        assert!(CapacityClass(5).fits(5));
        assert!(!CapacityClass(5).fits(6));
    }
}

#[cfg(test)]
mod trip_status {
    use crate::TripStatus::{self, *};

    #[test]
    fn forward_chain() {
        assert!(Pending.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(DriverEnRoute));
        assert!(DriverEnRoute.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Assigned.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Assigned));
        assert!(!Assigned.can_transition_to(Assigned));
    }

    #[test]
    fn cancel_from_any_non_terminal() {
        for s in [Pending, Assigned, DriverEnRoute, InProgress] {
            assert!(s.can_transition_to(Cancelled), "{s} → cancelled");
        }
    }

    #[test]
    fn terminals_have_no_exits() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in TripStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} → {to}");
            }
        }
    }

    #[test]
    fn label_parse_roundtrip() {
        for s in TripStatus::ALL {
            assert_eq!(s.as_str().parse::<TripStatus>().unwrap(), s);
        }
        assert!("teleporting".parse::<TripStatus>().is_err());
    }
}

#[cfg(test)]
mod queue_order {
    use crate::{CapacityClass, EntryId, QueueEntry, Timestamp, VehicleId};

    fn entry(id: i64, position: u32, at: i64) -> QueueEntry {
        QueueEntry {
            id:          EntryId(id),
            vehicle:     VehicleId(id),
            class:       CapacityClass(4),
            position,
            enqueued_at: Timestamp(at),
        }
    }

    #[test]
    fn position_then_time_then_id() {
        let mut v = vec![entry(3, 2, 10), entry(2, 1, 50), entry(1, 1, 50), entry(4, 1, 20)];
        v.sort_by(QueueEntry::fifo_cmp);
        let ids: Vec<i64> = v.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, [4, 1, 2, 3]);
    }
}

#[cfg(test)]
mod time {
    use std::time::Duration;

    use crate::{Clock, Deadline, ManualClock, Timestamp};

    #[test]
    fn manual_clock_steps() {
        let clock = ManualClock::new(Timestamp(1_000));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Timestamp(1_250));
        clock.set(Timestamp(5));
        assert_eq!(clock.now(), Timestamp(5));
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp(100);
        assert_eq!(t.plus(Duration::from_millis(50)), Timestamp(150));
        assert_eq!(Timestamp(150).since(t), Duration::from_millis(50));
        assert_eq!(t.since(Timestamp(150)), Duration::ZERO);
    }

    #[test]
    fn zero_deadline_is_expired() {
        assert!(Deadline::after(Duration::ZERO).is_expired());
        assert!(!Deadline::after(Duration::from_secs(60)).is_expired());
    }
}

#[cfg(test)]
mod rng {
    use std::time::Duration;

    use crate::JitterRng;

    #[test]
    fn equal_jitter_within_bounds() {
        let mut rng = JitterRng::new(7);
        for _ in 0..1_000 {
            let d = rng.equal_jitter(Duration::from_millis(100));
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(100), "{d:?}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = JitterRng::new(42);
        let mut b = JitterRng::new(42);
        for _ in 0..100 {
            let d = Duration::from_millis(80);
            assert_eq!(a.equal_jitter(d), b.equal_jitter(d));
        }
    }
}

#[cfg(test)]
mod config {
    use crate::{CapacityClass, CoreError, DispatchConfig};

    #[test]
    fn default_validates() {
        let classes = DispatchConfig::default().validate().unwrap();
        assert_eq!(classes.max(), CapacityClass(8));
        assert_eq!(classes.len(), 5);
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut cfg = DispatchConfig::default();
        cfg.retry.max_attempts = 0;
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn inverted_delays_rejected() {
        let mut cfg = DispatchConfig::default();
        cfg.retry.base_delay_ms = 1_000;
        cfg.retry.max_delay_ms = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_threshold_rejected() {
        let mut cfg = DispatchConfig::default();
        cfg.breaker.failure_threshold = 0;
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod audit {
    use crate::*;

    #[test]
    fn action_tags_parse_back() {
        for action in [AuditAction::TripCompleted, AuditAction::TripCancelled, AuditAction::QueueRepaired] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!(matches!("TRIP_STARTED".parse::<AuditAction>(), Err(CoreError::UnknownAction(_))));
    }

    #[test]
    fn subject_parts_roundtrip() {
        for subject in [AuditSubject::Trip(TripId(77)), AuditSubject::Queue(CapacityClass(6))] {
            assert_eq!(AuditSubject::from_parts(subject.kind(), subject.key()).unwrap(), subject);
        }
    }

    #[test]
    fn unknown_subjects_rejected() {
        assert!(matches!(AuditSubject::from_parts("driver", 1), Err(CoreError::UnknownSubject(_))));
        assert!(matches!(AuditSubject::from_parts("queue", 300), Err(CoreError::UnknownSubject(_))));
    }
}
