mod common;

use common::{MINUTE, NOW, bike, harness, user};
use velostash::{Notification, NotificationKind};

const BIKE: i64 = NOW - 5_000;

fn ids(notifications: &[Notification]) -> Vec<String> {
    notifications.iter().map(Notification::id).collect()
}

#[test]
fn test_notifications_follow_the_rental() -> anyhow::Result<()> {
    let mut h = harness();
    assert!(h.gateway.save_users(&[
        user(10, "Owen", "owner@x.io"),
        user(11, "Rita", "renter@x.io"),
    ]));
    assert!(h.gateway.save_bikes(&[bike(BIKE, "owner@x.io")]));

    let request = h.gateway.request_rental(BIKE, "renter@x.io", 2)?;
    let id = request.id;
    assert_eq!(
        ids(&h.gateway.pending_notifications("owner@x.io", NOW)),
        vec![format!("pending_{id}")]
    );
    assert!(h.gateway.pending_notifications("renter@x.io", NOW).is_empty());

    h.gateway.approve_rental(id)?;
    assert_eq!(
        ids(&h.gateway.pending_notifications("owner@x.io", NOW)),
        vec![format!("approved_waiting_{id}")]
    );
    assert_eq!(
        ids(&h.gateway.pending_notifications("renter@x.io", NOW)),
        vec![format!("renter_approved_{id}")]
    );

    h.gateway.schedule_pickup(id, NOW + 30 * MINUTE)?;
    assert_eq!(
        ids(&h.gateway.pending_notifications("owner@x.io", NOW)),
        vec![format!("approved_ready_{id}")]
    );
    assert!(h.gateway.pending_notifications("renter@x.io", NOW).is_empty());

    h.gateway.start_rental(id)?;
    let started = h.gateway.pending_notifications("renter@x.io", NOW + MINUTE);
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].kind, NotificationKind::RenterActive);
    // Only news for the first two minutes.
    assert!(
        h.gateway
            .pending_notifications("renter@x.io", NOW + 3 * MINUTE)
            .is_empty()
    );
    Ok(())
}

#[test]
fn test_acknowledged_notifications_stay_hidden() -> anyhow::Result<()> {
    let mut h = harness();
    assert!(h.gateway.save_users(&[
        user(10, "Owen", "owner@x.io"),
        user(11, "Rita", "renter@x.io"),
        user(12, "Sam", "sam@x.io"),
    ]));
    let second = NOW - 6_000;
    assert!(h.gateway.save_bikes(&[bike(BIKE, "owner@x.io"), bike(second, "owner@x.io")]));

    let first = h.gateway.request_rental(BIKE, "renter@x.io", 1)?;
    assert_eq!(h.gateway.unseen_notifications("owner@x.io", NOW).len(), 1);

    assert!(h.gateway.mark_notifications_seen("owner@x.io", NOW));
    assert!(h.gateway.unseen_notifications("owner@x.io", NOW).is_empty());

    h.clock.advance(1);
    let other = h.gateway.request_rental(second, "sam@x.io", 1)?;
    let unseen = h.gateway.unseen_notifications("owner@x.io", NOW);
    assert_eq!(ids(&unseen), vec![format!("pending_{}", other.id)]);

    // Once the first request is gone its acknowledgement is dropped.
    h.gateway.reject_rental(first.id)?;
    assert_eq!(h.gateway.prune_seen_notifications("owner@x.io", NOW), 1);
    assert!(h.gateway.seen_notifications("owner@x.io").is_empty());
    assert_eq!(h.gateway.prune_seen_notifications("owner@x.io", NOW), 0);
    Ok(())
}
