mod common;

use common::{NOW, bike, harness, rental, user};
use velostash::{
    DAY_MILLIS, KeyValueStore, Ladder, NoticeLevel, Tier, build_chat_key, keys,
    model::{ChatMessage, DirectMessages, Rental, RentalStatus, Route},
};

fn route(id: i64, created_at: i64) -> Route {
    Route {
        id,
        name: format!("Route {id}"),
        route_type: "Scenic".to_string(),
        start_location: "A".to_string(),
        end_location: "B".to_string(),
        distance: "10 km".to_string(),
        time_estimate: "1 h".to_string(),
        description: String::new(),
        photo_url: String::new(),
        map_embed: String::new(),
        created_at: Some(created_at),
        created_by: "admin@cychris.com".to_string(),
        view_count: 0,
    }
}

fn thread(len: i64) -> Vec<ChatMessage> {
    (0..len)
        .map(|i| ChatMessage::new(i, "ana@x.io", format!("message {i}"), NOW + i))
        .collect()
}

/// 90 listings by a registered owner and 10 whose owners no longer exist.
fn seed_marketplace(h: &mut common::Harness) {
    let owner = user(10, "Owen", "owner@x.io");
    let renter = user(11, "Rita", "renter@x.io");
    assert!(h.gateway.save_users(&[owner, renter]));

    let bikes: Vec<_> = (0..100)
        .map(|i| {
            let owner = if i < 10 {
                format!("ghost{i}@x.io")
            } else {
                "owner@x.io".to_string()
            };
            bike(NOW - i * 1_000, &owner)
        })
        .collect();
    assert!(h.gateway.save_bikes(&bikes));
}

#[test]
fn test_cleanup_removes_exactly_the_orphaned_bikes() {
    let mut h = harness();
    seed_marketplace(&mut h);

    let report = h.gateway.cleanup_with_report(false);
    assert_eq!(report.orphaned_bikes, 10);
    assert_eq!(report.stale_bikes, 0);
    assert!(report.cleaned);

    let bikes = h.gateway.bikes();
    assert_eq!(bikes.len(), 90);
    assert!(bikes.iter().all(|b| b.owner == "owner@x.io"));

    // A second pass has nothing left to do.
    assert!(!h.gateway.cleanup(false));
}

#[test]
fn test_gentle_cleanup_keeps_recently_completed_rentals() {
    let mut h = harness();
    seed_marketplace(&mut h);

    let mut recent = rental(1, NOW - 10_000, "renter@x.io", RentalStatus::Completed);
    recent.end_time = Some(NOW - DAY_MILLIS);
    let mut old = rental(2, NOW - 10_000, "renter@x.io", RentalStatus::Completed);
    old.end_time = Some(NOW - 8 * DAY_MILLIS);
    let undated = rental(3, NOW - 10_000, "renter@x.io", RentalStatus::Completed);
    let active = rental(4, NOW - 10_000, "renter@x.io", RentalStatus::Active);
    assert!(h.gateway.save_rentals(&[recent, old, undated, active]));

    let report = h.gateway.cleanup_with_report(false);
    assert_eq!(report.rentals, 2);
    let ids: Vec<i64> = h.gateway.rentals().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 4]);
}

#[test]
fn test_aggressive_cleanup_leaves_no_completed_rentals() {
    let mut h = harness();
    seed_marketplace(&mut h);

    let rentals: Vec<Rental> = (0..6)
        .map(|i| {
            let status = if i % 2 == 0 {
                RentalStatus::Completed
            } else {
                RentalStatus::Pending
            };
            let mut r = rental(i, NOW - 20_000, "renter@x.io", status);
            r.end_time = Some(NOW - 60_000);
            r
        })
        .collect();
    assert!(h.gateway.save_rentals(&rentals));

    assert!(h.gateway.cleanup(true));
    let left = h.gateway.rentals();
    assert_eq!(left.len(), 3);
    assert!(left.iter().all(|r| !r.is_completed()));
}

#[test]
fn test_aggressive_cleanup_drops_old_imageless_bikes_and_routes() {
    let mut h = harness();
    assert!(h.gateway.save_users(&[user(10, "Owen", "owner@x.io")]));

    let ancient = bike(NOW - 400 * DAY_MILLIS, "owner@x.io");
    let mut ancient_with_photo = bike(NOW - 401 * DAY_MILLIS, "owner@x.io");
    ancient_with_photo.set_images(vec!["data:image/jpeg;base64,AA".to_string()]);
    let fresh = bike(NOW - DAY_MILLIS, "owner@x.io");
    assert!(h.gateway.save_bikes(&[ancient, ancient_with_photo, fresh]));

    let routes = vec![
        route(1, NOW - 31 * DAY_MILLIS),
        route(2, NOW - 2 * DAY_MILLIS),
        Route {
            created_at: None,
            ..route(3, 0)
        },
    ];
    assert!(h.gateway.save_routes(&routes));

    // A gentle pass leaves both alone.
    let gentle = h.gateway.cleanup_with_report(false);
    assert_eq!(gentle.bikes(), 0);
    assert_eq!(gentle.routes, 0);

    let report = h.gateway.cleanup_with_report(true);
    assert_eq!(report.stale_bikes, 1);
    assert_eq!(report.routes, 2);
    assert_eq!(h.gateway.bikes().len(), 2);
    let route_ids: Vec<i64> = h.gateway.routes().iter().map(|r| r.id).collect();
    assert_eq!(route_ids, vec![2]);
}

#[test]
fn test_aggressive_cleanup_trims_chat_and_seen_lists() {
    let mut h = harness();
    seed_marketplace(&mut h);

    let key = build_chat_key("ana@x.io", "bo@x.io");
    let messages = DirectMessages::from([(key, thread(60))]);
    assert!(h.gateway.save_direct_messages(&messages));
    let seen: Vec<String> = (0..25).map(|i| format!("pending_{i}")).collect();
    assert!(h.gateway.save_seen_notifications("ana@x.io", &seen));

    let report = h.gateway.cleanup_with_report(true);
    assert_eq!(report.chat_messages, 10);
    assert_eq!(report.seen_notifications, 5);

    let history = h.gateway.chat_history("bo@x.io", "ana@x.io");
    assert_eq!(history.len(), 50);
    assert_eq!(history.first().map(|m| m.id), Some(10));
    assert_eq!(
        h.gateway.seen_notifications("ana@x.io").first().map(String::as_str),
        Some("pending_5")
    );
}

#[test]
fn test_cleanup_aborts_when_users_unreadable() -> anyhow::Result<()> {
    let mut h = harness();
    seed_marketplace(&mut h);
    h.gateway.persistent_mut().set_item(keys::USERS, "[{broken")?;

    let report = h.gateway.cleanup_with_report(true);
    assert!(!report.cleaned);
    // Without the user list every bike would look orphaned; none may go.
    assert_eq!(h.gateway.bikes().len(), 100);
    Ok(())
}

#[test]
fn test_emergency_cleanup_applies_fixed_retention() {
    let mut h = harness();
    seed_marketplace(&mut h);

    let key = build_chat_key("ana@x.io", "bo@x.io");
    assert!(h.gateway.save_direct_messages(&DirectMessages::from([(key, thread(30))])));
    let routes: Vec<Route> = (0..25).map(|i| route(i, NOW)).collect();
    assert!(h.gateway.save_routes(&routes));
    let mut done = rental(1, NOW, "renter@x.io", RentalStatus::Completed);
    done.end_time = Some(NOW);
    let pending = rental(2, NOW, "renter@x.io", RentalStatus::Pending);
    assert!(h.gateway.save_rentals(&[done, pending]));
    let seen: Vec<String> = (0..15).map(|i| format!("pending_{i}")).collect();
    assert!(h.gateway.save_seen_notifications("renter@x.io", &seen));

    assert!(h.gateway.emergency_cleanup());

    let history = h.gateway.chat_history("ana@x.io", "bo@x.io");
    let ids: Vec<i64> = history.iter().map(|m| m.id).collect();
    assert_eq!(ids, (10..30).collect::<Vec<_>>());

    let route_ids: Vec<i64> = h.gateway.routes().iter().map(|r| r.id).collect();
    assert_eq!(route_ids, (5..25).collect::<Vec<_>>());

    let rentals = h.gateway.rentals();
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0].id, 2);
    assert_eq!(h.gateway.seen_notifications("renter@x.io").len(), 10);

    // Emergency eviction is age-blind and leaves listings alone.
    assert_eq!(h.gateway.bikes().len(), 100);
}

#[test]
fn test_emergency_cleanup_reports_failed_writes() {
    let mut h = harness();
    let routes: Vec<Route> = (0..25).map(|i| route(i, NOW)).collect();
    assert!(h.gateway.save_routes(&routes));

    h.gateway.persistent_mut().reject_next_writes(1);
    assert!(!h.gateway.emergency_cleanup());
    assert_eq!(h.gateway.routes().len(), 25);
}

#[test]
fn test_ladder_retries_after_one_cleanup_pass() {
    let mut h = harness();
    seed_marketplace(&mut h);

    // The store is exactly full: any growth is refused until something is freed.
    let used = h.gateway.persistent().used_bytes();
    h.gateway.persistent_mut().set_quota(Some(used));

    let rentals = vec![rental(1, NOW - 20_000, "renter@x.io", RentalStatus::Pending)];
    let report = h
        .gateway
        .put_with_ladder(keys::RENTALS, &rentals, &Ladder::standard())
        .expect("write succeeds after cleanup");

    assert_eq!(report.tiers_run, vec![Tier::Cleanup { aggressive: true }]);
    assert_eq!(report.cleanup_passes(), 1);
    assert_eq!(h.gateway.rentals().len(), 1);
    assert_eq!(h.gateway.bikes().len(), 90);
    assert_eq!(h.notifier.titles(), vec!["Storage Full", "Storage Full"]);
    assert_eq!(h.notifier.count(NoticeLevel::Fatal), 0);
}

#[test]
fn test_ladder_exhaustion_is_fatal() {
    let mut h = harness();
    h.gateway.persistent_mut().set_quota(Some(0));

    let err = h
        .gateway
        .put_with_ladder(keys::ROUTES, &vec![route(1, NOW)], &Ladder::standard())
        .expect_err("nothing can be freed");
    assert!(matches!(
        err,
        velostash::GatewayError::StorageExhausted { ref key } if key == keys::ROUTES
    ));
    assert_eq!(h.notifier.count(NoticeLevel::Fatal), 1);
    assert!(!h.gateway.contains(keys::ROUTES));
}

#[test]
fn test_gentle_ladder_runs_a_single_pass() {
    let mut h = harness();
    h.gateway.persistent_mut().set_quota(Some(0));

    let result = h
        .gateway
        .write_with_ladder("probe", &Ladder::gentle(), |gateway| gateway.put("probe", "x"));
    assert!(result.is_err());
    assert_eq!(h.notifier.count(NoticeLevel::Error), 2);
}
