#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use velostash::{
    FixedClock, MemoryStore, Notice, NoticeLevel, Notifier, StorageGateway,
    model::{AccountStatus, Bike, Rental, RentalStatus, Role, User},
};

/// 2025-10-09T09:20:00Z
pub const NOW: i64 = 1_760_001_600_000;
pub const MINUTE: i64 = 60 * 1000;

/// Collects every notice so tests can assert on what the user was shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices()
            .iter()
            .filter(|notice| notice.level == level)
            .count()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|notice| notice.title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

pub struct Harness {
    pub gateway: StorageGateway<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: RecordingNotifier,
}

/// A gateway over an empty in-memory store with a fixed clock at [`NOW`].
pub fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(NOW));
    let notifier = RecordingNotifier::default();
    let gateway = StorageGateway::new(MemoryStore::new())
        .with_clock(Arc::clone(&clock))
        .with_notifier(notifier.clone());
    Harness {
        gateway,
        clock,
        notifier,
    }
}

/// An approved user with a complete profile.
pub fn user(id: i64, name: &str, email: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        password: "secret".to_string(),
        role: Role::User,
        status: AccountStatus::Approved,
        phone: Some(format!("555-{id:04}")),
        address: Some("1 Main St".to_string()),
        username: None,
        profile_pic_url: None,
        created_at: Some(id),
    }
}

pub fn bike(id: i64, owner: &str) -> Bike {
    Bike {
        id,
        owner: owner.to_string(),
        name: format!("Bike {id}"),
        category: "Mountain".to_string(),
        description: String::new(),
        rate: 50.0,
        location: "Cebu".to_string(),
        available: true,
        image_urls: Vec::new(),
        image_url: None,
    }
}

pub fn rental(id: i64, bike_id: i64, renter: &str, status: RentalStatus) -> Rental {
    Rental {
        id,
        bike_id,
        renter: renter.to_string(),
        hours: 2,
        rate: 50.0,
        total: 100.0,
        status,
        start_time: None,
        end_time: None,
        pickup_schedule: None,
    }
}
