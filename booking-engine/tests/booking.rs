use std::sync::Arc;

use async_trait::async_trait;
use booking_engine::{
    BookingEngine, BookingError, BookingIntent, BookingRequest, FallbackRoomProvisioner,
    PackageOrder, Room, RoomError, RoomProvisioning, SessionStatus, SessionStore, SlotBoard,
};
use chrono::{Duration, Utc};
use core_types::{CallType, CategoryId, EngineConfig, MentorId, OwnerId, SessionId, SlotId, UserId};
use ledger::{EntryStatus, LedgerStore};
use pricing::{MentorCatalog, PricingResolver, StaticCatalog};
use session_inventory::{PackageInventory, PackageStatus};

const FRONTEND: &str = "https://app.example.com";

struct Harness {
    ledger: Arc<LedgerStore>,
    inventory: Arc<PackageInventory>,
    catalog: Arc<StaticCatalog>,
    slots: Arc<SlotBoard>,
    engine: Arc<BookingEngine>,
}

fn harness() -> Harness {
    harness_with_rooms(Arc::new(FallbackRoomProvisioner::new(FRONTEND)))
}

fn harness_with_rooms(rooms: Arc<dyn RoomProvisioning>) -> Harness {
    let config = EngineConfig::default();
    let ledger = Arc::new(LedgerStore::new());
    let inventory = Arc::new(PackageInventory::new());
    let catalog = Arc::new(StaticCatalog::new());
    let slots = Arc::new(SlotBoard::new());
    let sessions = Arc::new(SessionStore::new());
    let resolver = Arc::new(PricingResolver::new(
        catalog.clone() as Arc<dyn MentorCatalog>,
        inventory.clone(),
        ledger.clone(),
        config.pricing.clone(),
    ));
    let engine = Arc::new(BookingEngine::new(
        ledger.clone(),
        inventory.clone(),
        resolver,
        slots.clone(),
        sessions,
        rooms,
        FallbackRoomProvisioner::new(FRONTEND),
        &config,
    ));
    Harness {
        ledger,
        inventory,
        catalog,
        slots,
        engine,
    }
}

impl Harness {
    fn seed_user(&self, id: &str, coins: u64) -> UserId {
        let user = UserId::from(id);
        let owner = OwnerId::User(user.clone());
        self.ledger.open_wallet(owner.clone(), Utc::now());
        if coins > 0 {
            self.ledger
                .credit(&owner, coins, None, "coin purchase", None, Utc::now())
                .unwrap();
        }
        user
    }

    fn mentor_with_rate(&self, id: &str, call_type: CallType, rate: u64) -> MentorId {
        let mentor = MentorId::from(id);
        self.catalog.set_rate(mentor.clone(), call_type, rate);
        mentor
    }

    fn balance(&self, owner: OwnerId) -> u64 {
        self.ledger.balance(&owner).unwrap()
    }
}

fn instant(user: &UserId, mentor: &MentorId, call_type: CallType, minutes: u32) -> BookingIntent {
    BookingIntent {
        user: user.clone(),
        mentor: mentor.clone(),
        call_type,
        request: BookingRequest::Instant { minutes },
    }
}

struct FailingRooms;

#[async_trait]
impl RoomProvisioning for FailingRooms {
    async fn provision(&self, _: &SessionId, _: CallType) -> Result<Room, RoomError> {
        Err(RoomError("video service unreachable".to_string()))
    }
}

struct SlowRooms;

#[async_trait]
impl RoomProvisioning for SlowRooms {
    async fn provision(&self, _: &SessionId, _: CallType) -> Result<Room, RoomError> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(Room {
            room_id: "external".to_string(),
            join_link: "https://rooms.example.com/external".to_string(),
        })
    }
}

#[tokio::test]
async fn instant_booking_moves_funds_and_splits_payout() {
    let h = harness();
    let user = h.seed_user("u-1", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    let confirmation = h
        .engine
        .book(instant(&user, &mentor, CallType::Video, 5))
        .await
        .unwrap();

    assert_eq!(confirmation.quote.cost, 50);
    assert_eq!(confirmation.session.status, SessionStatus::Active);
    assert!(confirmation.session.room.is_some());

    let user_owner = OwnerId::User(user);
    let mentor_owner = OwnerId::Mentor(mentor.clone());
    assert_eq!(h.balance(user_owner.clone()), 50);
    assert_eq!(h.balance(mentor_owner.clone()), 35);

    let payout = confirmation.payout.unwrap();
    assert_eq!(payout.amount, 50);
    assert_eq!(payout.mentor_share, 35);
    assert_eq!(payout.admin_share, 15);
    assert!(h.ledger.payout_for_session(&confirmation.session.id).is_some());

    // Cached balances and the entry log agree on both sides.
    assert_eq!(h.ledger.replayed_balance(&user_owner).unwrap(), 50);
    assert_eq!(h.ledger.replayed_balance(&mentor_owner).unwrap(), 35);
}

#[tokio::test]
async fn insufficient_funds_rejects_without_a_trace() {
    let h = harness();
    let user = h.seed_user("u-1", 10);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    let err = h
        .engine
        .book(instant(&user, &mentor, CallType::Video, 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientFunds {
            needed: 50,
            available: 10
        }
    ));

    let owner = OwnerId::User(user.clone());
    assert_eq!(h.balance(owner.clone()), 10);
    // Only the seed credit exists.
    assert_eq!(h.ledger.history(&owner).len(), 1);
    assert!(h.engine.sessions().sessions_for_user(&user).is_empty());
}

#[tokio::test]
async fn missing_rate_is_a_pricing_error() {
    let h = harness();
    let user = h.seed_user("u-1", 100);
    let mentor = MentorId::from("m-unlisted");

    let err = h
        .engine
        .book(instant(&user, &mentor, CallType::Audio, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PricingUnavailable(_)));
    assert_eq!(h.balance(OwnerId::User(user)), 100);
}

#[tokio::test]
async fn package_credit_books_at_zero_cost() {
    let h = harness();
    let user = h.seed_user("u-1", 500);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    let package = h
        .engine
        .purchase_package(PackageOrder {
            user: user.clone(),
            mentor: mentor.clone(),
            category: CategoryId::from("career"),
            call_type: CallType::Video,
            total_sessions: 2,
            price: 300,
            duration_minutes: 30,
            valid_for: Duration::days(30),
        })
        .await
        .unwrap();
    assert_eq!(h.balance(OwnerId::User(user.clone())), 200);

    let confirmation = h
        .engine
        .book(instant(&user, &mentor, CallType::Video, 30))
        .await
        .unwrap();

    assert_eq!(confirmation.quote.cost, 0);
    assert!(confirmation.payout.is_none());
    assert_eq!(confirmation.session.package, Some(package.id));
    // No coins moved for the covered session and no payout accrued.
    assert_eq!(h.balance(OwnerId::User(user)), 200);
    assert!(h
        .ledger
        .payout_for_session(&confirmation.session.id)
        .is_none());
    assert_eq!(h.inventory.get(&package.id).unwrap().remaining_sessions, 1);
}

#[tokio::test]
async fn racing_bookings_share_one_credit_and_charge_the_loser() {
    let h = harness();
    let user = h.seed_user("u-1", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    h.engine
        .purchase_package_at(
            PackageOrder {
                user: user.clone(),
                mentor: mentor.clone(),
                category: CategoryId::from("career"),
                call_type: CallType::Video,
                total_sessions: 1,
                price: 0,
                duration_minutes: 5,
                valid_for: Duration::days(30),
            },
            Utc::now(),
        )
        .await
        .unwrap();

    let first = tokio::spawn({
        let engine = h.engine.clone();
        let intent = instant(&user, &mentor, CallType::Video, 5);
        async move { engine.book(intent).await }
    });
    let second = tokio::spawn({
        let engine = h.engine.clone();
        let intent = instant(&user, &mentor, CallType::Video, 5);
        async move { engine.book(intent).await }
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    let costs = {
        let mut costs = [first.quote.cost, second.quote.cost];
        costs.sort_unstable();
        costs
    };
    // One booking consumed the single credit, the other paid the rate.
    assert_eq!(costs, [0, 50]);
    assert_eq!(h.balance(OwnerId::User(user)), 50);
    assert_eq!(h.balance(OwnerId::Mentor(mentor)), 35);
}

#[tokio::test]
async fn provisioning_failure_rolls_everything_back() {
    let h = harness_with_rooms(Arc::new(FailingRooms));
    let user = h.seed_user("u-1", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    let err = h
        .engine
        .book(instant(&user, &mentor, CallType::Video, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Infrastructure(_)));

    let owner = OwnerId::User(user);
    assert_eq!(h.balance(owner.clone()), 100);
    assert_eq!(h.balance(OwnerId::Mentor(mentor)), 0);
    assert_eq!(
        h.ledger.replayed_balance(&owner).unwrap(),
        h.balance(owner)
    );
}

#[tokio::test(start_paused = true)]
async fn slow_provisioner_falls_back_to_a_local_room() {
    let h = harness_with_rooms(Arc::new(SlowRooms));
    let user = h.seed_user("u-1", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);

    let confirmation = h
        .engine
        .book(instant(&user, &mentor, CallType::Video, 5))
        .await
        .unwrap();

    let room = confirmation.session.room.unwrap();
    assert!(room.join_link.starts_with(FRONTEND));
}

#[tokio::test]
async fn slot_booking_schedules_and_blocks_double_booking() {
    let h = harness();
    let alice = h.seed_user("u-alice", 100);
    let bob = h.seed_user("u-bob", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Audio, 2);

    let slot_id = SlotId::from("s-1");
    let start_at = Utc::now() + Duration::hours(3);
    h.slots.publish(slot_id.clone(), mentor.clone(), start_at, 30);

    let confirmation = h
        .engine
        .book(BookingIntent {
            user: alice.clone(),
            mentor: mentor.clone(),
            call_type: CallType::Audio,
            request: BookingRequest::Slot {
                slot_id: slot_id.clone(),
            },
        })
        .await
        .unwrap();
    assert_eq!(confirmation.session.status, SessionStatus::Scheduled);
    assert_eq!(confirmation.quote.cost, 60);
    assert_eq!(confirmation.session.starts_at, start_at);

    let err = h
        .engine
        .book(BookingIntent {
            user: bob.clone(),
            mentor,
            call_type: CallType::Audio,
            request: BookingRequest::Slot { slot_id },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotAlreadyBooked(_)));
    // The loser was never charged.
    assert_eq!(h.balance(OwnerId::User(bob)), 100);
}

#[tokio::test]
async fn cancelling_a_session_refunds_both_sides() {
    let h = harness();
    let user = h.seed_user("u-1", 100);
    let mentor = h.mentor_with_rate("m-1", CallType::Video, 10);
    let slot_id = SlotId::from("s-1");
    h.slots.publish(
        slot_id.clone(),
        mentor.clone(),
        Utc::now() + Duration::hours(3),
        5,
    );

    let confirmation = h
        .engine
        .book(BookingIntent {
            user: user.clone(),
            mentor: mentor.clone(),
            call_type: CallType::Video,
            request: BookingRequest::Slot {
                slot_id: slot_id.clone(),
            },
        })
        .await
        .unwrap();
    assert_eq!(h.balance(OwnerId::User(user.clone())), 50);

    let cancelled = h
        .engine
        .cancel_session(&confirmation.session.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);

    let user_owner = OwnerId::User(user);
    let mentor_owner = OwnerId::Mentor(mentor);
    assert_eq!(h.balance(user_owner.clone()), 100);
    assert_eq!(h.balance(mentor_owner.clone()), 0);
    assert!(!h.slots.get(&slot_id).unwrap().is_booked());

    let payout = h
        .ledger
        .payout_for_session(&confirmation.session.id)
        .unwrap();
    assert_eq!(payout.status, EntryStatus::Refunded);

    // Cancelling again changes nothing.
    h.engine
        .cancel_session(&confirmation.session.id)
        .await
        .unwrap();
    assert_eq!(h.balance(user_owner.clone()), 100);
    assert_eq!(h.balance(mentor_owner), 0);
    assert_eq!(
        h.ledger.replayed_balance(&user_owner).unwrap(),
        h.balance(user_owner)
    );
}

#[tokio::test]
async fn cancelling_a_package_session_returns_the_credit() {
    let h = harness();
    let user = h.seed_user("u-1", 300);
    let mentor = h.mentor_with_rate("m-1", CallType::Chat, 4);

    let package = h
        .engine
        .purchase_package(PackageOrder {
            user: user.clone(),
            mentor: mentor.clone(),
            category: CategoryId::from("career"),
            call_type: CallType::Chat,
            total_sessions: 1,
            price: 100,
            duration_minutes: 15,
            valid_for: Duration::days(30),
        })
        .await
        .unwrap();

    let confirmation = h
        .engine
        .book(instant(&user, &mentor, CallType::Chat, 15))
        .await
        .unwrap();
    assert_eq!(h.inventory.get(&package.id).unwrap().remaining_sessions, 0);

    h.engine
        .cancel_session(&confirmation.session.id)
        .await
        .unwrap();

    let restored = h.inventory.get(&package.id).unwrap();
    assert_eq!(restored.remaining_sessions, 1);
    assert_eq!(restored.status, PackageStatus::Active);
}

#[tokio::test]
async fn package_purchase_needs_funds() {
    let h = harness();
    let user = h.seed_user("u-1", 50);
    let mentor = MentorId::from("m-1");

    let err = h
        .engine
        .purchase_package(PackageOrder {
            user: user.clone(),
            mentor,
            category: CategoryId::from("career"),
            call_type: CallType::Video,
            total_sessions: 3,
            price: 300,
            duration_minutes: 30,
            valid_for: Duration::days(30),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InsufficientFunds { .. }));
    assert_eq!(h.balance(OwnerId::User(user)), 50);
}

#[tokio::test]
async fn first_chat_flat_price_when_enabled() {
    let mut config = EngineConfig::default();
    config.pricing.first_session_flat = Some(1);

    let ledger = Arc::new(LedgerStore::new());
    let inventory = Arc::new(PackageInventory::new());
    let catalog = Arc::new(StaticCatalog::new());
    let slots = Arc::new(SlotBoard::new());
    let sessions = Arc::new(SessionStore::new());
    let resolver = Arc::new(PricingResolver::new(
        catalog.clone() as Arc<dyn MentorCatalog>,
        inventory.clone(),
        ledger.clone(),
        config.pricing.clone(),
    ));
    let engine = BookingEngine::new(
        ledger.clone(),
        inventory,
        resolver,
        slots,
        sessions,
        Arc::new(FallbackRoomProvisioner::new(FRONTEND)),
        FallbackRoomProvisioner::new(FRONTEND),
        &config,
    );

    let user = UserId::from("u-1");
    let owner = OwnerId::User(user.clone());
    ledger.open_wallet(owner.clone(), Utc::now());
    ledger
        .credit(&owner, 100, None, "coin purchase", None, Utc::now())
        .unwrap();
    let mentor = MentorId::from("m-1");
    catalog.set_rate(mentor.clone(), CallType::Chat, 4);

    let first = engine
        .book(instant(&user, &mentor, CallType::Chat, 10))
        .await
        .unwrap();
    assert_eq!(first.quote.cost, 1);

    let second = engine
        .book(instant(&user, &mentor, CallType::Chat, 10))
        .await
        .unwrap();
    assert_eq!(second.quote.cost, 40);
}
